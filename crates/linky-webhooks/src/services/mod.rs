//! Business logic services for the webhook pipeline.

pub mod delivery_service;
pub mod endpoint_service;
pub mod event_publisher;
pub mod fan_out;
pub mod polling_service;
pub mod retry_service;
