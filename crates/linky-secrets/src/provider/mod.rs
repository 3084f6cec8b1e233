//! Secret vault backends.

pub mod memory;
pub mod vault;
