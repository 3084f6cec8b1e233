//! Common test utilities for linky-webhooks integration tests.
//!
//! Provides wiremock responders, vault doubles, fixtures, and a harness that
//! wires every service against the in-memory store so the pipeline runs
//! without Postgres or a real vault.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use linky_secrets::{MemorySecretVault, SecretError, SecretValue, SecretVault};
use linky_webhooks::models::{CreateEndpointRequest, CreateEndpointResponse, WebhookEvent};
use linky_webhooks::services::delivery_service::DeliveryService;
use linky_webhooks::services::endpoint_service::EndpointService;
use linky_webhooks::services::fan_out::FanOutService;
use linky_webhooks::services::polling_service::PollingService;
use linky_webhooks::services::retry_service::RetryService;
use linky_webhooks::validation::UrlPolicy;
use linky_webhooks::{
    DeliveryJob, DeliveryQueue, InMemoryWebhookStore, ReqwestTransport, WebhookConfig,
};
use tokio::sync::mpsc;
use uuid::Uuid;
use wiremock::{Request, Respond, ResponseTemplate};

// ---------------------------------------------------------------------------
// Test fixtures
// ---------------------------------------------------------------------------

pub const OWNER_A: Uuid = Uuid::from_bytes([
    0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11,
]);

pub const OWNER_B: Uuid = Uuid::from_bytes([
    0x22, 0x22, 0x22, 0x22, 0x22, 0x22, 0x22, 0x22, 0x22, 0x22, 0x22, 0x22, 0x22, 0x22, 0x22, 0x22,
]);

pub const PAGE_ID: Uuid = Uuid::from_bytes([
    0xaa, 0xaa, 0x11, 0x11, 0xaa, 0xaa, 0x11, 0x11, 0xaa, 0xaa, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11,
]);

pub fn page_viewed() -> WebhookEvent {
    WebhookEvent::PageViewed {
        page_id: PAGE_ID,
        referrer: Some("https://news.example.com".to_string()),
        country: Some("DE".to_string()),
    }
}

pub fn link_clicked() -> WebhookEvent {
    WebhookEvent::LinkClicked {
        page_id: PAGE_ID,
        block_id: Uuid::new_v4(),
        url: "https://shop.example.com".to_string(),
    }
}

pub fn endpoint_request(url: impl Into<String>, events: &[&str]) -> CreateEndpointRequest {
    CreateEndpointRequest {
        url: url.into(),
        events: events.iter().map(|e| (*e).to_string()).collect(),
    }
}

/// Config that accepts wiremock's `http://127.0.0.1` URLs and times out fast.
pub fn test_config() -> WebhookConfig {
    WebhookConfig::default()
        .with_url_policy(UrlPolicy {
            allow_http: true,
            allow_internal_hosts: true,
        })
        .with_delivery_timeout(Duration::from_millis(300))
        .with_vault_timeout(Duration::from_millis(300))
}

// ---------------------------------------------------------------------------
// CapturedRequest - for inspecting webhook requests
// ---------------------------------------------------------------------------

/// A captured HTTP request with body and headers.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub body: Vec<u8>,
    pub headers: HashMap<String, String>,
}

impl CapturedRequest {
    pub fn body_json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        let name_lower = name.to_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| k.to_lowercase() == name_lower)
            .map(|(_, v)| v.as_str())
    }
}

// ---------------------------------------------------------------------------
// CaptureResponder - captures requests and returns a fixed response
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct CaptureResponder {
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    status: u16,
    body: String,
}

impl CaptureResponder {
    pub fn new() -> Self {
        Self::with_response(200, "ok")
    }

    pub fn with_response(status: u16, body: impl Into<String>) -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            status,
            body: body.into(),
        }
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Respond for CaptureResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        self.requests.lock().unwrap().push(CapturedRequest {
            body: request.body.clone(),
            headers: request
                .headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
                .collect(),
        });
        ResponseTemplate::new(self.status).set_body_string(self.body.clone())
    }
}

// ---------------------------------------------------------------------------
// CountingResponder - counts requests
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct CountingResponder {
    count: Arc<AtomicU32>,
    status: u16,
}

impl CountingResponder {
    pub fn with_status(status: u16) -> Self {
        Self {
            count: Arc::new(AtomicU32::new(0)),
            status,
        }
    }

    pub fn count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }
}

impl Respond for CountingResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.count.fetch_add(1, Ordering::SeqCst);
        ResponseTemplate::new(self.status)
    }
}

// ---------------------------------------------------------------------------
// SwitchVault - memory vault whose operations can be made to fail
// ---------------------------------------------------------------------------

/// In-memory vault with per-operation outage switches.
pub struct SwitchVault {
    inner: MemorySecretVault,
    pub fail_put: AtomicBool,
    pub fail_get: AtomicBool,
    pub fail_delete: AtomicBool,
    get_delay: Mutex<Option<Duration>>,
}

impl SwitchVault {
    pub fn new() -> Self {
        Self {
            inner: MemorySecretVault::new("test/webhooks"),
            fail_put: AtomicBool::new(false),
            fail_get: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
            get_delay: Mutex::new(None),
        }
    }

    pub fn set_get_delay(&self, delay: Duration) {
        *self.get_delay.lock().unwrap() = Some(delay);
    }

    pub async fn contains(&self, reference: &str) -> bool {
        self.inner.contains(reference).await
    }

    pub async fn len(&self) -> usize {
        self.inner.len().await
    }

    fn outage() -> SecretError {
        SecretError::ProviderUnavailable {
            provider: "test".to_string(),
            detail: "vault sealed".to_string(),
        }
    }
}

#[async_trait]
impl SecretVault for SwitchVault {
    async fn put_secret(&self, key: &str, value: &str) -> Result<String, SecretError> {
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(Self::outage());
        }
        self.inner.put_secret(key, value).await
    }

    async fn get_secret(&self, reference: &str) -> Result<SecretValue, SecretError> {
        let delay = *self.get_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(Self::outage());
        }
        self.inner.get_secret(reference).await
    }

    async fn delete_secret(&self, reference: &str) -> Result<(), SecretError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(Self::outage());
        }
        self.inner.delete_secret(reference).await
    }

    async fn health_check(&self) -> Result<bool, SecretError> {
        Ok(!self.fail_get.load(Ordering::SeqCst))
    }

    fn provider_type(&self) -> &'static str {
        "switch"
    }
}

// ---------------------------------------------------------------------------
// TestHarness - every service over one in-memory store
// ---------------------------------------------------------------------------

pub struct TestHarness {
    pub store: Arc<InMemoryWebhookStore>,
    pub vault: Arc<SwitchVault>,
    pub config: WebhookConfig,
    pub endpoints: EndpointService,
    pub delivery: DeliveryService,
    pub fan_out: FanOutService,
    pub retry: RetryService,
    pub polling: PollingService,
    pub queue: DeliveryQueue,
    jobs: mpsc::Receiver<DeliveryJob>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: WebhookConfig) -> Self {
        let store = Arc::new(InMemoryWebhookStore::new());
        let vault = Arc::new(SwitchVault::new());
        let transport = Arc::new(
            ReqwestTransport::new(config.delivery_timeout, config.response_body_limit).unwrap(),
        );
        let (queue, jobs) = DeliveryQueue::new(config.queue_capacity);

        Self {
            endpoints: EndpointService::new(store.clone(), vault.clone(), &config),
            delivery: DeliveryService::new(store.clone(), vault.clone(), transport, &config),
            fan_out: FanOutService::new(store.clone(), queue.clone()),
            retry: RetryService::new(store.clone(), queue.clone()),
            polling: PollingService::new(store.clone(), &config),
            store,
            vault,
            config,
            queue,
            jobs,
        }
    }

    /// Register an endpoint for `owner_id`, panicking on failure.
    pub async fn register(
        &self,
        owner_id: Uuid,
        url: impl Into<String>,
        events: &[&str],
    ) -> CreateEndpointResponse {
        self.endpoints
            .register(owner_id, endpoint_request(url, events))
            .await
            .unwrap()
    }

    /// Jobs waiting in the delivery queue.
    pub fn take_jobs(&mut self) -> Vec<DeliveryJob> {
        let mut jobs = Vec::new();
        while let Ok(job) = self.jobs.try_recv() {
            jobs.push(job);
        }
        jobs
    }

    /// Run every queued job on the current task, the way a worker would.
    pub async fn run_queued(&mut self) -> usize {
        let jobs = self.take_jobs();
        let n = jobs.len();
        for job in jobs {
            self.delivery.run_job(job).await;
        }
        n
    }
}

/// Poll `check` until it returns true or `timeout` elapses.
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
