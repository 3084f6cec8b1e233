//! Outbound HTTP for webhook deliveries.
//!
//! The executor talks to a [`WebhookTransport`] so tests can swap the network
//! out; production uses [`ReqwestTransport`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{DeliveryFailure, WebhookError};

/// User-Agent sent with every delivery.
pub const USER_AGENT: &str = "linky-webhooks/1.0";

/// A fully built, signed delivery request.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

/// What came back from the receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    /// Body, already cut to the configured limit.
    pub body: String,
}

/// Sends one delivery request.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    /// POST the request. Any HTTP status is `Ok`; only the absence of a
    /// response is an error.
    async fn post(&self, request: OutboundRequest) -> Result<TransportResponse, DeliveryFailure>;
}

/// `reqwest`-backed transport: bounded timeout, no redirects.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    timeout: Duration,
    body_limit: usize,
}

impl ReqwestTransport {
    /// Build a transport with a shared HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::Internal` if the HTTP client cannot be built.
    pub fn new(timeout: Duration, body_limit: usize) -> Result<Self, WebhookError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| WebhookError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout,
            body_limit,
        })
    }

    fn classify(&self, err: &reqwest::Error) -> DeliveryFailure {
        if err.is_timeout() {
            DeliveryFailure::Timeout(self.timeout)
        } else if err.is_connect() {
            DeliveryFailure::Connect(err.to_string())
        } else {
            DeliveryFailure::Request(err.to_string())
        }
    }
}

#[async_trait]
impl WebhookTransport for ReqwestTransport {
    async fn post(&self, request: OutboundRequest) -> Result<TransportResponse, DeliveryFailure> {
        let mut builder = self.client.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }

        let mut response = builder
            .body(request.body)
            .send()
            .await
            .map_err(|e| self.classify(&e))?;

        let status = response.status().as_u16();

        // Stop reading once the limit is reached; the rest is never stored.
        let mut body = Vec::with_capacity(self.body_limit.min(8192));
        while body.len() < self.body_limit {
            match response.chunk().await {
                Ok(Some(chunk)) => body.extend_from_slice(&chunk),
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(
                        target: "webhook_delivery",
                        url = %request.url,
                        error = %e,
                        "Failed to read full response body"
                    );
                    break;
                }
            }
        }

        Ok(TransportResponse {
            status,
            body: truncate_body(&body, self.body_limit),
        })
    }
}

/// Lossy UTF-8 decode of at most `limit` bytes, never splitting a character.
#[must_use]
pub fn truncate_body(bytes: &[u8], limit: usize) -> String {
    let text = String::from_utf8_lossy(&bytes[..bytes.len().min(limit)]);
    if text.len() <= limit {
        return text.into_owned();
    }
    // Replacement characters can push the decoded text past the limit.
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_body_short() {
        assert_eq!(truncate_body(b"oops", 2048), "oops");
    }

    #[test]
    fn test_truncate_body_cuts_at_limit() {
        let body = vec![b'a'; 5000];
        assert_eq!(truncate_body(&body, 2048).len(), 2048);
    }

    #[test]
    fn test_truncate_body_respects_char_boundary() {
        // "é" is two bytes; cutting at 3 would split the second one.
        let body = "éé".as_bytes();
        let out = truncate_body(body, 3);
        assert!(out.len() <= 3);
        assert!(out.starts_with('é'));
    }

    #[test]
    fn test_transport_builds() {
        assert!(ReqwestTransport::new(Duration::from_secs(10), 2048).is_ok());
    }
}
