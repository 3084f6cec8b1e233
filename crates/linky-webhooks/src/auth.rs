//! Session authentication for the webhook API.
//!
//! The webhook routes never issue sessions; they only resolve an existing
//! session token to its user through a [`SessionVerifier`].

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::error::WebhookError;

/// Cookie carrying the session token for browser clients.
pub const SESSION_COOKIE: &str = "linky_session";

/// Resolves a session token to the user that owns it.
#[async_trait]
pub trait SessionVerifier: Send + Sync {
    /// `Ok(None)` for unknown or expired tokens.
    async fn verify(&self, token: &str) -> Result<Option<Uuid>, WebhookError>;
}

/// Authenticated owner, inserted into request extensions by
/// [`session_auth_middleware`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerId(pub Uuid);

/// Bearer token first, then the session cookie.
fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim())
        .filter(|t| !t.is_empty());
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|t| !t.is_empty())
}

/// Middleware function that authenticates the caller and injects [`OwnerId`].
pub async fn session_auth_middleware(
    State(verifier): State<Arc<dyn SessionVerifier>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, WebhookError> {
    let token = extract_token(req.headers()).ok_or(WebhookError::Unauthorized)?;

    let owner_id = verifier
        .verify(token)
        .await?
        .ok_or(WebhookError::Unauthorized)?;

    req.extensions_mut().insert(OwnerId(owner_id));
    Ok(next.run(req).await)
}

/// Fixed token table, for tests and local tooling.
#[derive(Debug, Clone, Default)]
pub struct StaticSessionVerifier {
    sessions: std::collections::HashMap<String, Uuid>,
}

impl StaticSessionVerifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_session(mut self, token: impl Into<String>, owner_id: Uuid) -> Self {
        self.sessions.insert(token.into(), owner_id);
        self
    }
}

#[async_trait]
impl SessionVerifier for StaticSessionVerifier {
    async fn verify(&self, token: &str) -> Result<Option<Uuid>, WebhookError> {
        Ok(self.sessions.get(token).copied())
    }
}
