//! Endpoint registry: owner-scoped CRUD for webhook endpoints.
//!
//! Registration generates the signing secret, stores it in the vault and
//! persists only the vault reference. The plaintext secret is returned once
//! and is not retrievable afterwards.

use std::sync::Arc;

use linky_db::models::{CreateWebhookEndpoint, UpdateWebhookEndpoint};
use linky_secrets::SecretVault;
use uuid::Uuid;
use validator::Validate;

use crate::config::WebhookConfig;
use crate::crypto;
use crate::error::WebhookError;
use crate::models::{
    CreateEndpointRequest, CreateEndpointResponse, DeliveryResponse, EndpointDetailResponse,
    EndpointListResponse, EndpointResponse, EventTypeListResponse, UpdateEndpointRequest,
};
use crate::store::WebhookStore;
use crate::validation::{self, UrlPolicy};

/// Shown next to the one-time secret.
pub const SECRET_WARNING: &str =
    "Store this secret now. It is used to verify webhook signatures and will not be shown again.";

#[derive(Clone)]
pub struct EndpointService {
    store: Arc<dyn WebhookStore>,
    vault: Arc<dyn SecretVault>,
    url_policy: UrlPolicy,
    recent_deliveries_limit: i64,
}

impl EndpointService {
    #[must_use]
    pub fn new(
        store: Arc<dyn WebhookStore>,
        vault: Arc<dyn SecretVault>,
        config: &WebhookConfig,
    ) -> Self {
        Self {
            store,
            vault,
            url_policy: config.url_policy,
            recent_deliveries_limit: config.recent_deliveries_limit,
        }
    }

    /// Register a new endpoint for `owner_id`.
    ///
    /// Nothing is persisted unless the vault write succeeds. If the row insert
    /// fails after the vault write, the secret is removed again.
    pub async fn register(
        &self,
        owner_id: Uuid,
        request: CreateEndpointRequest,
    ) -> Result<CreateEndpointResponse, WebhookError> {
        request
            .validate()
            .map_err(|e| WebhookError::Validation(e.to_string()))?;
        validation::validate_webhook_url(&request.url, self.url_policy)?;
        let events = validation::validate_event_types(&request.events)?;

        let endpoint_id = Uuid::new_v4();
        let secret = crypto::generate_secret();
        let secret_ref = self
            .vault
            .put_secret(&format!("{owner_id}/{endpoint_id}"), &secret)
            .await
            .map_err(|e| {
                tracing::error!(
                    target: "webhook_registry",
                    owner_id = %owner_id,
                    endpoint_id = %endpoint_id,
                    error = %e,
                    "Failed to store endpoint secret in vault"
                );
                WebhookError::Vault(e)
            })?;

        let created = self
            .store
            .create_endpoint(CreateWebhookEndpoint {
                id: endpoint_id,
                owner_id,
                url: request.url,
                events,
                secret_ref: secret_ref.clone(),
            })
            .await;

        let endpoint = match created {
            Ok(ep) => ep,
            Err(e) => {
                if let Err(cleanup) = self.vault.delete_secret(&secret_ref).await {
                    tracing::warn!(
                        target: "webhook_registry",
                        endpoint_id = %endpoint_id,
                        error = %cleanup,
                        "Failed to remove orphaned endpoint secret from vault"
                    );
                }
                return Err(e.into());
            }
        };

        tracing::info!(
            target: "webhook_registry",
            owner_id = %owner_id,
            endpoint_id = %endpoint.id,
            events = ?endpoint.events,
            "Webhook endpoint registered"
        );

        Ok(CreateEndpointResponse {
            endpoint: endpoint.into(),
            secret,
            warning: SECRET_WARNING.to_string(),
        })
    }

    /// Fetch an endpoint with its most recent deliveries.
    pub async fn get(
        &self,
        owner_id: Uuid,
        endpoint_id: Uuid,
    ) -> Result<EndpointDetailResponse, WebhookError> {
        let endpoint = self
            .store
            .find_endpoint(owner_id, endpoint_id)
            .await?
            .ok_or(WebhookError::EndpointNotFound)?;

        let recent = self
            .store
            .list_deliveries_for_endpoint(owner_id, endpoint_id, self.recent_deliveries_limit)
            .await?;

        Ok(EndpointDetailResponse {
            endpoint: endpoint.into(),
            recent_deliveries: recent.into_iter().map(DeliveryResponse::from).collect(),
        })
    }

    /// All endpoints of an owner, newest first, plus the subscribable event types.
    pub async fn list(&self, owner_id: Uuid) -> Result<EndpointListResponse, WebhookError> {
        let endpoints = self.store.list_endpoints(owner_id).await?;
        Ok(EndpointListResponse {
            endpoints: endpoints.into_iter().map(EndpointResponse::from).collect(),
            event_types: EventTypeListResponse::all().event_types,
        })
    }

    /// Change url, events or active flag. The secret reference is immutable.
    pub async fn update(
        &self,
        owner_id: Uuid,
        endpoint_id: Uuid,
        request: UpdateEndpointRequest,
    ) -> Result<EndpointResponse, WebhookError> {
        request
            .validate()
            .map_err(|e| WebhookError::Validation(e.to_string()))?;

        if let Some(ref url) = request.url {
            validation::validate_webhook_url(url, self.url_policy)?;
        }
        let events = request
            .events
            .as_deref()
            .map(validation::validate_event_types)
            .transpose()?;

        let patch = UpdateWebhookEndpoint {
            url: request.url,
            events,
            is_active: request.is_active,
        };

        let updated = if patch.is_empty() {
            self.store.find_endpoint(owner_id, endpoint_id).await?
        } else {
            self.store
                .update_endpoint(owner_id, endpoint_id, patch)
                .await?
        };

        let endpoint = updated.ok_or(WebhookError::EndpointNotFound)?;

        tracing::info!(
            target: "webhook_registry",
            owner_id = %owner_id,
            endpoint_id = %endpoint.id,
            is_active = endpoint.is_active,
            "Webhook endpoint updated"
        );

        Ok(endpoint.into())
    }

    /// Delete an endpoint and its deliveries.
    ///
    /// The vault secret is removed first; a vault failure is logged and does
    /// not stop the row deletion.
    pub async fn remove(&self, owner_id: Uuid, endpoint_id: Uuid) -> Result<(), WebhookError> {
        let endpoint = self
            .store
            .find_endpoint(owner_id, endpoint_id)
            .await?
            .ok_or(WebhookError::EndpointNotFound)?;

        if let Err(e) = self.vault.delete_secret(&endpoint.secret_ref).await {
            tracing::warn!(
                target: "webhook_registry",
                owner_id = %owner_id,
                endpoint_id = %endpoint_id,
                error = %e,
                "Failed to delete endpoint secret from vault, continuing with endpoint removal"
            );
        }

        if !self.store.delete_endpoint(owner_id, endpoint_id).await? {
            return Err(WebhookError::EndpointNotFound);
        }

        tracing::info!(
            target: "webhook_registry",
            owner_id = %owner_id,
            endpoint_id = %endpoint_id,
            "Webhook endpoint deleted"
        );

        Ok(())
    }
}
