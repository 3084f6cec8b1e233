//! Vault KV v2 backend tests against a mock Vault server.

use linky_secrets::{SecretError, SecretVault, VaultAuthMethod, VaultConfig, VaultSecretVault};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "s.test-token";
const PREFIX: &str = "linky/webhooks";

fn token_config(server: &MockServer) -> VaultConfig {
    VaultConfig {
        address: server.uri(),
        auth_method: VaultAuthMethod::Token {
            token: TOKEN.to_string(),
        },
        namespace: None,
        mount: "secret".to_string(),
    }
}

async fn token_vault(server: &MockServer) -> VaultSecretVault {
    VaultSecretVault::new(&token_config(server), PREFIX)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_put_secret_writes_kv_v2_and_returns_reference() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/secret/data/linky/webhooks/owner-1/endpoint-1"))
        .and(header("X-Vault-Token", TOKEN))
        .and(body_json(serde_json::json!({ "data": { "value": "s3cr3t" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "version": 1 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let vault = token_vault(&server).await;
    let reference = vault
        .put_secret("owner-1/endpoint-1", "s3cr3t")
        .await
        .unwrap();

    assert_eq!(reference, "linky/webhooks/owner-1/endpoint-1");
}

#[tokio::test]
async fn test_get_secret_reads_value_and_version() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/secret/data/linky/webhooks/o/e"))
        .and(header("X-Vault-Token", TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {
                "data": { "value": "abc123" },
                "metadata": { "version": 3 }
            }
        })))
        .mount(&server)
        .await;

    let vault = token_vault(&server).await;
    let secret = vault.get_secret("linky/webhooks/o/e").await.unwrap();

    assert_eq!(secret.as_str().unwrap(), "abc123");
    assert_eq!(secret.version.as_deref(), Some("3"));
}

#[tokio::test]
async fn test_get_secret_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let vault = token_vault(&server).await;
    let err = vault.get_secret("linky/webhooks/o/missing").await.unwrap_err();

    assert!(matches!(err, SecretError::NotFound { .. }));
}

#[tokio::test]
async fn test_get_secret_malformed_payload() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "data": { "other": "field" } }
        })))
        .mount(&server)
        .await;

    let vault = token_vault(&server).await;
    let err = vault.get_secret("linky/webhooks/o/e").await.unwrap_err();

    assert!(matches!(err, SecretError::InvalidValue { .. }));
}

#[tokio::test]
async fn test_server_error_is_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let vault = token_vault(&server).await;
    let err = vault.put_secret("o/e", "x").await.unwrap_err();

    assert!(err.is_unavailable());
}

#[tokio::test]
async fn test_forbidden_is_permission_denied() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let vault = token_vault(&server).await;
    let err = vault.put_secret("o/e", "x").await.unwrap_err();

    assert!(matches!(err, SecretError::PermissionDenied { .. }));
}

#[tokio::test]
async fn test_unreachable_vault_is_unavailable() {
    // Bind and drop to get a port nothing listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = VaultConfig {
        address: format!("http://127.0.0.1:{port}"),
        auth_method: VaultAuthMethod::Token {
            token: TOKEN.to_string(),
        },
        namespace: None,
        mount: "secret".to_string(),
    };

    let vault = VaultSecretVault::new(&config, PREFIX).await.unwrap();
    let err = vault.get_secret("linky/webhooks/o/e").await.unwrap_err();

    assert!(err.is_unavailable());
}

#[tokio::test]
async fn test_delete_secret_removes_metadata() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/v1/secret/metadata/linky/webhooks/o/e"))
        .and(header("X-Vault-Token", TOKEN))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let vault = token_vault(&server).await;
    vault.delete_secret("linky/webhooks/o/e").await.unwrap();
}

#[tokio::test]
async fn test_delete_missing_secret_is_ok() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let vault = token_vault(&server).await;
    assert!(vault.delete_secret("linky/webhooks/o/e").await.is_ok());
}

#[tokio::test]
async fn test_namespace_header_is_sent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("X-Vault-Namespace", "team-a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "data": { "value": "v" } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = token_config(&server);
    config.namespace = Some("team-a".to_string());
    let vault = VaultSecretVault::new(&config, PREFIX).await.unwrap();

    assert!(vault.get_secret("linky/webhooks/o/e").await.is_ok());
}

#[tokio::test]
async fn test_approle_login_token_is_used() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/auth/approle/login"))
        .and(body_json(serde_json::json!({
            "role_id": "role",
            "secret_id": "secret"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "auth": { "client_token": "s.from-approle", "lease_duration": 3600 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/secret/data/linky/webhooks/o/e"))
        .and(header("X-Vault-Token", "s.from-approle"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "data": { "value": "v" } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = token_config(&server);
    config.auth_method = VaultAuthMethod::AppRole {
        role_id: "role".to_string(),
        secret_id: "secret".to_string(),
    };
    let vault = VaultSecretVault::new(&config, PREFIX).await.unwrap();

    assert_eq!(
        vault.get_secret("linky/webhooks/o/e").await.unwrap().as_str().unwrap(),
        "v"
    );
}

#[tokio::test]
async fn test_approle_login_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/auth/approle/login"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let mut config = token_config(&server);
    config.auth_method = VaultAuthMethod::AppRole {
        role_id: "role".to_string(),
        secret_id: "wrong".to_string(),
    };
    let err = VaultSecretVault::new(&config, PREFIX).await.unwrap_err();

    assert!(err.is_unavailable());
}

#[tokio::test]
async fn test_health_check_statuses() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/sys/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let vault = token_vault(&server).await;
    assert!(!vault.health_check().await.unwrap());
    assert_eq!(vault.provider_type(), "vault");
}
