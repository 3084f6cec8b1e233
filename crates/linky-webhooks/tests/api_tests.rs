//! HTTP-level tests for the webhook router.

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use common::*;
use linky_webhooks::auth::StaticSessionVerifier;
use linky_webhooks::{webhooks_router, WebhooksState};
use serde_json::{json, Value};
use tower::ServiceExt;

const TOKEN_A: &str = "session-token-a";
const TOKEN_B: &str = "session-token-b";

fn app(h: &TestHarness) -> Router {
    let state = WebhooksState {
        endpoint_service: Arc::new(h.endpoints.clone()),
        retry_service: Arc::new(h.retry.clone()),
        polling_service: Arc::new(h.polling.clone()),
    };
    let verifier = StaticSessionVerifier::new()
        .with_session(TOKEN_A, OWNER_A)
        .with_session(TOKEN_B, OWNER_B);
    webhooks_router(state, Arc::new(verifier))
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_requests_without_session_are_rejected() {
    let h = TestHarness::new();
    let app = app(&h);

    for (method, uri) in [
        (Method::GET, "/webhooks/endpoints"),
        (Method::GET, "/webhooks/event-types"),
        (Method::GET, "/polling-feed"),
    ] {
        let (status, body) = send(&app, request(method, uri, None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthorized");
        assert_eq!(body["status"], 401);
    }

    let (status, _) = send(
        &app,
        request(Method::GET, "/webhooks/endpoints", Some("bogus"), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_cookie_is_accepted() {
    let h = TestHarness::new();
    let app = app(&h);

    let req = Request::builder()
        .uri("/webhooks/endpoints")
        .header(header::COOKIE, format!("linky_session={TOKEN_A}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_endpoint_lifecycle_over_http() {
    let h = TestHarness::new();
    let app = app(&h);

    let (status, created) = send(
        &app,
        request(
            Method::POST,
            "/webhooks/endpoints",
            Some(TOKEN_A),
            Some(json!({"url": "https://hooks.example.com/in", "events": ["page.viewed"]})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["secret"].as_str().unwrap().len(), 64);
    assert_eq!(created["endpoint"]["is_active"], true);
    assert!(created["warning"].is_string());
    let id = created["endpoint"]["id"].as_str().unwrap().to_string();

    let (status, list) = send(
        &app,
        request(Method::GET, "/webhooks/endpoints", Some(TOKEN_A), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["endpoints"].as_array().unwrap().len(), 1);
    assert_eq!(list["event_types"].as_array().unwrap().len(), 5);

    let (status, detail) = send(
        &app,
        request(
            Method::GET,
            &format!("/webhooks/endpoints/{id}"),
            Some(TOKEN_A),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(detail.get("secret").is_none());
    assert!(detail["endpoint"].get("secret_ref").is_none());
    assert!(detail["recent_deliveries"].as_array().unwrap().is_empty());

    let (status, patched) = send(
        &app,
        request(
            Method::PATCH,
            &format!("/webhooks/endpoints/{id}"),
            Some(TOKEN_A),
            Some(json!({"is_active": false})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["is_active"], false);

    let (status, _) = send(
        &app,
        request(
            Method::DELETE,
            &format!("/webhooks/endpoints/{id}"),
            Some(TOKEN_A),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(
        &app,
        request(
            Method::GET,
            &format!("/webhooks/endpoints/{id}"),
            Some(TOKEN_A),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "endpoint_not_found");
}

#[tokio::test]
async fn test_validation_errors_are_400() {
    let h = TestHarness::new();
    let app = app(&h);

    for body in [
        json!({"url": "https://hooks.example.com/in", "events": []}),
        json!({"url": "https://hooks.example.com/in", "events": ["nope"]}),
        json!({"url": "not-a-url", "events": ["page.viewed"]}),
    ] {
        let (status, resp) = send(
            &app,
            request(Method::POST, "/webhooks/endpoints", Some(TOKEN_A), Some(body)),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{resp}");
        assert_eq!(resp["status"], 400);
    }
}

#[tokio::test]
async fn test_vault_outage_on_register_is_503() {
    let h = TestHarness::new();
    h.vault
        .fail_put
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let app = app(&h);

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/webhooks/endpoints",
            Some(TOKEN_A),
            Some(json!({"url": "https://hooks.example.com/in", "events": ["page.viewed"]})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "vault_unavailable");
    assert!(!body["message"].as_str().unwrap().contains("sealed"));
}

#[tokio::test]
async fn test_foreign_endpoint_is_404() {
    let h = TestHarness::new();
    let created = h
        .register(OWNER_A, "https://hooks.example.com/in", &["page.viewed"])
        .await;
    let app = app(&h);
    let uri = format!("/webhooks/endpoints/{}", created.endpoint.id);

    let (get_status, get_body) =
        send(&app, request(Method::GET, &uri, Some(TOKEN_B), None)).await;
    let (missing_status, missing_body) = send(
        &app,
        request(
            Method::GET,
            &format!("/webhooks/endpoints/{}", uuid::Uuid::new_v4()),
            Some(TOKEN_B),
            None,
        ),
    )
    .await;
    assert_eq!(get_status, StatusCode::NOT_FOUND);
    assert_eq!(get_body, missing_body);
    assert_eq!(missing_status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, request(Method::DELETE, &uri, Some(TOKEN_B), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_retry_returns_202() {
    let mut h = TestHarness::new();
    h.register(OWNER_A, "https://hooks.example.com/in", &["page.viewed"])
        .await;
    let ids = h.fan_out.emit(OWNER_A, &page_viewed(), Utc::now()).await.unwrap();
    h.take_jobs();
    let app = app(&h);

    let uri = format!("/webhooks/deliveries/{}/retry", ids[0]);
    let (status, body) = send(&app, request(Method::POST, &uri, Some(TOKEN_A), None)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "queued");
    assert_eq!(body["delivery_id"], ids[0].to_string());
    assert_eq!(h.take_jobs().len(), 1);

    let (status, body) = send(&app, request(Method::POST, &uri, Some(TOKEN_B), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "delivery_not_found");
}

#[tokio::test]
async fn test_polling_feed_over_http() {
    let h = TestHarness::new();
    h.register(
        OWNER_A,
        "https://hooks.example.com/in",
        &["page.viewed", "link.clicked"],
    )
    .await;
    h.fan_out.emit(OWNER_A, &page_viewed(), Utc::now()).await.unwrap();
    h.fan_out.emit(OWNER_A, &link_clicked(), Utc::now()).await.unwrap();
    let app = app(&h);

    let (status, feed) = send(
        &app,
        request(Method::GET, "/polling-feed", Some(TOKEN_A), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feed["count"], 2);

    let (status, feed) = send(
        &app,
        request(
            Method::GET,
            "/polling-feed?event_type=page.viewed",
            Some(TOKEN_A),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feed["count"], 1);
    assert_eq!(feed["items"][0]["event_type"], "page.viewed");

    let (status, _) = send(
        &app,
        request(
            Method::GET,
            "/polling-feed?event_type=bogus",
            Some(TOKEN_A),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, other) = send(
        &app,
        request(Method::GET, "/polling-feed", Some(TOKEN_B), None),
    )
    .await;
    assert_eq!(other["count"], 0);
}

#[tokio::test]
async fn test_event_types_listing() {
    let h = TestHarness::new();
    let app = app(&h);

    let (status, body) = send(
        &app,
        request(Method::GET, "/webhooks/event-types", Some(TOKEN_A), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let types: Vec<&str> = body["event_types"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["event_type"].as_str().unwrap())
        .collect();
    assert_eq!(
        types,
        vec![
            "page.viewed",
            "link.clicked",
            "page.updated",
            "block.created",
            "block.deleted"
        ]
    );
}
