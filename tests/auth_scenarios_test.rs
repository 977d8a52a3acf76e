//! Auth middleware (C8) scenarios, spec §4.8.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{test_state, FakeLedger};
use kortix_gateway::app::build_router;
use kortix_gateway::config::EnvMode;
use tower::ServiceExt;

fn router(env_mode: EnvMode, allow_legacy: bool) -> axum::Router {
    let state = test_state(FakeLedger::with_balance(10.0), env_mode, allow_legacy, Default::default());
    build_router(state, &[])
}

#[tokio::test]
async fn missing_authorization_header_is_401() {
    let app = router(EnvMode::Production, true);
    let resp = app
        .oneshot(Request::builder().uri("/v1/models").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_authorization_header_is_401() {
    let app = router(EnvMode::Production, true);
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/v1/models")
                .header("authorization", "Basic dXNlcjpwYXNz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_sentinel_bearer_is_accepted() {
    let app = router(EnvMode::Production, true);
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/v1/models")
                .header("authorization", "Bearer 00000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn legacy_bearer_as_account_id_is_accepted_when_allowed() {
    let app = router(EnvMode::Local, true);
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/v1/models")
                .header("authorization", "Bearer acct_legacy_123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn legacy_bearer_as_account_id_is_rejected_in_production() {
    let app = router(EnvMode::Production, false);
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/v1/models")
                .header("authorization", "Bearer acct_legacy_123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_endpoint_is_unauthenticated() {
    let app = router(EnvMode::Production, false);
    let resp = app.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_route_is_404_with_error_envelope() {
    let app = router(EnvMode::Production, false);
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/no-such-route")
                .header("authorization", "Bearer 00000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], true);
    assert_eq!(json["status"], 404);
}
