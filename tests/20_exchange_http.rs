// The public surface: service info, health, and the authorization-code
// exchange with the identity provider stubbed out.
mod common;

use common::{StubProvider, TestApp};
use prism_api::auth::provider::IdentityProviderError;
use serde_json::json;

#[tokio::test]
async fn root_identifies_the_service() {
    let app = TestApp::offline(StubProvider::failing(IdentityProviderError::Unreachable(
        "unused".to_string(),
    )));

    let response = app.send(common::get("/")).await;
    assert_eq!(response.status().as_u16(), 200);

    let body = common::body_json(response).await;
    assert_eq!(body["name"], "Prism API");
    assert!(body["endpoints"]["exchange"].is_string());
}

#[tokio::test]
async fn health_reports_degraded_without_a_database() {
    let app = TestApp::offline(StubProvider::failing(IdentityProviderError::Unreachable(
        "unused".to_string(),
    )));

    let response = app.send(common::get("/health")).await;
    assert_eq!(response.status().as_u16(), 503);

    let body = common::body_json(response).await;
    assert_eq!(body["status"], "degraded");
}

#[tokio::test]
async fn malformed_body_is_validation_error() {
    let app = TestApp::offline(StubProvider::succeeding(common::identity(
        "a@example.com",
    )));

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/auth/exchange")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{\"authorization_code\":"))
        .unwrap();
    let response = app.send(request).await;
    common::assert_error(response, 400, "validation_error").await;
}

#[tokio::test]
async fn blank_fields_get_field_errors() {
    let app = TestApp::offline(StubProvider::succeeding(common::identity(
        "a@example.com",
    )));

    let response = app
        .send(common::post_json(
            "/auth/exchange",
            json!({"authorization_code": "  ", "redirect_uri": ""}),
        ))
        .await;
    let body = common::assert_error(response, 400, "validation_error").await;
    assert!(body["field_errors"]["authorization_code"].is_string());
    assert!(body["field_errors"]["redirect_uri"].is_string());
}

#[tokio::test]
async fn rejected_code_is_invalid_authorization_code() {
    let app = TestApp::offline(StubProvider::failing(IdentityProviderError::InvalidCode(
        "expired authorization code".to_string(),
    )));

    let response = app
        .send(common::post_json(
            "/auth/exchange",
            json!({"authorization_code": "code", "redirect_uri": "https://app/cb"}),
        ))
        .await;
    common::assert_error(response, 400, "invalid_authorization_code").await;
}

#[tokio::test]
async fn provider_timeout_is_bad_gateway() {
    let app = TestApp::offline(StubProvider::failing(IdentityProviderError::Unreachable(
        "connect timeout".to_string(),
    )));

    let response = app
        .send(common::post_json(
            "/auth/exchange",
            json!({"authorization_code": "code", "redirect_uri": "https://app/cb"}),
        ))
        .await;
    common::assert_error(response, 502, "identity_provider_unreachable").await;
}

#[tokio::test]
async fn malformed_provider_response_is_bad_gateway() {
    let app = TestApp::offline(StubProvider::failing(
        IdentityProviderError::MalformedResponse("userinfo had no email".to_string()),
    ));

    let response = app
        .send(common::post_json(
            "/auth/exchange",
            json!({"authorization_code": "code", "redirect_uri": "https://app/cb"}),
        ))
        .await;
    common::assert_error(response, 502, "identity_provider_unreachable").await;
}

#[tokio::test]
async fn provider_success_still_fails_closed_without_a_database() {
    // The provider accepted the code, but the upsert cannot run; the user
    // must get an isolation failure, never a token minted from nothing.
    let app = TestApp::offline(StubProvider::succeeding(common::identity(
        "a@example.com",
    )));

    let response = app
        .send(common::post_json(
            "/auth/exchange",
            json!({"authorization_code": "code", "redirect_uri": "https://app/cb"}),
        ))
        .await;
    common::assert_error(response, 500, "tenant_isolation").await;
}
