// Authentication and guard behavior over HTTP, driven in-process with no
// database: every test here must be decided before any query runs, or must
// fail closed when the pool is unreachable.
mod common;

use axum::http::header;
use common::{StubProvider, TestApp};
use prism_api::auth::provider::IdentityProviderError;
use prism_api::auth::role::{Role, RoleClaim};
use uuid::Uuid;

fn offline_app() -> TestApp {
    TestApp::offline(StubProvider::failing(IdentityProviderError::Unreachable(
        "unused".to_string(),
    )))
}

#[tokio::test]
async fn missing_token_is_invalid_credentials() {
    let app = offline_app();
    let response = app.send(common::get("/api/auth/whoami")).await;
    common::assert_error(response, 401, "invalid_credentials").await;
}

#[tokio::test]
async fn garbage_token_is_invalid_token() {
    let app = offline_app();
    let response = app
        .send(common::get_bearer("/api/auth/whoami", "not-a-jwt"))
        .await;
    common::assert_error(response, 401, "invalid_token").await;
}

#[tokio::test]
async fn token_signed_with_other_key_is_invalid_token() {
    let app = offline_app();

    let mut foreign_config = common::test_config();
    foreign_config.auth.jwt_secret = "a-different-signing-key".to_string();
    let foreign = TestApp::new(
        StubProvider::failing(IdentityProviderError::Unreachable("unused".to_string())),
        common::unreachable_pool(),
        foreign_config,
    );
    let token = foreign.mint(Uuid::new_v4(), Some(Uuid::new_v4()), Role::Admin);

    let response = app
        .send(common::get_bearer("/api/auth/whoami", &token.token))
        .await;
    common::assert_error(response, 401, "invalid_token").await;
}

#[tokio::test]
async fn expired_token_is_token_expired() {
    // Negative TTL mints tokens that are already beyond the 30s leeway.
    let mut config = common::test_config();
    config.auth.token_ttl_secs = -120;
    let app = TestApp::new(
        StubProvider::failing(IdentityProviderError::Unreachable("unused".to_string())),
        common::unreachable_pool(),
        config,
    );

    let token = app.mint(Uuid::new_v4(), Some(Uuid::new_v4()), Role::Viewer);
    let response = app
        .send(common::get_bearer("/api/auth/whoami", &token.token))
        .await;
    common::assert_error(response, 401, "token_expired").await;
}

#[tokio::test]
async fn token_without_tenant_is_tenant_unassigned() {
    let app = offline_app();
    let token = app.mint(Uuid::new_v4(), None, Role::Viewer);

    let response = app
        .send(common::get_bearer("/api/auth/whoami", &token.token))
        .await;
    common::assert_error(response, 403, "tenant_unassigned").await;
}

#[tokio::test]
async fn unknown_role_claim_is_invalid_role() {
    let app = offline_app();
    let token = app.mint(
        Uuid::new_v4(),
        Some(Uuid::new_v4()),
        RoleClaim::Unknown("owner".to_string()),
    );

    let response = app
        .send(common::get_bearer("/api/auth/whoami", &token.token))
        .await;
    common::assert_error(response, 403, "invalid_role").await;
}

#[tokio::test]
async fn unreachable_database_is_tenant_isolation_not_a_pass() {
    let app = offline_app();
    let token = app.mint(Uuid::new_v4(), Some(Uuid::new_v4()), Role::Admin);

    let response = app
        .send(common::get_bearer("/admin/members", &token.token))
        .await;
    common::assert_error(response, 500, "tenant_isolation").await;
}

#[tokio::test]
async fn refresh_fails_closed_when_database_unreachable() {
    let app = offline_app();
    let token = app.mint(Uuid::new_v4(), Some(Uuid::new_v4()), Role::Viewer);

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/auth/refresh")
        .header(header::AUTHORIZATION, format!("Bearer {}", token.token))
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.send(request).await;
    common::assert_error(response, 500, "tenant_isolation").await;
}

#[tokio::test]
async fn super_admin_requirement_is_checked_before_any_database_work() {
    // CrossTenantGuard rejects a mere admin without touching the dead pool,
    // so the denial must be insufficient_role rather than tenant_isolation.
    let app = offline_app();
    let token = app.mint(Uuid::new_v4(), Some(Uuid::new_v4()), Role::Admin);

    let response = app
        .send(common::get_bearer("/admin/users", &token.token))
        .await;
    common::assert_error(response, 403, "insufficient_role").await;
}

#[tokio::test]
async fn header_wins_over_cookie_by_default() {
    // Garbage in the header, valid token in the cookie: the default
    // precedence consults the header and dies at verification.
    let app = offline_app();
    let token = app.mint(Uuid::new_v4(), None, Role::Viewer);
    let cookie_name = app.state.config.session.cookie_name.clone();

    let request = axum::http::Request::builder()
        .uri("/api/auth/whoami")
        .header(header::AUTHORIZATION, "Bearer garbage")
        .header(header::COOKIE, format!("{}={}", cookie_name, token.token))
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.send(request).await;
    common::assert_error(response, 401, "invalid_token").await;
}

#[tokio::test]
async fn cookie_wins_when_preferred() {
    // Same request shape, flipped precedence: the valid cookie token gets
    // through authentication and the request proceeds to the guard, which
    // rejects for the missing tenant instead.
    let mut config = common::test_config();
    config.session.prefer_cookie = true;
    let app = TestApp::new(
        StubProvider::failing(IdentityProviderError::Unreachable("unused".to_string())),
        common::unreachable_pool(),
        config,
    );
    let token = app.mint(Uuid::new_v4(), None, Role::Viewer);
    let cookie_name = app.state.config.session.cookie_name.clone();

    let request = axum::http::Request::builder()
        .uri("/api/auth/whoami")
        .header(header::AUTHORIZATION, "Bearer garbage")
        .header(header::COOKIE, format!("{}={}", cookie_name, token.token))
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.send(request).await;
    common::assert_error(response, 403, "tenant_unassigned").await;
}

#[tokio::test]
async fn cookie_alone_authenticates() {
    let app = offline_app();
    let token = app.mint(Uuid::new_v4(), None, Role::Viewer);
    let cookie_name = app.state.config.session.cookie_name.clone();

    let response = app
        .send(common::get_cookie(
            "/api/auth/whoami",
            &cookie_name,
            &token.token,
        ))
        .await;
    // Past authentication; denied by the guard, not the middleware.
    common::assert_error(response, 403, "tenant_unassigned").await;
}

#[tokio::test]
async fn logout_revokes_and_clears_the_cookie() {
    let app = offline_app();
    let token = app.mint(Uuid::new_v4(), Some(Uuid::new_v4()), Role::Viewer);

    let response = app
        .send(common::delete_bearer("/api/auth/session", &token.token))
        .await;
    assert_eq!(response.status().as_u16(), 204);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("logout must clear the session cookie")
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("prism_session="));
    assert!(set_cookie.contains("Max-Age=0"));
    assert!(set_cookie.contains("HttpOnly"));

    // The revoked jti is now refused everywhere.
    let response = app
        .send(common::get_bearer("/api/auth/whoami", &token.token))
        .await;
    common::assert_error(response, 401, "token_revoked").await;
}

#[tokio::test]
async fn logout_twice_is_idempotent() {
    let app = offline_app();
    let token = app.mint(Uuid::new_v4(), Some(Uuid::new_v4()), Role::Viewer);

    let first = app
        .send(common::delete_bearer("/api/auth/session", &token.token))
        .await;
    assert_eq!(first.status().as_u16(), 204);

    // The token itself is revoked, so the second logout is refused at
    // authentication rather than reaching the handler.
    let second = app
        .send(common::delete_bearer("/api/auth/session", &token.token))
        .await;
    common::assert_error(second, 401, "token_revoked").await;
}
