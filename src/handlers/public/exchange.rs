use axum::extract::State;
use axum::response::{IntoResponse, Json};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;

use crate::auth::cookie::session_cookie;
use crate::error::ApiError;
use crate::middleware::ApiJson;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ExchangeRequest {
    pub authorization_code: String,
    pub redirect_uri: String,
}

/// POST /auth/exchange - trade an OAuth2 authorization code for a session.
///
/// The response carries the token twice: in the JSON body for SPA memory and
/// as an HttpOnly cookie for browser-managed sessions. Which one the client
/// sends back is its choice; the authenticate middleware accepts both.
pub async fn exchange(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(body): ApiJson<ExchangeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate(&body)?;

    let session = state
        .exchange
        .exchange(body.authorization_code.trim(), body.redirect_uri.trim())
        .await?;

    let cookie = session_cookie(
        state.config.environment,
        &state.config.session,
        session.token.token.clone(),
        session.token.claims.expires_in_secs(),
    );

    let response = json!({
        "access_token": session.token.token,
        "expires_at": session.token.claims.exp,
        "first_login": session.first_login,
        "user": session.user,
    });

    Ok((jar.add(cookie), Json(response)))
}

fn validate(body: &ExchangeRequest) -> Result<(), ApiError> {
    let mut field_errors = HashMap::new();
    if body.authorization_code.trim().is_empty() {
        field_errors.insert(
            "authorization_code".to_string(),
            "must not be empty".to_string(),
        );
    }
    if body.redirect_uri.trim().is_empty() {
        field_errors.insert("redirect_uri".to_string(), "must not be empty".to_string());
    }

    if field_errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation_error(
            "Invalid exchange request",
            Some(field_errors),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_are_reported_individually() {
        let err = validate(&ExchangeRequest {
            authorization_code: "  ".to_string(),
            redirect_uri: String::new(),
        })
        .unwrap_err();

        assert_eq!(err.error_code(), "validation_error");
        let body = err.to_json();
        assert!(body["field_errors"]["authorization_code"].is_string());
        assert!(body["field_errors"]["redirect_uri"].is_string());
    }

    #[test]
    fn populated_request_passes() {
        assert!(validate(&ExchangeRequest {
            authorization_code: "code-123".to_string(),
            redirect_uri: "https://app.example.com/callback".to_string(),
        })
        .is_ok());
    }
}
