// HTTP API error types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::auth::role::Role;

/// HTTP API error with appropriate status codes and client-friendly messages.
///
/// Every response body has the same shape:
/// `{"status": "error", "code": "<machine_code>", "message": "<human text>"}`.
/// The `code` field is the contract clients branch on; messages may change.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest {
        code: &'static str,
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },

    // 401 Unauthorized
    Unauthorized { code: &'static str, message: String },

    // 403 Forbidden
    Forbidden { code: &'static str, message: String },

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    InternalServerError { code: &'static str, message: String },

    // 502 Bad Gateway (identity provider issues)
    BadGateway { code: &'static str, message: String },

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest { .. } => 400,
            ApiError::Unauthorized { .. } => 401,
            ApiError::Forbidden { .. } => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::InternalServerError { .. } => 500,
            ApiError::BadGateway { .. } => 502,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest { message, .. } => message,
            ApiError::Unauthorized { message, .. } => message,
            ApiError::Forbidden { message, .. } => message,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::InternalServerError { message, .. } => message,
            ApiError::BadGateway { message, .. } => message,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get machine-readable error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest { code, .. } => code,
            ApiError::Unauthorized { code, .. } => code,
            ApiError::Forbidden { code, .. } => code,
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::InternalServerError { code, .. } => code,
            ApiError::BadGateway { code, .. } => code,
            ApiError::ServiceUnavailable(_) => "service_unavailable",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "status": "error",
            "code": self.error_code(),
            "message": self.message(),
        });

        if let ApiError::BadRequest { field_errors: Some(field_errors), .. } = self {
            body["field_errors"] = json!(field_errors);
        }

        body
    }
}

// Static constructors, one per taxonomy code
impl ApiError {
    pub fn validation_error(
        message: impl Into<String>,
        field_errors: Option<HashMap<String, String>>,
    ) -> Self {
        ApiError::BadRequest {
            code: "validation_error",
            message: message.into(),
            field_errors,
        }
    }

    pub fn invalid_authorization_code(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            code: "invalid_authorization_code",
            message: message.into(),
            field_errors: None,
        }
    }

    pub fn invalid_credentials(message: impl Into<String>) -> Self {
        ApiError::Unauthorized {
            code: "invalid_credentials",
            message: message.into(),
        }
    }

    pub fn invalid_token(message: impl Into<String>) -> Self {
        ApiError::Unauthorized {
            code: "invalid_token",
            message: message.into(),
        }
    }

    pub fn token_expired() -> Self {
        ApiError::Unauthorized {
            code: "token_expired",
            message: "Access token has expired".to_string(),
        }
    }

    pub fn token_revoked() -> Self {
        ApiError::Unauthorized {
            code: "token_revoked",
            message: "Access token has been revoked".to_string(),
        }
    }

    pub fn insufficient_role(required: Role) -> Self {
        ApiError::Forbidden {
            code: "insufficient_role",
            message: format!("This operation requires the {} role or higher", required),
        }
    }

    pub fn invalid_role(raw: &str) -> Self {
        ApiError::Forbidden {
            code: "invalid_role",
            message: format!("Unrecognized role '{}' in credentials", raw),
        }
    }

    pub fn feature_disabled(module: &str) -> Self {
        ApiError::Forbidden {
            code: "feature_disabled",
            message: format!("The '{}' feature is not enabled for your organisation", module),
        }
    }

    pub fn tenant_unassigned() -> Self {
        ApiError::Forbidden {
            code: "tenant_unassigned",
            message: "Your account is not assigned to an organisation yet".to_string(),
        }
    }

    pub fn account_deactivated() -> Self {
        ApiError::Forbidden {
            code: "account_deactivated",
            message: "This account has been deactivated".to_string(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError {
            code: "internal_error",
            message: message.into(),
        }
    }

    pub fn tenant_isolation() -> Self {
        ApiError::InternalServerError {
            code: "tenant_isolation",
            message: "Could not establish tenant context".to_string(),
        }
    }

    pub fn identity_provider_unreachable(message: impl Into<String>) -> Self {
        ApiError::BadGateway {
            code: "identity_provider_unreachable",
            message: message.into(),
        }
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert other error types to ApiError
impl From<crate::auth::token::TokenError> for ApiError {
    fn from(err: crate::auth::token::TokenError) -> Self {
        match err {
            crate::auth::token::TokenError::Expired => ApiError::token_expired(),
            crate::auth::token::TokenError::Revoked => ApiError::token_revoked(),
            crate::auth::token::TokenError::Malformed(reason) => {
                ApiError::invalid_token(format!("Invalid access token: {}", reason))
            }
            crate::auth::token::TokenError::Signing(msg) => {
                tracing::error!("Token signing failure: {}", msg);
                ApiError::internal_server_error("Failed to issue access token")
            }
        }
    }
}

impl From<crate::database::tenant::TenantIsolationError> for ApiError {
    fn from(err: crate::database::tenant::TenantIsolationError) -> Self {
        // Log the real failure but never serve a request without tenant context
        tracing::error!("Tenant isolation failure: {}", err);
        ApiError::tenant_isolation()
    }
}

impl From<crate::auth::provider::IdentityProviderError> for ApiError {
    fn from(err: crate::auth::provider::IdentityProviderError) -> Self {
        match err {
            crate::auth::provider::IdentityProviderError::InvalidCode(msg) => {
                ApiError::invalid_authorization_code(msg)
            }
            crate::auth::provider::IdentityProviderError::Unreachable(msg) => {
                tracing::error!("Identity provider unreachable: {}", msg);
                ApiError::identity_provider_unreachable("Identity provider did not respond")
            }
            crate::auth::provider::IdentityProviderError::MalformedResponse(msg) => {
                tracing::error!("Identity provider returned malformed response: {}", msg);
                ApiError::identity_provider_unreachable("Identity provider returned an unusable response")
            }
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::not_found("Record not found"),
            other => {
                // Log the real error but return a generic message
                tracing::error!("Database error: {}", other);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}
