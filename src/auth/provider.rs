use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ProviderConfig;

/// What we learn about a user from the identity provider. This is the whole
/// surface the rest of the crate sees; Auth0 specifics stay in this module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    /// Provider-scoped stable subject, e.g. `auth0|64a1...`.
    pub subject: String,
    /// Lowercased; the provisioning key for local accounts.
    pub email: String,
    pub email_verified: bool,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityProviderError {
    #[error("authorization code rejected: {0}")]
    InvalidCode(String),
    #[error("identity provider unreachable: {0}")]
    Unreachable(String),
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

/// Seam between the auth exchange and the outside world. Production uses
/// [`Auth0Client`]; tests substitute a canned implementation.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<ExternalIdentity, IdentityProviderError>;
}

/// Auth0 authorization-code client: one POST to `/oauth/token`, one GET to
/// `/userinfo`. No retries; the frontend owns retry UX and a second token
/// exchange with the same code would fail anyway.
pub struct Auth0Client {
    http: reqwest::Client,
    token_url: String,
    userinfo_url: String,
    client_id: String,
    client_secret: String,
    audience: Option<String>,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
    redirect_uri: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    audience: Option<&'a str>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Default, Deserialize)]
struct UserInfo {
    sub: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    name: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
}

#[derive(Deserialize)]
struct Auth0ErrorBody {
    error: Option<String>,
    error_description: Option<String>,
}

impl Auth0Client {
    pub fn new(config: &ProviderConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let base = config.domain.trim_end_matches('/');
        Ok(Self {
            http,
            token_url: format!("{}/oauth/token", base),
            userinfo_url: format!("{}/userinfo", base),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            audience: config.audience.clone(),
        })
    }
}

#[async_trait]
impl IdentityProvider for Auth0Client {
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<ExternalIdentity, IdentityProviderError> {
        let request = TokenRequest {
            grant_type: "authorization_code",
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            code,
            redirect_uri,
            audience: self.audience.as_deref(),
        };

        let response = self
            .http
            .post(&self.token_url)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_token_failure(status, &body));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| IdentityProviderError::MalformedResponse(e.to_string()))?;

        let response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(IdentityProviderError::Unreachable(format!(
                "userinfo endpoint returned {}",
                status
            )));
        }

        let info: UserInfo = response
            .json()
            .await
            .map_err(|e| IdentityProviderError::MalformedResponse(e.to_string()))?;

        identity_from_userinfo(info)
    }
}

fn transport_error(err: reqwest::Error) -> IdentityProviderError {
    if err.is_timeout() {
        IdentityProviderError::Unreachable("request timed out".to_string())
    } else {
        IdentityProviderError::Unreachable(err.to_string())
    }
}

/// 4xx from the token endpoint means the code itself was no good (expired,
/// already used, wrong client). Anything else is the provider's problem.
fn classify_token_failure(
    status: reqwest::StatusCode,
    body: &str,
) -> IdentityProviderError {
    if status.is_client_error() {
        let detail = serde_json::from_str::<Auth0ErrorBody>(body)
            .ok()
            .and_then(|b| b.error_description.or(b.error))
            .unwrap_or_else(|| format!("token endpoint returned {}", status));
        IdentityProviderError::InvalidCode(detail)
    } else {
        IdentityProviderError::Unreachable(format!("token endpoint returned {}", status))
    }
}

fn identity_from_userinfo(info: UserInfo) -> Result<ExternalIdentity, IdentityProviderError> {
    if info.sub.is_empty() {
        return Err(IdentityProviderError::MalformedResponse(
            "userinfo missing subject".to_string(),
        ));
    }

    let email = info
        .email
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| {
            IdentityProviderError::MalformedResponse("userinfo missing email".to_string())
        })?;

    // Auth0 populates `name` for most connections; enterprise connections
    // sometimes only send the given/family pair.
    let display_name = info
        .name
        .filter(|n| !n.trim().is_empty())
        .or_else(|| match (info.given_name, info.family_name) {
            (Some(given), Some(family)) => Some(format!("{} {}", given.trim(), family.trim())),
            (Some(given), None) => Some(given.trim().to_string()),
            (None, Some(family)) => Some(family.trim().to_string()),
            (None, None) => None,
        })
        .filter(|n| !n.trim().is_empty());

    Ok(ExternalIdentity {
        subject: info.sub,
        email: email.trim().to_lowercase(),
        email_verified: info.email_verified,
        display_name,
    })
}
