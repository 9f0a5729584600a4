use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

use crate::auth::role::RoleClaim;
use crate::config::AuthConfig;

/// Claims carried by every access token.
///
/// `tid` is absent for users that exist but have not been assigned to an
/// organisation yet; such tokens authenticate but cannot open tenant scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tid: Option<Uuid>,
    pub role: RoleClaim,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
    pub iss: String,
}

impl Claims {
    pub fn expires_in_secs(&self) -> i64 {
        self.exp - self.iat
    }
}

/// A freshly minted token together with the claims that went into it, so
/// callers can read `exp`/`jti` without re-parsing what they just signed.
#[derive(Debug, Clone)]
pub struct SignedToken {
    pub token: String,
    pub claims: Claims,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token revoked")]
    Revoked,
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Stateless HS256 mint/verify pair around a single signing secret.
///
/// The optional revocation list is in-process only. It exists so an explicit
/// sign-out takes effect before the token ages out; role changes and
/// deactivations are left to TTL expiry.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: String,
    ttl_secs: i64,
    revoked: Option<Mutex<HashMap<Uuid, i64>>>,
}

impl TokenCodec {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.leeway_secs;
        validation.set_issuer(&[&config.issuer]);

        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            issuer: config.issuer.clone(),
            ttl_secs: config.token_ttl_secs,
            revoked: config.revocation_enabled.then(|| Mutex::new(HashMap::new())),
        }
    }

    pub fn mint(
        &self,
        user_id: Uuid,
        tenant_id: Option<Uuid>,
        role: impl Into<RoleClaim>,
    ) -> Result<SignedToken, TokenError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id,
            tid: tenant_id,
            role: role.into(),
            iat: now,
            exp: now + self.ttl_secs,
            jti: Uuid::new_v4(),
            iss: self.issuer.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(SignedToken { token, claims })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed(e.to_string()),
            }
        })?;

        // Only consulted after the signature checks out
        if self.is_revoked(&data.claims.jti) {
            return Err(TokenError::Revoked);
        }

        Ok(data.claims)
    }

    pub fn revocation_enabled(&self) -> bool {
        self.revoked.is_some()
    }

    /// Records a jti on the deny list until the token's own expiry, at which
    /// point verification would reject it anyway. Returns false when
    /// revocation is disabled and nothing was recorded.
    pub fn revoke(&self, jti: Uuid, exp: i64) -> bool {
        match &self.revoked {
            Some(revoked) => {
                let mut revoked = revoked.lock().unwrap_or_else(PoisonError::into_inner);
                let now = Utc::now().timestamp();
                revoked.retain(|_, entry_exp| *entry_exp > now);
                revoked.insert(jti, exp);
                true
            }
            None => false,
        }
    }

    fn is_revoked(&self, jti: &Uuid) -> bool {
        match &self.revoked {
            Some(revoked) => revoked
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .contains_key(jti),
            None => false,
        }
    }
}
