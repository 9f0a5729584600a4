use sqlx::{FromRow, Row};
use std::sync::Arc;
use uuid::Uuid;

use crate::audit;
use crate::auth::provider::{ExternalIdentity, IdentityProvider};
use crate::auth::token::{Claims, SignedToken, TokenCodec};
use crate::database::models::{UserWithTenant, USER_WITH_TENANT_COLUMNS};
use crate::database::{TenantDb, TenantScope};
use crate::error::ApiError;

/// A session handed back to the HTTP layer: the minted token plus the fully
/// hydrated user DTO it was minted from.
#[derive(Debug)]
pub struct SessionIssued {
    pub token: SignedToken,
    pub user: UserWithTenant,
    pub first_login: bool,
}

/// Turns identity-provider logins into local sessions.
///
/// This service is the identity backbone: it must find users before any
/// tenant is known, so all its database work runs in the audited
/// `TenantScope::System`. It is also the only place besides refresh that
/// mints tokens.
pub struct AuthExchangeService {
    provider: Arc<dyn IdentityProvider>,
    codec: Arc<TokenCodec>,
    pool: sqlx::PgPool,
}

impl AuthExchangeService {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        codec: Arc<TokenCodec>,
        pool: sqlx::PgPool,
    ) -> Self {
        Self {
            provider,
            codec,
            pool,
        }
    }

    /// Full authorization-code login: provider exchange, user upsert, token
    /// mint. Provider I/O happens before any database work so a slow Auth0
    /// never holds a connection.
    pub async fn exchange(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<SessionIssued, ApiError> {
        let identity = self.provider.exchange_code(code, redirect_uri).await?;

        let mut db = TenantDb::begin(
            &self.pool,
            TenantScope::System {
                reason: "auth_exchange",
            },
        )
        .await?;

        let (user, first_login) = upsert_user(&mut db, &identity).await?;

        if !user.is_active {
            // transaction rolls back on drop; the upsert is not kept
            audit::login_denied_deactivated(user.id);
            return Err(ApiError::account_deactivated());
        }

        let tenant_id = user.tenant.as_ref().map(|t| t.id);
        let token = self.codec.mint(user.id, tenant_id, user.role)?;
        db.commit().await?;

        audit::login(user.id, tenant_id, first_login);
        Ok(SessionIssued {
            token,
            user,
            first_login,
        })
    }

    /// Issues a brand-new token from current database state. Replacement,
    /// not extension: this is where role and tenant changes take effect
    /// before the old token has expired.
    pub async fn refresh(&self, claims: &Claims) -> Result<SessionIssued, ApiError> {
        let mut db = TenantDb::begin(
            &self.pool,
            TenantScope::System {
                reason: "token_refresh",
            },
        )
        .await?;

        let user = load_user(&mut db, claims.sub)
            .await?
            .ok_or_else(|| ApiError::invalid_credentials("Account no longer exists"))?;

        if !user.is_active {
            audit::login_denied_deactivated(user.id);
            return Err(ApiError::account_deactivated());
        }

        let tenant_id = user.tenant.as_ref().map(|t| t.id);
        let token = self.codec.mint(user.id, tenant_id, user.role)?;
        db.commit().await?;

        audit::token_refreshed(user.id, tenant_id);
        Ok(SessionIssued {
            token,
            user,
            first_login: false,
        })
    }
}

/// Upserts by email and hydrates the tenant join in the same statement, so
/// the DTO reflects exactly the row the token will be minted from.
/// `xmax = 0` distinguishes a fresh insert from an update.
async fn upsert_user(
    db: &mut TenantDb,
    identity: &ExternalIdentity,
) -> Result<(UserWithTenant, bool), ApiError> {
    let sql = format!(
        "WITH upserted AS ( \
             INSERT INTO users (email, display_name, external_subject) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (email) DO UPDATE SET \
                 display_name = COALESCE(EXCLUDED.display_name, users.display_name), \
                 external_subject = COALESCE(users.external_subject, EXCLUDED.external_subject), \
                 updated_at = now() \
             RETURNING *, (xmax = 0) AS first_login \
         ) \
         SELECT {USER_WITH_TENANT_COLUMNS}, u.first_login \
         FROM upserted u \
         LEFT JOIN organisations o ON o.id = u.tenant_id"
    );

    let row = sqlx::query(&sql)
        .bind(&identity.email)
        .bind(&identity.display_name)
        .bind(&identity.subject)
        .fetch_one(db.conn())
        .await?;

    let first_login: bool = row.try_get("first_login")?;
    let user = UserWithTenant::from_row(&row)?;
    Ok((user, first_login))
}

async fn load_user(db: &mut TenantDb, id: Uuid) -> Result<Option<UserWithTenant>, ApiError> {
    let sql = format!(
        "SELECT {USER_WITH_TENANT_COLUMNS} \
         FROM users u \
         LEFT JOIN organisations o ON o.id = u.tenant_id \
         WHERE u.id = $1"
    );

    let user = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(db.conn())
        .await?;
    Ok(user)
}
