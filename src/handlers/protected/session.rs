use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;

use crate::audit;
use crate::auth::cookie::{clear_session_cookie, session_cookie};
use crate::database::models::{UserWithTenant, USER_WITH_TENANT_COLUMNS};
use crate::error::ApiError;
use crate::middleware::{AuthContext, Guard, MinViewer};
use crate::state::AppState;

/// GET /api/auth/whoami - the caller's user and tenant, read fresh from the
/// database rather than echoed from token claims.
pub async fn whoami(mut guard: Guard<MinViewer>) -> Result<Json<UserWithTenant>, ApiError> {
    let sql = format!(
        "SELECT {USER_WITH_TENANT_COLUMNS} \
         FROM users u \
         LEFT JOIN organisations o ON o.id = u.tenant_id \
         WHERE u.id = $1"
    );

    let user: Option<UserWithTenant> = sqlx::query_as(&sql)
        .bind(guard.context.claims.sub)
        .fetch_optional(guard.db.conn())
        .await?;
    let user = user.ok_or_else(|| ApiError::not_found("User not found"))?;

    guard.db.commit().await?;
    Ok(Json(user))
}

/// POST /api/auth/refresh - replace the current token with one minted from
/// current database state. Role and tenant changes land here, not on the
/// token already in flight.
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
    context: AuthContext,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.exchange.refresh(&context.claims).await?;

    let cookie = session_cookie(
        state.config.environment,
        &state.config.session,
        session.token.token.clone(),
        session.token.claims.expires_in_secs(),
    );

    let response = json!({
        "access_token": session.token.token,
        "expires_at": session.token.claims.exp,
        "user": session.user,
    });

    Ok((jar.add(cookie), Json(response)))
}

/// DELETE /api/auth/session - sign out. Revokes the token's jti when the
/// deny list is enabled and clears the session cookie either way.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    context: AuthContext,
) -> Result<impl IntoResponse, ApiError> {
    let revoked = state.codec.revoke(context.claims.jti, context.claims.exp);
    audit::logout(context.claims.sub, revoked);

    let cookie = clear_session_cookie(state.config.environment, &state.config.session);
    Ok((StatusCode::NO_CONTENT, jar.add(cookie)))
}
