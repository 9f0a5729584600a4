use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::audit;
use crate::auth::role::Role;
use crate::database::models::{UserWithTenant, USER_WITH_TENANT_COLUMNS};
use crate::database::TenantDb;
use crate::error::ApiError;
use crate::middleware::{ApiJson, CrossTenantGuard};

/// GET /admin/users - every user on the platform, unprovisioned accounts
/// (no tenant yet) included.
pub async fn list_users(mut guard: CrossTenantGuard) -> Result<Json<Vec<UserWithTenant>>, ApiError> {
    let sql = format!(
        "SELECT {USER_WITH_TENANT_COLUMNS} \
         FROM users u \
         LEFT JOIN organisations o ON o.id = u.tenant_id \
         ORDER BY u.email"
    );

    let users: Vec<UserWithTenant> = sqlx::query_as(&sql).fetch_all(guard.db.conn()).await?;
    guard.db.commit().await?;
    Ok(Json(users))
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: String,
}

/// PUT /admin/users/:id/role - set any user's role. No ceiling here; the
/// caller is already super_admin.
pub async fn set_user_role(
    mut guard: CrossTenantGuard,
    Path(id): Path<Uuid>,
    ApiJson(body): ApiJson<SetRoleRequest>,
) -> Result<Json<UserWithTenant>, ApiError> {
    let new_role: Role = body
        .role
        .parse()
        .map_err(|_| ApiError::validation_error(format!("unknown role '{}'", body.role), None))?;

    let previous: Option<Role> = sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(guard.db.conn())
        .await?;
    let previous = previous.ok_or_else(|| ApiError::not_found("User not found"))?;

    sqlx::query("UPDATE users SET role = $1, updated_at = now() WHERE id = $2")
        .bind(new_role)
        .bind(id)
        .execute(guard.db.conn())
        .await?;

    let user = fetch_user(&mut guard.db, id).await?;
    guard.db.commit().await?;
    audit::role_changed(guard.context.claims.sub, id, previous, new_role);

    Ok(Json(user))
}

#[derive(Debug, Deserialize)]
pub struct AssignTenantRequest {
    pub tenant_id: Uuid,
}

/// PUT /admin/users/:id/tenant - assign an unprovisioned user to an
/// organisation, or move them. The change takes effect in tokens minted
/// after the user's next refresh or login.
pub async fn assign_tenant(
    mut guard: CrossTenantGuard,
    Path(id): Path<Uuid>,
    ApiJson(body): ApiJson<AssignTenantRequest>,
) -> Result<Json<UserWithTenant>, ApiError> {
    let organisation: Option<Uuid> = sqlx::query_scalar("SELECT id FROM organisations WHERE id = $1")
        .bind(body.tenant_id)
        .fetch_optional(guard.db.conn())
        .await?;
    if organisation.is_none() {
        return Err(ApiError::not_found("Organisation not found"));
    }

    let updated = sqlx::query("UPDATE users SET tenant_id = $1, updated_at = now() WHERE id = $2")
        .bind(body.tenant_id)
        .bind(id)
        .execute(guard.db.conn())
        .await?;
    if updated.rows_affected() == 0 {
        return Err(ApiError::not_found("User not found"));
    }

    let user = fetch_user(&mut guard.db, id).await?;
    guard.db.commit().await?;
    audit::tenant_assigned(guard.context.claims.sub, id, Some(body.tenant_id));

    Ok(Json(user))
}

/// DELETE /admin/users/:id - deactivate an account. Soft: the row stays for
/// the audit trail, but exchanges and refreshes refuse it from now on.
pub async fn deactivate_user(
    mut guard: CrossTenantGuard,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if id == guard.context.claims.sub {
        return Err(ApiError::conflict("Cannot deactivate your own account"));
    }

    let updated = sqlx::query("UPDATE users SET is_active = false, updated_at = now() WHERE id = $1")
        .bind(id)
        .execute(guard.db.conn())
        .await?;
    if updated.rows_affected() == 0 {
        return Err(ApiError::not_found("User not found"));
    }

    guard.db.commit().await?;
    audit::user_deactivated(guard.context.claims.sub, id);

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_user(db: &mut TenantDb, id: Uuid) -> Result<UserWithTenant, ApiError> {
    let sql = format!(
        "SELECT {USER_WITH_TENANT_COLUMNS} \
         FROM users u \
         LEFT JOIN organisations o ON o.id = u.tenant_id \
         WHERE u.id = $1"
    );

    let user: Option<UserWithTenant> = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(db.conn())
        .await?;
    user.ok_or_else(|| ApiError::not_found("User not found"))
}
