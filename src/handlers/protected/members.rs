use axum::extract::Path;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::audit;
use crate::auth::role::Role;
use crate::database::models::MemberSummary;
use crate::error::ApiError;
use crate::middleware::{AdminConsole, ApiJson, Guard, MinAdmin};

/// GET /admin/members - every user in the caller's tenant. RLS does the
/// scoping; the query carries no tenant filter of its own.
pub async fn list_members(
    mut guard: Guard<MinAdmin, AdminConsole>,
) -> Result<Json<Vec<MemberSummary>>, ApiError> {
    let members: Vec<MemberSummary> = sqlx::query_as(
        "SELECT id, email, display_name, role, is_active FROM users ORDER BY email",
    )
    .fetch_all(guard.db.conn())
    .await?;

    guard.db.commit().await?;
    Ok(Json(members))
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: String,
}

/// PUT /admin/members/:id/role - change a member's role. The caller's own
/// role caps both sides: the role being granted and the member being changed,
/// so a lower tier can neither mint nor strip a higher one. Members of other
/// tenants are invisible here and 404.
pub async fn change_member_role(
    mut guard: Guard<MinAdmin, AdminConsole>,
    Path(id): Path<Uuid>,
    ApiJson(body): ApiJson<ChangeRoleRequest>,
) -> Result<Json<MemberSummary>, ApiError> {
    let new_role: Role = body
        .role
        .parse()
        .map_err(|_| ApiError::validation_error(format!("unknown role '{}'", body.role), None))?;

    if !guard.role.satisfies(new_role) {
        let path = format!("/admin/members/{}/role", id);
        audit::authorization_denied(guard.context.claims.sub, &path, "insufficient_role");
        return Err(ApiError::insufficient_role(new_role));
    }

    let previous: Option<Role> = sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(guard.db.conn())
        .await?;
    let previous = previous.ok_or_else(|| ApiError::not_found("Member not found"))?;

    if !guard.role.satisfies(previous) {
        let path = format!("/admin/members/{}/role", id);
        audit::authorization_denied(guard.context.claims.sub, &path, "insufficient_role");
        return Err(ApiError::insufficient_role(previous));
    }

    let member: MemberSummary = sqlx::query_as(
        "UPDATE users SET role = $1, updated_at = now() WHERE id = $2 \
         RETURNING id, email, display_name, role, is_active",
    )
    .bind(new_role)
    .bind(id)
    .fetch_one(guard.db.conn())
    .await?;

    guard.db.commit().await?;
    audit::role_changed(guard.context.claims.sub, id, previous, new_role);

    Ok(Json(member))
}
