use axum::extract::Path;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::audit;
use crate::database::models::{FlagOverride, FlagScope, Industry, InvalidFlagScope};
use crate::error::ApiError;
use crate::flags::{self, FlagQuery};
use crate::middleware::{ApiJson, Guard, MinAdmin};

/// GET /admin/feature-flags/:module - the module's effective decision plus
/// every override that feeds into it, global row included, for the admin
/// inheritance view.
///
/// Flag administration is deliberately not gated on the `admin_console`
/// flag itself; an admin who switched the console off could otherwise never
/// switch it back on.
pub async fn module_flags(
    mut guard: Guard<MinAdmin>,
    Path(module): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let effective = flags::resolve(&mut guard.db, &FlagQuery::module(module.clone())).await?;
    let overrides = flags::module_overrides(&mut guard.db, &module).await?;
    guard.db.commit().await?;

    Ok(Json(json!({
        "module": module,
        "effective": effective,
        "overrides": overrides,
    })))
}

#[derive(Debug, Deserialize)]
pub struct PutOverrideRequest {
    pub enabled: bool,
    pub feature: Option<String>,
    pub capability: Option<String>,
    pub config: Option<Value>,
}

/// PUT /admin/feature-flags/:module/:scope - create or update one override
/// row at the given scope.
pub async fn put_override(
    mut guard: Guard<MinAdmin>,
    Path((module, scope)): Path<(String, String)>,
    ApiJson(body): ApiJson<PutOverrideRequest>,
) -> Result<Json<FlagOverride>, ApiError> {
    let scope: FlagScope = scope
        .parse()
        .map_err(|e: InvalidFlagScope| ApiError::validation_error(e.to_string(), None))?;

    // A global row names no module; at that scope the path segment only
    // routes the request.
    let module_arg = match scope {
        FlagScope::Global => None,
        _ => Some(module.as_str()),
    };
    let feature = body.feature.as_deref().filter(|s| !s.trim().is_empty());
    let capability = body.capability.as_deref().filter(|s| !s.trim().is_empty());

    flags::validate_shape(scope, module_arg, feature, capability)
        .map_err(|e| ApiError::validation_error(e.to_string(), None))?;

    let config = body.config.unwrap_or_else(|| json!({}));
    let row = flags::put_override(
        &mut guard.db,
        scope,
        module_arg,
        feature,
        capability,
        body.enabled,
        config,
    )
    .await?;

    guard.db.commit().await?;
    audit::flag_changed(
        guard.context.claims.sub,
        guard.tenant_id,
        scope,
        module_arg,
        feature,
        capability,
        body.enabled,
    );

    Ok(Json(row))
}

/// POST /admin/feature-flags/reset-defaults - wipe the tenant's overrides
/// and reseed its industry's default module set.
pub async fn reset_defaults(mut guard: Guard<MinAdmin>) -> Result<Json<Value>, ApiError> {
    // RLS leaves exactly the caller's organisation visible
    let industry: Industry = sqlx::query_scalar("SELECT industry FROM organisations")
        .fetch_one(guard.db.conn())
        .await?;

    let (removed, seeded) = flags::reset_to_defaults(&mut guard.db, industry).await?;
    guard.db.commit().await?;

    audit::flags_reset(guard.context.claims.sub, guard.tenant_id, industry, seeded);

    Ok(Json(json!({
        "industry": industry,
        "removed": removed,
        "seeded": seeded,
    })))
}
