use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use std::marker::PhantomData;
use uuid::Uuid;

use crate::audit;
use crate::auth::role::{Role, RoleClaim};
use crate::database::{TenantDb, TenantScope};
use crate::error::ApiError;
use crate::flags::{self, defaults, FlagQuery};
use crate::middleware::authenticate::AuthContext;
use crate::state::AppState;

/// Minimum-role markers for [`Guard`].
pub trait MinimumRole: Send + Sync + 'static {
    const MIN: Role;
}

pub struct MinViewer;
pub struct MinAnalyst;
pub struct MinAdmin;
pub struct MinSuperAdmin;

impl MinimumRole for MinViewer {
    const MIN: Role = Role::Viewer;
}
impl MinimumRole for MinAnalyst {
    const MIN: Role = Role::Analyst;
}
impl MinimumRole for MinAdmin {
    const MIN: Role = Role::Admin;
}
impl MinimumRole for MinSuperAdmin {
    const MIN: Role = Role::SuperAdmin;
}

/// Optional feature-flag requirement for [`Guard`].
#[derive(Debug, Clone, Copy)]
pub struct FlagRequirement {
    pub module: &'static str,
    pub feature: Option<&'static str>,
    pub capability: Option<&'static str>,
}

pub trait FlagGate: Send + Sync + 'static {
    const REQUIREMENT: Option<FlagRequirement>;
}

/// Default gate: role check only.
pub struct NoFlag;
impl FlagGate for NoFlag {
    const REQUIREMENT: Option<FlagRequirement> = None;
}

/// Gate for the tenant admin console endpoints.
pub struct AdminConsole;
impl FlagGate for AdminConsole {
    const REQUIREMENT: Option<FlagRequirement> = Some(FlagRequirement {
        module: defaults::ADMIN_CONSOLE,
        feature: None,
        capability: None,
    });
}

/// The single authorization entry point endpoints declare.
///
/// Extraction runs a fixed sequence with no skippable step: authenticated,
/// tenant assigned, tenant transaction open, role sufficient, feature flag
/// enabled. Each denial has its own status/code so a client can tell "who
/// are you" (401) from "you specifically may not" (403 variants). The
/// handler receives the still-open tenant transaction; it cannot touch the
/// database any other way.
pub struct Guard<M: MinimumRole, F: FlagGate = NoFlag> {
    pub context: AuthContext,
    pub tenant_id: Uuid,
    pub role: Role,
    pub db: TenantDb,
    _marker: PhantomData<fn() -> (M, F)>,
}

#[async_trait]
impl<S, M, F> FromRequestParts<S> for Guard<M, F>
where
    S: Send + Sync,
    AppState: FromRef<S>,
    M: MinimumRole,
    F: FlagGate,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let path = parts.uri.path().to_string();

        let context = parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or_else(|| ApiError::invalid_credentials("Authentication required"))?;

        let tenant_id = match context.claims.tid {
            Some(id) => id,
            None => {
                audit::authorization_denied(context.claims.sub, &path, "tenant_unassigned");
                return Err(ApiError::tenant_unassigned());
            }
        };

        // Fail closed: no tenant context, no handler.
        let mut db = TenantDb::begin(&state.pool, TenantScope::Tenant(tenant_id)).await?;

        let role = match &context.claims.role {
            RoleClaim::Known(role) => *role,
            RoleClaim::Unknown(raw) => {
                audit::authorization_denied(context.claims.sub, &path, "invalid_role");
                return Err(ApiError::invalid_role(raw));
            }
        };

        if !role.satisfies(M::MIN) {
            audit::authorization_denied(context.claims.sub, &path, "insufficient_role");
            return Err(ApiError::insufficient_role(M::MIN));
        }

        if let Some(requirement) = F::REQUIREMENT {
            let query = FlagQuery {
                module: requirement.module.to_string(),
                feature: requirement.feature.map(String::from),
                capability: requirement.capability.map(String::from),
            };
            let decision = flags::resolve(&mut db, &query).await?;
            if !decision.enabled {
                audit::authorization_denied(context.claims.sub, &path, "feature_disabled");
                return Err(ApiError::feature_disabled(requirement.module));
            }
        }

        Ok(Guard {
            context,
            tenant_id,
            role,
            db,
            _marker: PhantomData,
        })
    }
}

/// Authorization for the cross-tenant admin surface. Deliberately a
/// separate type from [`Guard`]: the super_admin requirement is checked
/// before any bypass context exists, and opening `CrossTenant` scope emits
/// its own audit event.
pub struct CrossTenantGuard {
    pub context: AuthContext,
    pub db: TenantDb,
}

#[async_trait]
impl<S> FromRequestParts<S> for CrossTenantGuard
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let path = parts.uri.path().to_string();

        let context = parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or_else(|| ApiError::invalid_credentials("Authentication required"))?;

        let role = match &context.claims.role {
            RoleClaim::Known(role) => *role,
            RoleClaim::Unknown(raw) => {
                audit::authorization_denied(context.claims.sub, &path, "invalid_role");
                return Err(ApiError::invalid_role(raw));
            }
        };

        if !role.satisfies(Role::SuperAdmin) {
            audit::authorization_denied(context.claims.sub, &path, "insufficient_role");
            return Err(ApiError::insufficient_role(Role::SuperAdmin));
        }

        let db = TenantDb::begin(
            &state.pool,
            TenantScope::CrossTenant {
                actor: context.claims.sub,
            },
        )
        .await?;

        Ok(CrossTenantGuard { context, db })
    }
}
