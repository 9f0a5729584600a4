//! Security audit trail.
//!
//! Every event goes to the `audit` tracing target so operators can route it
//! to separate retention (e.g. `RUST_LOG=prism_api=info,audit=info` plus a
//! target filter in the collector). Events carry identifiers, never tokens
//! or secrets; HTTP responses stay generic while this log keeps the detail.

use uuid::Uuid;

use crate::auth::role::Role;
use crate::database::models::Industry;
use crate::database::models::FlagScope;

pub fn login(user_id: Uuid, tenant_id: Option<Uuid>, first_login: bool) {
    tracing::info!(
        target: "audit",
        event = "login",
        user_id = %user_id,
        tenant_id = ?tenant_id,
        first_login,
    );
}

pub fn login_denied_deactivated(user_id: Uuid) {
    tracing::warn!(
        target: "audit",
        event = "login_denied",
        reason = "account_deactivated",
        user_id = %user_id,
    );
}

pub fn token_refreshed(user_id: Uuid, tenant_id: Option<Uuid>) {
    tracing::info!(
        target: "audit",
        event = "token_refreshed",
        user_id = %user_id,
        tenant_id = ?tenant_id,
    );
}

pub fn logout(user_id: Uuid, revoked: bool) {
    tracing::info!(
        target: "audit",
        event = "logout",
        user_id = %user_id,
        revoked,
    );
}

/// RLS bypass for identity-backbone work. Always paired with the audited
/// call sites in the exchange service.
pub fn system_scope(reason: &'static str) {
    tracing::info!(
        target: "audit",
        event = "system_scope_opened",
        reason,
    );
}

/// RLS bypass on behalf of a super_admin.
pub fn cross_tenant_scope(actor: Uuid) {
    tracing::info!(
        target: "audit",
        event = "cross_tenant_scope_opened",
        actor = %actor,
    );
}

pub fn authorization_denied(user_id: Uuid, path: &str, code: &'static str) {
    tracing::warn!(
        target: "audit",
        event = "authorization_denied",
        user_id = %user_id,
        path,
        code,
    );
}

pub fn flag_changed(
    actor: Uuid,
    tenant_id: Uuid,
    scope: FlagScope,
    module: Option<&str>,
    feature: Option<&str>,
    capability: Option<&str>,
    enabled: bool,
) {
    tracing::info!(
        target: "audit",
        event = "feature_flag_changed",
        actor = %actor,
        tenant_id = %tenant_id,
        scope = %scope,
        module = ?module,
        feature = ?feature,
        capability = ?capability,
        enabled,
    );
}

pub fn flags_reset(actor: Uuid, tenant_id: Uuid, industry: Industry, seeded: u64) {
    tracing::info!(
        target: "audit",
        event = "feature_flags_reset",
        actor = %actor,
        tenant_id = %tenant_id,
        industry = %industry,
        seeded,
    );
}

pub fn role_changed(actor: Uuid, subject: Uuid, from: Role, to: Role) {
    tracing::info!(
        target: "audit",
        event = "role_changed",
        actor = %actor,
        subject = %subject,
        from = %from,
        to = %to,
    );
}

pub fn tenant_assigned(actor: Uuid, subject: Uuid, tenant_id: Option<Uuid>) {
    tracing::info!(
        target: "audit",
        event = "tenant_assigned",
        actor = %actor,
        subject = %subject,
        tenant_id = ?tenant_id,
    );
}

pub fn user_deactivated(actor: Uuid, subject: Uuid) {
    tracing::warn!(
        target: "audit",
        event = "user_deactivated",
        actor = %actor,
        subject = %subject,
    );
}
