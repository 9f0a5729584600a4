use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use crate::auth::role::Role;
use crate::database::models::organisation::TenantSummary;

/// User DTO with its organisation eagerly joined in.
///
/// This is always hydrated by a single LEFT JOIN inside the transaction that
/// read the user, never by a follow-up query at serialization time. Sessions
/// and whoami serialize this struct as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserWithTenant {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub tenant: Option<TenantSummary>,
}

impl<'r> FromRow<'r, PgRow> for UserWithTenant {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        // FK guarantees the join matched whenever tenant_id is present
        let tenant = match row.try_get::<Option<Uuid>, _>("tenant_id")? {
            Some(id) => Some(TenantSummary {
                id,
                name: row.try_get("tenant_name")?,
                industry: row.try_get("tenant_industry")?,
                subscription_tier: row.try_get("tenant_subscription_tier")?,
            }),
            None => None,
        };

        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            display_name: row.try_get("display_name")?,
            role: row.try_get("role")?,
            is_active: row.try_get("is_active")?,
            tenant,
        })
    }
}

/// Columns every `UserWithTenant` query must select. Kept next to the
/// `FromRow` impl so the aliases cannot drift apart.
pub const USER_WITH_TENANT_COLUMNS: &str = "u.id, u.email, u.display_name, u.role, \
     u.is_active, u.tenant_id, \
     o.name AS tenant_name, o.industry AS tenant_industry, \
     o.subscription_tier AS tenant_subscription_tier";

/// Row shape for the tenant-scoped member list.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MemberSummary {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub role: Role,
    pub is_active: bool,
}
