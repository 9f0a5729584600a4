use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Override granularity, from coarsest to finest. Resolution walks the
/// other way: capability, then feature, then module, then global.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagScope {
    Global,
    Module,
    Feature,
    Capability,
}

impl FlagScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagScope::Global => "global",
            FlagScope::Module => "module",
            FlagScope::Feature => "feature",
            FlagScope::Capability => "capability",
        }
    }
}

impl fmt::Display for FlagScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized flag scope '{0}'")]
pub struct InvalidFlagScope(pub String);

impl FromStr for FlagScope {
    type Err = InvalidFlagScope;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "global" => Ok(FlagScope::Global),
            "module" => Ok(FlagScope::Module),
            "feature" => Ok(FlagScope::Feature),
            "capability" => Ok(FlagScope::Capability),
            other => Err(InvalidFlagScope(other.to_string())),
        }
    }
}

impl sqlx::Type<sqlx::Postgres> for FlagScope {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <&str as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <&str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for FlagScope {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(raw.parse::<FlagScope>()?)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for FlagScope {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

/// A tenant's stored flag override. The database CHECK constraints enforce
/// the per-scope shape (global names nothing, capability names everything);
/// [`crate::flags`] re-validates before writing so admins get a 400, not a
/// constraint violation.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FlagOverride {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub scope: FlagScope,
    pub module: Option<String>,
    pub feature: Option<String>,
    pub capability: Option<String>,
    pub enabled: bool,
    pub config: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
