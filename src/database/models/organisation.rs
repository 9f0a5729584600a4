use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// Industry classification chosen at onboarding. It decides which module
/// defaults get seeded for the organisation; flag resolution itself never
/// consults it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Industry {
    Finance,
    Healthcare,
    Retail,
    Manufacturing,
    Technology,
    #[serde(other)]
    Other,
}

impl Industry {
    pub fn as_str(&self) -> &'static str {
        match self {
            Industry::Finance => "finance",
            Industry::Healthcare => "healthcare",
            Industry::Retail => "retail",
            Industry::Manufacturing => "manufacturing",
            Industry::Technology => "technology",
            Industry::Other => "other",
        }
    }

    /// Industry is descriptive, not security-relevant, so an unknown label
    /// written by a newer deployment reads back as `Other` instead of
    /// failing the row decode.
    pub fn from_str_lossy(raw: &str) -> Industry {
        match raw {
            "finance" => Industry::Finance,
            "healthcare" => Industry::Healthcare,
            "retail" => Industry::Retail,
            "manufacturing" => Industry::Manufacturing,
            "technology" => Industry::Technology,
            _ => Industry::Other,
        }
    }
}

impl fmt::Display for Industry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl sqlx::Type<sqlx::Postgres> for Industry {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <&str as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <&str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Industry {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Industry::from_str_lossy(raw))
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for Industry {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

/// The slice of an organisation embedded in user-facing DTOs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TenantSummary {
    pub id: Uuid,
    pub name: String,
    pub industry: Industry,
    pub subscription_tier: String,
}
