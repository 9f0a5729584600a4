use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Platform role, ordered from least to most privileged. `Ord` derives from
/// declaration order, so `satisfies` is a plain comparison and adding a tier
/// means inserting a variant in the right place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Viewer,
    Analyst,
    Admin,
    SuperAdmin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Viewer, Role::Analyst, Role::Admin, Role::SuperAdmin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Analyst => "analyst",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }

    /// A role satisfies a requirement when it is at least as privileged.
    pub fn satisfies(&self, required: Role) -> bool {
        *self >= required
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized role '{0}'")]
pub struct InvalidRole(pub String);

impl FromStr for Role {
    type Err = InvalidRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "viewer" => Ok(Role::Viewer),
            "analyst" => Ok(Role::Analyst),
            "admin" => Ok(Role::Admin),
            "super_admin" => Ok(Role::SuperAdmin),
            other => Err(InvalidRole(other.to_string())),
        }
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// Stored as TEXT; a value outside the known set fails the row decode rather
// than silently mapping to some default tier.
impl sqlx::Type<sqlx::Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <&str as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <&str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Role {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(raw.parse::<Role>()?)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for Role {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

/// Role as it appears in a token. Tokens are minted by us, but a newer
/// deployment may have minted a tier this build does not know about.
/// Preserving the raw string lets authorization reject it explicitly
/// instead of failing claim deserialization with a generic 401.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleClaim {
    Known(Role),
    Unknown(String),
}

impl RoleClaim {
    pub fn as_str(&self) -> &str {
        match self {
            RoleClaim::Known(role) => role.as_str(),
            RoleClaim::Unknown(raw) => raw,
        }
    }

    pub fn known(&self) -> Option<Role> {
        match self {
            RoleClaim::Known(role) => Some(*role),
            RoleClaim::Unknown(_) => None,
        }
    }
}

impl From<Role> for RoleClaim {
    fn from(role: Role) -> Self {
        RoleClaim::Known(role)
    }
}

impl Serialize for RoleClaim {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RoleClaim {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.parse::<Role>() {
            Ok(role) => RoleClaim::Known(role),
            Err(_) => RoleClaim::Unknown(raw),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hierarchy_is_total_and_ordered() {
        assert!(Role::Viewer < Role::Analyst);
        assert!(Role::Analyst < Role::Admin);
        assert!(Role::Admin < Role::SuperAdmin);

        // every role satisfies itself and everything below it
        for (i, role) in Role::ALL.iter().enumerate() {
            for (j, required) in Role::ALL.iter().enumerate() {
                assert_eq!(role.satisfies(*required), i >= j);
            }
        }
    }

    #[test]
    fn admin_does_not_satisfy_super_admin() {
        assert!(!Role::Admin.satisfies(Role::SuperAdmin));
        assert!(Role::SuperAdmin.satisfies(Role::Admin));
    }

    #[test]
    fn parse_round_trips() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert_eq!(
            "owner".parse::<Role>(),
            Err(InvalidRole("owner".to_string()))
        );
        // parsing is case-sensitive on purpose
        assert!("Admin".parse::<Role>().is_err());
    }

    #[test]
    fn unknown_claim_preserves_raw_value() {
        let claim: RoleClaim = serde_json::from_str("\"owner\"").unwrap();
        assert_eq!(claim, RoleClaim::Unknown("owner".to_string()));
        assert_eq!(claim.as_str(), "owner");
        assert_eq!(claim.known(), None);

        let claim: RoleClaim = serde_json::from_str("\"analyst\"").unwrap();
        assert_eq!(claim.known(), Some(Role::Analyst));
    }

    #[test]
    fn claim_serializes_as_plain_string() {
        let json = serde_json::to_string(&RoleClaim::Known(Role::SuperAdmin)).unwrap();
        assert_eq!(json, "\"super_admin\"");
        let json = serde_json::to_string(&RoleClaim::Unknown("owner".to_string())).unwrap();
        assert_eq!(json, "\"owner\"");
    }
}
