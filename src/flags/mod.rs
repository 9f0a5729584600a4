//! Feature flag resolution and administration.
//!
//! All reads and writes run inside the caller's [`TenantDb`] transaction:
//! RLS scopes them to the tenant, and a resolution sees one snapshot, so a
//! concurrent admin write is either fully visible or not at all.

pub mod defaults;

use serde::Serialize;

use crate::database::models::{FlagOverride, FlagScope, Industry};
use crate::database::TenantDb;

/// What to resolve: a module, optionally narrowed to a feature and a
/// capability within it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagQuery {
    pub module: String,
    pub feature: Option<String>,
    pub capability: Option<String>,
}

impl FlagQuery {
    pub fn module(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            feature: None,
            capability: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagSource {
    Capability,
    Feature,
    Module,
    Global,
    /// No override at any level. Disabled, and labeled distinctly so the
    /// admin inheritance view can tell "default off" from "explicitly off".
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlagDecision {
    pub enabled: bool,
    pub config: serde_json::Value,
    pub source: FlagSource,
}

impl FlagDecision {
    fn from_override(row: &FlagOverride, source: FlagSource) -> Self {
        Self {
            enabled: row.enabled,
            config: row.config.clone(),
            source,
        }
    }

    fn default_off() -> Self {
        Self {
            enabled: false,
            config: serde_json::json!({}),
            source: FlagSource::Default,
        }
    }
}

const OVERRIDE_COLUMNS: &str = "id, tenant_id, scope, module, feature, capability, \
     enabled, config, created_at, updated_at";

/// Resolves the effective decision for `query` inside the caller's tenant
/// transaction. One statement fetches every candidate level, then a pure
/// walk picks the most specific override present.
pub async fn resolve(db: &mut TenantDb, query: &FlagQuery) -> Result<FlagDecision, sqlx::Error> {
    let sql = format!(
        "SELECT {OVERRIDE_COLUMNS} FROM feature_flag_overrides \
         WHERE scope = 'global' \
            OR (scope = 'module' AND module = $1) \
            OR (scope = 'feature' AND module = $1 AND feature = $2) \
            OR (scope = 'capability' AND module = $1 AND feature = $2 AND capability = $3)"
    );

    let rows: Vec<FlagOverride> = sqlx::query_as(&sql)
        .bind(&query.module)
        .bind(&query.feature)
        .bind(&query.capability)
        .fetch_all(db.conn())
        .await?;

    Ok(effective(query, &rows))
}

/// Pure precedence walk: capability, then feature, then module, then global;
/// first override present wins. Nothing anywhere means disabled.
pub fn effective(query: &FlagQuery, rows: &[FlagOverride]) -> FlagDecision {
    let find = |scope: FlagScope| {
        rows.iter().find(|row| {
            row.scope == scope
                && match scope {
                    FlagScope::Global => true,
                    FlagScope::Module => row.module.as_deref() == Some(query.module.as_str()),
                    FlagScope::Feature => {
                        row.module.as_deref() == Some(query.module.as_str())
                            && row.feature == query.feature
                    }
                    FlagScope::Capability => {
                        row.module.as_deref() == Some(query.module.as_str())
                            && row.feature == query.feature
                            && row.capability == query.capability
                    }
                }
        })
    };

    if query.capability.is_some() {
        if let Some(row) = find(FlagScope::Capability) {
            return FlagDecision::from_override(row, FlagSource::Capability);
        }
    }
    if query.feature.is_some() {
        if let Some(row) = find(FlagScope::Feature) {
            return FlagDecision::from_override(row, FlagSource::Feature);
        }
    }
    if let Some(row) = find(FlagScope::Module) {
        return FlagDecision::from_override(row, FlagSource::Module);
    }
    if let Some(row) = find(FlagScope::Global) {
        return FlagDecision::from_override(row, FlagSource::Global);
    }

    FlagDecision::default_off()
}

/// Every override relevant to a module (its own rows at any scope plus the
/// tenant-wide global row), ordered coarse to fine for the admin view.
pub async fn module_overrides(
    db: &mut TenantDb,
    module: &str,
) -> Result<Vec<FlagOverride>, sqlx::Error> {
    let sql = format!(
        "SELECT {OVERRIDE_COLUMNS} FROM feature_flag_overrides \
         WHERE scope = 'global' OR module = $1 \
         ORDER BY CASE scope \
             WHEN 'global' THEN 0 \
             WHEN 'module' THEN 1 \
             WHEN 'feature' THEN 2 \
             ELSE 3 END, \
             feature NULLS FIRST, capability NULLS FIRST"
    );

    sqlx::query_as(&sql).bind(module).fetch_all(db.conn()).await
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlagShapeError {
    #[error("scope '{scope}' requires a {missing} name")]
    Missing {
        scope: FlagScope,
        missing: &'static str,
    },
    #[error("scope '{scope}' does not take a {extra} name")]
    Extra {
        scope: FlagScope,
        extra: &'static str,
    },
}

/// Per-scope shape: global names nothing, module names a module, feature
/// names module+feature, capability names all three. The table CHECK
/// enforces the same rule; validating here turns mistakes into a 400.
pub fn validate_shape(
    scope: FlagScope,
    module: Option<&str>,
    feature: Option<&str>,
    capability: Option<&str>,
) -> Result<(), FlagShapeError> {
    let require = |present: Option<&str>, name: &'static str| match present {
        Some(_) => Ok(()),
        None => Err(FlagShapeError::Missing {
            scope,
            missing: name,
        }),
    };
    let forbid = |present: Option<&str>, name: &'static str| match present {
        None => Ok(()),
        Some(_) => Err(FlagShapeError::Extra { scope, extra: name }),
    };

    match scope {
        FlagScope::Global => {
            forbid(module, "module")?;
            forbid(feature, "feature")?;
            forbid(capability, "capability")
        }
        FlagScope::Module => {
            require(module, "module")?;
            forbid(feature, "feature")?;
            forbid(capability, "capability")
        }
        FlagScope::Feature => {
            require(module, "module")?;
            require(feature, "feature")?;
            forbid(capability, "capability")
        }
        FlagScope::Capability => {
            require(module, "module")?;
            require(feature, "feature")?;
            require(capability, "capability")
        }
    }
}

/// Upserts one override row for the caller's tenant. The tenant id comes
/// straight from the transaction's session variable, so a row can never be
/// written for a tenant other than the one RLS is scoped to.
pub async fn put_override(
    db: &mut TenantDb,
    scope: FlagScope,
    module: Option<&str>,
    feature: Option<&str>,
    capability: Option<&str>,
    enabled: bool,
    config: serde_json::Value,
) -> Result<FlagOverride, sqlx::Error> {
    let sql = format!(
        "INSERT INTO feature_flag_overrides \
             (tenant_id, scope, module, feature, capability, enabled, config) \
         VALUES (NULLIF(current_setting('app.tenant_id', true), '')::uuid, \
                 $1, $2, $3, $4, $5, $6) \
         ON CONFLICT (tenant_id, scope, COALESCE(module, ''), COALESCE(feature, ''), \
                      COALESCE(capability, '')) \
         DO UPDATE SET enabled = EXCLUDED.enabled, \
                       config = EXCLUDED.config, \
                       updated_at = now() \
         RETURNING {OVERRIDE_COLUMNS}"
    );

    sqlx::query_as(&sql)
        .bind(scope)
        .bind(module)
        .bind(feature)
        .bind(capability)
        .bind(enabled)
        .bind(config)
        .fetch_one(db.conn())
        .await
}

/// Materializes the industry's default module set as enabled module-scope
/// rows. Existing rows are left alone, so re-running is safe and admin
/// edits survive provisioning retries.
pub async fn seed_industry_defaults(
    db: &mut TenantDb,
    industry: Industry,
) -> Result<u64, sqlx::Error> {
    let modules: Vec<String> = defaults::modules_for(industry)
        .iter()
        .map(|m| m.to_string())
        .collect();

    let result = sqlx::query(
        "INSERT INTO feature_flag_overrides (tenant_id, scope, module, enabled, config) \
         SELECT NULLIF(current_setting('app.tenant_id', true), '')::uuid, \
                'module', m, true, '{}'::jsonb \
         FROM unnest($1::text[]) AS m \
         ON CONFLICT (tenant_id, scope, COALESCE(module, ''), COALESCE(feature, ''), \
                      COALESCE(capability, '')) \
         DO NOTHING",
    )
    .bind(&modules)
    .execute(db.conn())
    .await?;

    Ok(result.rows_affected())
}

/// Wipes the tenant's overrides and reseeds the industry defaults.
/// Returns (removed, seeded).
pub async fn reset_to_defaults(
    db: &mut TenantDb,
    industry: Industry,
) -> Result<(u64, u64), sqlx::Error> {
    // no WHERE clause: RLS scopes the delete to the caller's tenant
    let removed = sqlx::query("DELETE FROM feature_flag_overrides")
        .execute(db.conn())
        .await?
        .rows_affected();

    let seeded = seed_industry_defaults(db, industry).await?;
    Ok((removed, seeded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn row(
        scope: FlagScope,
        module: Option<&str>,
        feature: Option<&str>,
        capability: Option<&str>,
        enabled: bool,
    ) -> FlagOverride {
        FlagOverride {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            scope,
            module: module.map(String::from),
            feature: feature.map(String::from),
            capability: capability.map(String::from),
            enabled,
            config: json!({}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn full_query() -> FlagQuery {
        FlagQuery {
            module: "analytics".to_string(),
            feature: Some("forecasting".to_string()),
            capability: Some("arima".to_string()),
        }
    }

    #[test]
    fn most_specific_override_wins() {
        // capability=on, feature=off, module=on, global=off
        let mut rows = vec![
            row(
                FlagScope::Capability,
                Some("analytics"),
                Some("forecasting"),
                Some("arima"),
                true,
            ),
            row(
                FlagScope::Feature,
                Some("analytics"),
                Some("forecasting"),
                None,
                false,
            ),
            row(FlagScope::Module, Some("analytics"), None, None, true),
            row(FlagScope::Global, None, None, None, false),
        ];

        let decision = effective(&full_query(), &rows);
        assert!(decision.enabled);
        assert_eq!(decision.source, FlagSource::Capability);

        // removing the capability row exposes the feature-level denial
        rows.remove(0);
        let decision = effective(&full_query(), &rows);
        assert!(!decision.enabled);
        assert_eq!(decision.source, FlagSource::Feature);

        rows.remove(0);
        let decision = effective(&full_query(), &rows);
        assert!(decision.enabled);
        assert_eq!(decision.source, FlagSource::Module);

        rows.remove(0);
        let decision = effective(&full_query(), &rows);
        assert!(!decision.enabled);
        assert_eq!(decision.source, FlagSource::Global);
    }

    #[test]
    fn no_override_anywhere_is_disabled_default() {
        let decision = effective(&full_query(), &[]);
        assert!(!decision.enabled);
        assert_eq!(decision.source, FlagSource::Default);
        assert_eq!(decision.config, json!({}));
    }

    #[test]
    fn module_query_ignores_finer_overrides() {
        let rows = vec![
            row(
                FlagScope::Capability,
                Some("analytics"),
                Some("forecasting"),
                Some("arima"),
                true,
            ),
            row(
                FlagScope::Feature,
                Some("analytics"),
                Some("forecasting"),
                None,
                true,
            ),
        ];

        // a module-level query only walks module and global
        let decision = effective(&FlagQuery::module("analytics"), &rows);
        assert!(!decision.enabled);
        assert_eq!(decision.source, FlagSource::Default);
    }

    #[test]
    fn other_modules_do_not_bleed_in() {
        let rows = vec![row(FlagScope::Module, Some("reports"), None, None, true)];
        let decision = effective(&FlagQuery::module("analytics"), &rows);
        assert_eq!(decision.source, FlagSource::Default);
    }

    #[test]
    fn config_comes_from_the_deciding_row() {
        let mut capability_row = row(
            FlagScope::Capability,
            Some("analytics"),
            Some("forecasting"),
            Some("arima"),
            true,
        );
        capability_row.config = json!({"horizon_days": 90});
        let module_row = row(FlagScope::Module, Some("analytics"), None, None, true);

        let decision = effective(&full_query(), &[capability_row, module_row]);
        assert_eq!(decision.config, json!({"horizon_days": 90}));
    }

    #[test]
    fn shape_validation_per_scope() {
        assert!(validate_shape(FlagScope::Global, None, None, None).is_ok());
        assert!(validate_shape(FlagScope::Module, Some("m"), None, None).is_ok());
        assert!(validate_shape(FlagScope::Feature, Some("m"), Some("f"), None).is_ok());
        assert!(validate_shape(FlagScope::Capability, Some("m"), Some("f"), Some("c")).is_ok());

        assert_eq!(
            validate_shape(FlagScope::Global, Some("m"), None, None),
            Err(FlagShapeError::Extra {
                scope: FlagScope::Global,
                extra: "module"
            })
        );
        assert_eq!(
            validate_shape(FlagScope::Capability, Some("m"), None, Some("c")),
            Err(FlagShapeError::Missing {
                scope: FlagScope::Capability,
                missing: "feature"
            })
        );
        assert_eq!(
            validate_shape(FlagScope::Module, Some("m"), None, Some("c")),
            Err(FlagShapeError::Extra {
                scope: FlagScope::Module,
                extra: "capability"
            })
        );
    }
}
