//! Industry default catalog.
//!
//! "Industry selects feature defaults" is implemented entirely here: seeding
//! materializes these module names as enabled module-scope override rows for
//! the organisation. The resolver never branches on industry, so an admin
//! can freely edit or delete what seeding created.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::database::models::Industry;

// Module catalog. Route guards reference these by name.
pub const DASHBOARDS: &str = "dashboards";
pub const REPORTS: &str = "reports";
pub const ALERTS: &str = "alerts";
pub const NLQ: &str = "nlq";
pub const EXPORTS: &str = "exports";
pub const ADMIN_CONSOLE: &str = "admin_console";
pub const AUDIT_TRAIL: &str = "audit_trail";

/// Minimum any organisation gets, whatever its classification.
const BASELINE: &[&str] = &[DASHBOARDS, REPORTS, ADMIN_CONSOLE];

static INDUSTRY_DEFAULTS: Lazy<HashMap<Industry, &'static [&'static str]>> = Lazy::new(|| {
    HashMap::from([
        (
            Industry::Finance,
            &[DASHBOARDS, REPORTS, EXPORTS, AUDIT_TRAIL, ADMIN_CONSOLE][..],
        ),
        (
            Industry::Healthcare,
            &[DASHBOARDS, REPORTS, AUDIT_TRAIL, ADMIN_CONSOLE][..],
        ),
        (
            Industry::Retail,
            &[DASHBOARDS, REPORTS, ALERTS, NLQ, ADMIN_CONSOLE][..],
        ),
        (
            Industry::Manufacturing,
            &[DASHBOARDS, REPORTS, ALERTS, EXPORTS, ADMIN_CONSOLE][..],
        ),
        (
            Industry::Technology,
            &[DASHBOARDS, REPORTS, ALERTS, NLQ, EXPORTS, ADMIN_CONSOLE][..],
        ),
        (Industry::Other, BASELINE),
    ])
});

pub fn modules_for(industry: Industry) -> &'static [&'static str] {
    INDUSTRY_DEFAULTS
        .get(&industry)
        .copied()
        .unwrap_or(BASELINE)
}
