pub mod flag;
pub mod organisation;
pub mod user;

pub use flag::{FlagOverride, FlagScope, InvalidFlagScope};
pub use organisation::{Industry, TenantSummary};
pub use user::{MemberSummary, UserWithTenant, USER_WITH_TENANT_COLUMNS};
