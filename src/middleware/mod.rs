pub mod authenticate;
pub mod guard;
pub mod json;

pub use authenticate::{authenticate, AuthContext};
pub use guard::{
    AdminConsole, CrossTenantGuard, FlagGate, FlagRequirement, Guard, MinAdmin, MinAnalyst,
    MinSuperAdmin, MinViewer, MinimumRole, NoFlag,
};
pub use json::ApiJson;
