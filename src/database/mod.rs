pub mod models;
pub mod pool;
pub mod tenant;

pub use pool::{connect, health_check, run_migrations};
pub use tenant::{TenantDb, TenantIsolationError, TenantScope};
