// Handlers are grouped by authorization tier:
// public (no token) -> protected (verified token) -> elevated (super_admin
// cross-tenant). Routers in routes.rs mirror the same split.
pub mod elevated;
pub mod protected;
pub mod public;
