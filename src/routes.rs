use axum::http::{header, HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::handlers::{elevated, protected, public};
use crate::middleware::authenticate;
use crate::state::AppState;

/// Builds the complete application router. Tests call this with a state
/// carrying a stub provider or a dead pool; main.rs calls it with the real
/// wiring.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(public_routes())
        .merge(session_routes(&state))
        .merge(admin_routes(&state))
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .route("/auth/exchange", post(public::exchange))
}

/// Session endpoints need a verified token but no tenant scope; refresh and
/// logout must work for users awaiting tenant assignment.
fn session_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/auth/whoami", get(protected::session::whoami))
        .route("/api/auth/refresh", post(protected::session::refresh))
        .route("/api/auth/session", delete(protected::session::logout))
        .route_layer(from_fn_with_state(state.clone(), authenticate))
}

fn admin_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        // Tenant admin console (Guard-extracted, tenant-scoped)
        .route(
            "/admin/feature-flags/reset-defaults",
            post(protected::flags::reset_defaults),
        )
        .route(
            "/admin/feature-flags/:module",
            get(protected::flags::module_flags),
        )
        .route(
            "/admin/feature-flags/:module/:scope",
            put(protected::flags::put_override),
        )
        .route("/admin/members", get(protected::members::list_members))
        .route(
            "/admin/members/:id/role",
            put(protected::members::change_member_role),
        )
        // Cross-tenant surface (super_admin only)
        .route("/admin/users", get(elevated::users::list_users))
        .route("/admin/users/:id/role", put(elevated::users::set_user_role))
        .route("/admin/users/:id/tenant", put(elevated::users::assign_tenant))
        .route("/admin/users/:id", delete(elevated::users::deactivate_user))
        .route_layer(from_fn_with_state(state.clone(), authenticate))
}

/// Explicit origin allow-list when one is configured; cookies require
/// credentialed CORS, which in turn forbids wildcards. An empty list (the
/// development default) falls back to permissive.
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_credentials(true)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
    }
}
