pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::lifecycle::startup::AppContext;

/// Admin routes, guarded by the optional API key.
pub fn setup_admin_router(context: &AppContext) -> Router<AppContext> {
    Router::new()
        .route("/admin/reload-config", post(reload_config))
        .route("/admin/countries", get(list_countries))
        .route("/admin/health", get(health))
        .route_layer(middleware::from_fn_with_state(
            context.clone(),
            admin_auth_middleware,
        ))
}
