//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the axum Router for the configured routing mode
//! - Mount the admin surface
//! - Wire up middleware (request ID, tracing, timeout)
//! - Serve on a listener until shutdown is signalled

use std::time::Duration;

use axum::{
    extract::Request,
    routing::{get, MethodRouter},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::config::settings::RoutingMode;
use crate::http::accounts::{get_account, ACCOUNTS_PATH};
use crate::http::handlers::gateway_handler;
use crate::lifecycle::shutdown;
use crate::lifecycle::startup::AppContext;

pub const X_REQUEST_ID: &str = "x-request-id";

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
    context: AppContext,
}

impl GatewayServer {
    pub fn new(context: AppContext) -> Self {
        let router = Self::build_router(&context);
        Self { router, context }
    }

    /// Build the axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(context: &AppContext) -> Router {
        let settings = &context.settings;

        let mut router: Router<AppContext> = match settings.routing_mode {
            RoutingMode::Path => Router::new()
                .route("/", gateway_methods())
                .route("/{*path}", gateway_methods()),
            RoutingMode::Operation => Router::new().route(ACCOUNTS_PATH, get(get_account)),
        };

        if settings.admin.enabled {
            router = router.merge(setup_admin_router(context));
        }

        router.with_state(context.clone()).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
                    let request_id = request
                        .headers()
                        .get(X_REQUEST_ID)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown");
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id,
                    )
                }))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TimeoutLayer::new(Duration::from_secs(
                    settings.timeouts.request_secs,
                ))),
        )
    }

    /// The fully layered router, for serving or in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routing_mode = ?self.context.settings.routing_mode,
            admin = self.context.settings.admin.enabled,
            "HTTP server starting"
        );
        if let Ok(snapshot) = self.context.store.snapshot() {
            tracing::info!(
                environment = %snapshot.environment(),
                countries = ?snapshot.country_codes(),
                paths = ?snapshot.paths(),
                "Serving configured endpoints"
            );
        }

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// The methods an endpoint may be configured with; anything else is 405.
fn gateway_methods() -> MethodRouter<AppContext> {
    get(gateway_handler)
        .post(gateway_handler)
        .put(gateway_handler)
        .delete(gateway_handler)
        .patch(gateway_handler)
}
