//! HTTP routes for the API Gate.
//!
//! Defines the Axum router and application state.

use crate::auth::gate::AuthGate;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_auth, AuthState};
use axum::{
    http::{header, Method, StatusCode},
    middleware,
    routing::{any, get},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

pub use crate::observability::metrics::init_metrics_recorder;

/// Request timeout applied to every route.
const REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Authentication gate applied to every request.
    pub gate: Arc<AuthGate>,
}

/// CORS policy: any origin, the methods and headers API clients use.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::POST,
            Method::GET,
            Method::OPTIONS,
            Method::PUT,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::ACCEPT, header::CONTENT_TYPE])
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness probe (simple "OK")
/// - `/metrics` - Prometheus metrics endpoint
/// - `/api/v1/auth/check` - Forward-auth endpoint (204 when admitted)
///
/// The gate middleware covers every route and the fallback; exceptions in
/// the gate decide which paths are public.
///
/// Layer order, outermost first:
/// 1. http_metrics_middleware - Record and log ALL responses
/// 2. CORS - answers preflight requests before authentication
/// 3. TraceLayer - request spans
/// 4. TimeoutLayer - 30 second request timeout
/// 5. require_auth - the authentication gate
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let auth_state = Arc::new(AuthState {
        gate: Arc::clone(&state.gate),
    });

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/v1/auth/check", any(handlers::auth_check))
        .merge(metrics_routes)
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(auth_state, require_auth))
        .layer(TimeoutLayer::new(Duration::from_secs(
            REQUEST_TIMEOUT_SECONDS,
        )))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .layer(middleware::from_fn(http_metrics_middleware))
}
