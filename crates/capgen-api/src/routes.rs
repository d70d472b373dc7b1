//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::auth::{
    oauth_signin, register, request_otp, request_password_reset, signin, verify_password_reset,
    verify_registration, verify_signin,
};
use crate::handlers::clients::{add_client, get_client, list_clients};
use crate::handlers::credits::get_credit_usage;
use crate::handlers::transcribe::{
    generate, get_job, list_jobs, upload_and_generate, upload_file,
};
use crate::handlers::{health, ready};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    RateLimiterCache,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(register))
        .route("/verify-registration", post(verify_registration))
        .route("/signin", post(signin))
        .route("/verify-signin", post(verify_signin))
        .route("/request-otp", post(request_otp))
        .route("/request-password-reset", post(request_password_reset))
        .route("/verify-password-reset", post(verify_password_reset))
        .route("/oauth-signin", post(oauth_signin));

    let client_routes = Router::new()
        .route("/my-clients", get(list_clients))
        .route("/my-clients/:client_id", get(get_client))
        .route("/add-client", post(add_client));

    let transcribe_routes = Router::new()
        .route("/upload-file", post(upload_file))
        .route("/generate", post(generate))
        // Legacy combined upload + generate
        .route("/upload", post(upload_and_generate))
        .route("/job/:job_id", get(get_job))
        .route("/jobs", get(list_jobs));

    let credit_routes = Router::new().route("/usage", get(get_credit_usage));

    // OTP issuance is the brute-force target, keep its limiter tight
    let rate_limiter = std::sync::Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/clients", client_routes)
        .nest("/transcribe", transcribe_routes)
        .nest("/credits", credit_routes)
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        // axum's built-in limit defaults to 2MB, far too small for uploads
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
