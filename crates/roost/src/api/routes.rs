//! API route definitions.

use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Request, State};
use axum::http::{HeaderValue, Method, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::{
    Router, middleware,
    routing::{get, post},
};
use roost_files::{SandboxRoot, file_routes};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::auth::{AuthError, CurrentTenant, auth_middleware};
use crate::supervisor::SupervisorError;

use super::handlers;
use super::state::AppState;

/// Create the application router with configurable max upload size.
pub fn create_router_with_config(state: AppState, max_upload_size_mb: usize) -> Router {
    let cors = build_cors_layer(&state);
    let max_body_size = max_upload_size_mb * 1024 * 1024;

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let auth_state = state.auth.clone();

    // File surface routes run behind the sandbox scope so every request
    // carries the caller's sandbox root before any path is resolved.
    let files_router = file_routes()
        .layer(middleware::from_fn_with_state(
            state.clone(),
            scope_sandbox,
        ))
        .with_state(state.files.clone());

    // Protected routes (require a session)
    let protected_routes = Router::new()
        .route("/bot/start", post(handlers::start_bot))
        .route("/bot/stop", post(handlers::stop_bot))
        .route("/bot/restart", post(handlers::restart_bot))
        .route("/bot/status", get(handlers::bot_status))
        .route("/bot/logs", get(handlers::bot_logs))
        .with_state(state.clone())
        .merge(Router::new().nest("/files", files_router))
        .layer(middleware::from_fn_with_state(
            auth_state.clone(),
            auth_middleware,
        ));

    // Public routes (no session)
    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/login", post(handlers::login))
        .with_state(state);

    let api = Router::new().merge(public_routes).merge(protected_routes);

    Router::new()
        .nest("/api", api)
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(cors)
        .layer(trace_layer)
}

/// Resolve the caller's sandbox root and inject it for the file surface.
///
/// Runs after session auth, so a missing tenant means the request slipped
/// past the auth layer and is rejected outright.
async fn scope_sandbox(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let Some(tenant) = req.extensions().get::<CurrentTenant>().cloned() else {
        return AuthError::MissingToken.into_response();
    };

    let sandbox = match state.supervisor.tenant_dirs().ensure_sandbox(tenant.id()) {
        Ok(path) => path,
        Err(e) => return SupervisorError::Io(e).into_response(),
    };

    req.extensions_mut().insert(SandboxRoot(sandbox));
    next.run(req).await
}

/// Build the CORS layer based on configuration.
///
/// In dev mode with no configured origins, allows any origin. In production
/// mode, origins must be configured explicitly.
fn build_cors_layer(state: &AppState) -> CorsLayer {
    let allowed_origins = state.auth.allowed_origins();
    let dev_mode = state.auth.is_dev_mode();

    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];

    let headers = [
        header::AUTHORIZATION,
        header::CONTENT_TYPE,
        header::ACCEPT,
        header::ORIGIN,
        header::COOKIE,
    ];

    if allowed_origins.is_empty() {
        if dev_mode {
            tracing::warn!("CORS: no origins configured in dev mode, allowing any origin");
            CorsLayer::new()
                .allow_origin(AllowOrigin::any())
                .allow_methods(methods)
                .allow_headers(headers)
        } else {
            tracing::warn!(
                "CORS: no origins configured in production mode, denying all cross-origin requests"
            );
            CorsLayer::new().allow_origin(AllowOrigin::exact(HeaderValue::from_static("null")))
        }
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| {
                origin.parse::<HeaderValue>().ok().or_else(|| {
                    tracing::warn!("CORS: invalid origin in config: {}", origin);
                    None
                })
            })
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(methods)
            .allow_headers(headers)
            .allow_credentials(true)
    }
}
