use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::handlers;
use crate::middleware::manage_session;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let max_upload_bytes = state.settings.server.max_upload_bytes;

    // Public routes (no session)
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check));

    // Session-scoped routes
    let session_routes = Router::new()
        .route("/api/files", get(handlers::files::list_files))
        .route("/api/upload", post(handlers::files::upload_file))
        .route("/api/cut", post(handlers::files::cut_file))
        .route("/api/download", post(handlers::files::download_archive))
        .route("/api/delete", post(handlers::files::delete_file))
        .route("/api/session", get(handlers::session::current_session))
        .route("/api/terminate", post(handlers::session::terminate_session))
        .layer(middleware::from_fn_with_state(state.clone(), manage_session));

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(CatchPanicLayer::new())
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}
