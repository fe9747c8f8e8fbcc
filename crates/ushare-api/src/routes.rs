//! Router

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::handlers::{auth, files, groups, health};
use crate::middleware::require_auth;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let max_body = state.config.storage.max_upload_bytes;

    // Public routes
    let public_routes = Router::new()
        .route("/healthcheck", get(health::health_check))
        .route("/user/registration", post(auth::register))
        .route("/user/login", post(auth::login));

    // Protected routes (bearer token)
    let protected_routes = Router::new()
        .route("/group/creation", post(groups::create_group))
        .route("/group/invitation", post(groups::add_member))
        .route("/group/membership/revocation", delete(groups::remove_member))
        .route("/group/deletion", delete(groups::deactivate_group))
        .route("/group/user/deletion", delete(auth::delete_user))
        .route("/group/file/upload", post(files::upload))
        .route("/group/file/download", get(files::download))
        .route("/group/file", get(files::file_info))
        .route("/group/file/deletion", delete(files::delete))
        .route("/group/files", get(files::list_files))
        .route("/groups", get(groups::list_groups))
        .route("/users", get(auth::list_users))
        .route("/group/users", get(groups::list_members))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .nest("/v1/public", public_routes)
        .nest("/v1/protected", protected_routes)
        // CORS
        .layer(CorsLayer::permissive())
        // Tracing
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        // Body limit (uploads)
        .layer(DefaultBodyLimit::max(max_body))
        .with_state(state)
}
