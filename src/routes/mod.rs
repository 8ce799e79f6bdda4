use axum::http::HeaderValue;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod audit;
pub mod documents;
pub mod files;
pub mod health;
pub mod requests;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = if let Some(origins) = state.config.cors_allowed_origin.as_ref() {
        let headers: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|value| {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| {
                    trimmed
                        .parse::<HeaderValue>()
                        .expect("invalid CORS allowed origin")
                })
            })
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(headers))
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
    };

    let requests_routes = Router::new()
        .route("/", get(requests::list_requests))
        .route("/:id", delete(requests::delete_request));

    let documents_routes = Router::new()
        .route("/", post(documents::create_request))
        .route("/upload", post(documents::create_request_and_upload))
        .route("/:id", delete(documents::discard_request))
        .route("/:id/upload", post(documents::upload_document))
        .route("/user/search", get(documents::user_search))
        .route("/institution/search", get(documents::institution_search));

    let files_routes = Router::new()
        .route("/upload", post(files::upload_file))
        .route("/download/:key", get(files::download_file));

    let audit_routes = Router::new()
        .route("/private", get(audit::query_private_audit_logs))
        .route("/public", get(audit::query_public_audit_logs));

    Router::new()
        .nest("/api/requests", requests_routes)
        .nest("/api/documents", documents_routes)
        .nest("/api/files", files_routes)
        .nest("/api/audit", audit_routes)
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(1024 * 1024 * 64))
}
