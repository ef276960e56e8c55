use super::{handlers, state::AppState};
use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Creates the Axum router with all the application routes.
pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route("/api/auth/login", post(handlers::login_handler))
        .route("/api/auth/logout", post(handlers::logout_handler))
        .route("/api/auth/me", get(handlers::me_handler))
        .route(
            "/api/contents",
            get(handlers::list_contents_handler).post(handlers::save_content_handler),
        )
        .route(
            "/api/contents/{id}",
            get(handlers::get_content_handler)
                .patch(handlers::update_content_handler)
                .delete(handlers::delete_content_handler),
        )
        .route("/api/search", get(handlers::search_handler))
        .route("/api/tags", get(handlers::list_tags_handler))
        .route("/api/stats", get(handlers::stats_handler))
        .route(
            "/api/folders",
            get(handlers::list_folders_handler).post(handlers::create_folder_handler),
        )
        .route(
            "/api/folders/{id}",
            patch(handlers::rename_folder_handler).delete(handlers::delete_folder_handler),
        )
        .route(
            "/api/folders/{id}/contents",
            get(handlers::folder_contents_handler).post(handlers::add_folder_content_handler),
        )
        .route(
            "/api/folders/{id}/contents/{content_id}",
            delete(handlers::remove_folder_content_handler),
        )
        .route("/telegram/webhook", post(handlers::telegram_webhook_handler))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}
