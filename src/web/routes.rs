use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(auth_routes())
        .merge(api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// Session transitions
pub fn auth_routes() -> Router<Arc<AppState>> {
    Router::new().nest(
        "/api",
        Router::new()
            .route("/check-auth", get(handlers::auth::check_auth))
            .route("/login", post(handlers::auth::login))
            .route("/logout", post(handlers::auth::logout)),
    )
}

// Query lifecycle
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest(
            "/api",
            Router::new()
                // Derived state and the draft
                .route("/state", get(handlers::api::get_state))
                .route("/input", put(handlers::api::set_input))

                // Lifecycle actions
                .route("/generate", post(handlers::api::generate))
                .route("/execute", post(handlers::api::execute))
                .route("/fix", post(handlers::api::fix))
                .route("/explain", post(handlers::api::explain))
                .route("/display-table", post(handlers::api::display_table))

                // Table browsing
                .route("/tables", get(handlers::api::list_tables))
                .route("/tables/{table}", get(handlers::api::get_table))
                .route("/table", put(handlers::api::select_table))
                .route("/display-all", post(handlers::api::display_all))

                // History, languages and export
                .route("/history", get(handlers::api::history))
                .route("/languages", get(handlers::api::list_languages))
                .route("/language", put(handlers::api::set_language))
                .route("/export", get(handlers::api::export_csv))
                .route("/status", get(handlers::api::system_status))
        )
}
