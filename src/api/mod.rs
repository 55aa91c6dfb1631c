use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};

use crate::state::AppState;

pub mod handlers;
pub mod models;

pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // API routes
        .route("/api/health", get(handlers::health_handler))
        .route("/api/ai_search", post(handlers::ai_search_handler))
        .route("/api/batch_ai_search", post(handlers::batch_ai_search_handler))
        .route("/api/pdf_generator", post(handlers::pdf_generator_handler))
        .with_state(state)
        // Static file serving for the UI
        .fallback_service(ServeDir::new("static"))
        .layer(cors)
}
