pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::resumes::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/create/:user_id", post(handlers::handle_create))
        .route("/update/:id", post(handlers::handle_update))
        .route("/delete/:id", delete(handlers::handle_delete))
        .route("/get/:user_id", get(handlers::handle_list))
        .route("/resume/:id", get(handlers::handle_get))
        .route("/get-by-id/:id", get(handlers::handle_get))
        .route("/download/:id", get(handlers::handle_download))
        .with_state(state)
}
