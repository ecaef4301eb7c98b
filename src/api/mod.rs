// API layer module (adapters for controllers)
// Follows Hexagonal Architecture - API is an adapter

pub mod errors;
pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::domain::repositories::ProjectRepository;
use crate::workflow::Orchestrator;
use handlers::projects;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub projects: Arc<dyn ProjectRepository>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>, projects: Arc<dyn ProjectRepository>) -> Self {
        Self {
            orchestrator,
            projects,
        }
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(projects::health_check))
        .route("/api/generate", post(projects::generate))
        .route("/api/projects/:id", get(projects::get_project))
        .route("/api/downloads/:id", get(projects::download_archive))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
