use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::AppState;
use crate::domain::project::{BuildPrompt, FrontendCode, ProjectMetadata, ProjectName};

/// Request body for generating a project
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub prompt: String,
    pub project_name: Option<String>,
}

/// Response from project generation
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub project_id: Uuid,
    pub status: String,
    pub message: String,
    pub code: FrontendCode,
    pub zip_url: String,
}

/// Health check endpoint
///
/// GET /health
pub async fn health_check() -> &'static str {
    "OK"
}

/// Run the build workflow for a prompt and store the generated site
///
/// POST /api/generate
pub async fn generate(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let prompt = BuildPrompt::new(req.prompt).map_err(ApiError::bad_request)?;
    let name = ProjectName::new(req.project_name.as_deref());
    let project_id = Uuid::new_v4();

    let outcome = state
        .orchestrator
        .start(&project_id.to_string(), prompt.as_str())
        .await
        .map_err(|e| {
            tracing::error!(project_id = %project_id, error = %e, "Workflow failed");
            ApiError::from(e)
        })?;

    let code = FrontendCode::from_value(&outcome.frontend_code);
    let manifest = state.projects.save_files(project_id, &code).await?;
    let archive = state.projects.create_archive(&manifest).await?;
    state.projects.save_archive(project_id, &archive).await?;
    // metadata last: a listed project always has its archive
    state
        .projects
        .save_metadata(&ProjectMetadata::completed(project_id, &name, &prompt))
        .await?;

    tracing::info!(project_id = %project_id, files = manifest.files.len(), "Project generated");

    Ok(Json(GenerateResponse {
        project_id,
        status: outcome.status.to_string(),
        message: "Website generated successfully".to_string(),
        code,
        zip_url: format!("/api/downloads/{}", project_id),
    }))
}

/// Get a project's metadata by ID
///
/// GET /api/projects/:id
pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectMetadata>, ApiError> {
    let metadata = state
        .projects
        .find_metadata(id)
        .await
        .map_err(|e| ApiError::internal_server_error(format!("Storage error: {}", e)))?
        .ok_or_else(|| ApiError::not_found(format!("Project not found: {}", id)))?;

    Ok(Json(metadata))
}

/// Download a project's zip archive
///
/// GET /api/downloads/:id
pub async fn download_archive(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let archive = state
        .projects
        .find_archive(id)
        .await
        .map_err(|e| ApiError::internal_server_error(format!("Storage error: {}", e)))?
        .ok_or_else(|| ApiError::not_found(format!("Archive not found: {}", id)))?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}.zip\"", id),
            ),
        ],
        archive,
    ))
}
