use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::project::{ArtifactManifest, FrontendCode, ProjectMetadata};

/// Repository trait for generated projects
///
/// Defines the contract for persisting generated files, archives and
/// metadata. Implementations decide where and how they are stored.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Write the generated sources, returning what was written
    async fn save_files(
        &self,
        project_id: Uuid,
        code: &FrontendCode,
    ) -> Result<ArtifactManifest, String>;

    /// Package the manifest's files into zip bytes
    async fn create_archive(&self, manifest: &ArtifactManifest) -> Result<Vec<u8>, String>;

    /// Store a project's archive
    async fn save_archive(&self, project_id: Uuid, archive: &[u8]) -> Result<(), String>;

    /// Load a project's archive
    async fn find_archive(&self, project_id: Uuid) -> Result<Option<Vec<u8>>, String>;

    /// Save project metadata (insert or replace)
    async fn save_metadata(&self, metadata: &ProjectMetadata) -> Result<(), String>;

    /// Find project metadata by ID
    async fn find_metadata(&self, project_id: Uuid) -> Result<Option<ProjectMetadata>, String>;
}
