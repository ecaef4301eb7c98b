use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::domain::project::{Artifact, ArtifactKind, ArtifactManifest, FrontendCode, ProjectMetadata};
use crate::domain::repositories::ProjectRepository;

const METADATA_FILE: &str = "metadata.json";

/// Filesystem implementation of ProjectRepository
///
/// Every project lives in its own directory under the output root:
///
/// ```text
/// <root>/<project_id>/index.html
/// <root>/<project_id>/style.css      (only when non-empty)
/// <root>/<project_id>/script.js      (only when non-empty)
/// <root>/<project_id>/<project_id>.zip
/// <root>/<project_id>/metadata.json
/// ```
pub struct FsProjectRepository {
    root: PathBuf,
}

impl FsProjectRepository {
    /// Creates a new FsProjectRepository
    ///
    /// # Arguments
    /// * `root` - Directory holding one subdirectory per project
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn project_dir(&self, project_id: Uuid) -> PathBuf {
        self.root.join(project_id.to_string())
    }

    fn archive_path(&self, project_id: Uuid) -> PathBuf {
        self.project_dir(project_id)
            .join(format!("{}.zip", project_id))
    }

    async fn ensure_dir(&self, project_id: Uuid) -> Result<PathBuf, String> {
        let dir = self.project_dir(project_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| format!("Failed to create project directory: {}", e))?;
        Ok(dir)
    }
}

fn build_archive(entries: Vec<(String, Vec<u8>)>) -> Result<Vec<u8>, String> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, bytes) in entries {
        writer
            .start_file(name.as_str(), options)
            .map_err(|e| format!("Failed to add {} to archive: {}", name, e))?;
        writer
            .write_all(&bytes)
            .map_err(|e| format!("Failed to write {} to archive: {}", name, e))?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| format!("Failed to finish archive: {}", e))?;
    Ok(cursor.into_inner())
}

#[async_trait]
impl ProjectRepository for FsProjectRepository {
    async fn save_files(
        &self,
        project_id: Uuid,
        code: &FrontendCode,
    ) -> Result<ArtifactManifest, String> {
        let dir = self.ensure_dir(project_id).await?;
        let mut manifest = ArtifactManifest::new(project_id);

        let sources = [
            (ArtifactKind::Html, &code.html),
            (ArtifactKind::Css, &code.css),
            (ArtifactKind::Js, &code.js),
        ];
        for (kind, source) in sources {
            // index.html is always written, even when empty
            if kind != ArtifactKind::Html && source.is_empty() {
                continue;
            }
            let path = dir.join(kind.file_name());
            tokio::fs::write(&path, source.as_bytes())
                .await
                .map_err(|e| format!("Failed to write {}: {}", kind.file_name(), e))?;
            manifest.files.push(Artifact { kind, path });
        }

        tracing::debug!(
            project_id = %project_id,
            files = manifest.files.len(),
            "Saved generated files"
        );
        Ok(manifest)
    }

    async fn create_archive(&self, manifest: &ArtifactManifest) -> Result<Vec<u8>, String> {
        let mut entries = Vec::with_capacity(manifest.files.len());
        for artifact in &manifest.files {
            let bytes = tokio::fs::read(&artifact.path)
                .await
                .map_err(|e| format!("Failed to read {}: {}", artifact.path.display(), e))?;
            entries.push((artifact.kind.file_name().to_string(), bytes));
        }

        tokio::task::spawn_blocking(move || build_archive(entries))
            .await
            .map_err(|e| format!("Archive task failed: {}", e))?
    }

    async fn save_archive(&self, project_id: Uuid, archive: &[u8]) -> Result<(), String> {
        self.ensure_dir(project_id).await?;
        tokio::fs::write(self.archive_path(project_id), archive)
            .await
            .map_err(|e| format!("Failed to save archive: {}", e))
    }

    async fn find_archive(&self, project_id: Uuid) -> Result<Option<Vec<u8>>, String> {
        match tokio::fs::read(self.archive_path(project_id)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(format!("Failed to read archive: {}", e)),
        }
    }

    async fn save_metadata(&self, metadata: &ProjectMetadata) -> Result<(), String> {
        let dir = self.ensure_dir(metadata.project_id).await?;
        let json = serde_json::to_vec_pretty(metadata)
            .map_err(|e| format!("Failed to serialize metadata: {}", e))?;
        tokio::fs::write(dir.join(METADATA_FILE), json)
            .await
            .map_err(|e| format!("Failed to save metadata: {}", e))
    }

    async fn find_metadata(&self, project_id: Uuid) -> Result<Option<ProjectMetadata>, String> {
        let path = self.project_dir(project_id).join(METADATA_FILE);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(format!("Failed to read metadata: {}", e)),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| format!("Failed to parse metadata: {}", e))
    }
}
