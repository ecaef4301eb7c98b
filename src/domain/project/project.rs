use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_objects::{ArtifactKind, BuildPrompt, ProjectName};

/// Metadata stored alongside a generated project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub project_id: Uuid,
    pub project_name: String,
    pub prompt: String,
    pub status: String,
    pub generated_at: DateTime<Utc>,
}

impl ProjectMetadata {
    /// Metadata for a project whose workflow completed
    pub fn completed(project_id: Uuid, name: &ProjectName, prompt: &BuildPrompt) -> Self {
        Self {
            project_id,
            project_name: name.as_str().to_string(),
            prompt: prompt.as_str().to_string(),
            status: "completed".to_string(),
            generated_at: Utc::now(),
        }
    }
}

/// One written file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
}

/// Files written for a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub project_id: Uuid,
    pub files: Vec<Artifact>,
}

impl ArtifactManifest {
    pub fn new(project_id: Uuid) -> Self {
        Self {
            project_id,
            files: Vec::new(),
        }
    }

    pub fn path_of(&self, kind: ArtifactKind) -> Option<&PathBuf> {
        self.files
            .iter()
            .find(|artifact| artifact.kind == kind)
            .map(|artifact| &artifact.path)
    }
}
