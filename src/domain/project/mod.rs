// Project domain module
// Contains generated-project metadata, artifact manifests and value objects

#![allow(clippy::module_inception)]

pub mod project;
pub mod value_objects;

// Re-export main types for convenience
pub use project::{Artifact, ArtifactManifest, ProjectMetadata};
pub use value_objects::{ArtifactKind, BuildPrompt, FrontendCode, ProjectName};
