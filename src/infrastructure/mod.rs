// Infrastructure layer module
// Contains storage adapters for generated projects
// Follows Hexagonal Architecture

pub mod repositories;
