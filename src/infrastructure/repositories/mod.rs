// Repository implementations (storage layer)
// Adapters that implement domain repository interfaces

pub mod fs_project_repository;

pub use fs_project_repository::FsProjectRepository;
