//! Fabri8 API Library
//!
//! This library turns a one-line website request into a generated site by
//! running a team of role agents through a phased build workflow, then
//! storing the resulting files and archive.

pub mod agents;
pub mod api;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod llm;
pub mod workflow;
