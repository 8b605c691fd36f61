// Sidequest - AI generation service
//
// Generates side-job ideas, missions, and mission steps with a language model
// and persists them. Each request runs a small compiled workflow graph
// (generate -> save) inside a retrying background task.
//
// Pipelines are organized per-domain in domains/*/pipeline.rs

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;
pub mod workflow;

pub use config::*;
