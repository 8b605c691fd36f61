// Common types and utilities shared across the application

pub mod lenient;
pub mod types;

pub use types::*;
