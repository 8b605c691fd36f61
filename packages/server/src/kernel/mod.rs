//! Kernel module - server infrastructure and dependencies.

pub mod ai;
pub mod deps;
pub mod jobs;
pub mod response_parser;
pub mod test_dependencies;
pub mod traits;
pub mod unit_of_work;

pub use ai::OpenAIAdapter;
pub use deps::ServerDeps;
pub use jobs::{JobRegistry, JobRunner, TaskDispatcher};
pub use response_parser::ParseError;
pub use test_dependencies::{InMemoryStore, MockAI, TestDependencies};
pub use traits::*;
pub use unit_of_work::{PgUnitOfWork, PgUnitOfWorkFactory, Row, SqlValue};
