// HTTP routes
pub mod generation;
pub mod health;
pub mod tasks;

pub use generation::*;
pub use health::*;
pub use tasks::*;
