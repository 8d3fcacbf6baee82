// Public modules
pub mod config;
pub mod error;
pub mod roles;
pub mod runner;
pub mod ssh;
pub mod tasks;

// Internal modules - not part of public API
pub(crate) mod paths;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
