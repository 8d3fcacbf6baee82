//! Generic utility primitives with zero domain knowledge.
//!
//! - `shell` - Shell escaping and quoting
//! - `template` - String template rendering

pub mod shell;
pub(crate) mod template;
