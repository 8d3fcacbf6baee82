/// Macro for prefixed status logging to stderr (only when stderr is a terminal).
///
/// Usage:
/// ```ignore
/// log_status!("pull", "Reset Head on {}", host);
/// log_status!("getdump", "Saved {}", local_path);
/// ```
#[macro_export]
macro_rules! log_status {
    ($prefix:expr, $($arg:tt)*) => {
        if ::std::io::IsTerminal::is_terminal(&::std::io::stderr()) {
            eprintln!("[{}] {}", $prefix, format_args!($($arg)*));
        }
    };
}

pub mod core;
pub mod utils;

// Users can write `caddie::config` instead of `caddie::core::config`
pub use core::*;
pub use utils::*;
