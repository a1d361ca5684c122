//! Command-line interface.

mod commands;

pub use commands::run;

/// Peek at argv for the verbose flag before the CLI is parsed, so logging
/// can be initialized first.
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}
