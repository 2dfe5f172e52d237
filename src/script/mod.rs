pub mod command;
pub mod loader;

pub use command::Command;
pub use loader::{Format, Script};

/// Maximum include depth to prevent infinite loops.
pub const MAX_INCLUDE_DEPTH: usize = 10;

/// Commands handled by the runner itself rather than the automation surface.
pub const RESERVED_COMMANDS: &[&str] = &["import", "value_of", "text_of", "include"];
