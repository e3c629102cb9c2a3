//! CLI command parsing and handlers.

pub mod bridge;
pub mod parser;

// Re-exports (used by main.rs)
pub use bridge::BridgeCommand;
pub use parser::{Cli, Commands};
