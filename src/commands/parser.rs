//! Command line interface definition.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "vaultdrive",
    about = "One-way sync bridge between a local vault and a Google Drive folder",
    version,
    disable_help_subcommand = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Authorize the bridge against Google Drive
    Login,

    /// Run one sync pass and exit
    Sync,

    /// Show authorization and sync state (default)
    Status,

    /// Keep syncing as the vault changes
    Watch,
}

impl Cli {
    pub fn parse_command() -> Commands {
        Cli::parse().command.unwrap_or(Commands::Status)
    }
}
