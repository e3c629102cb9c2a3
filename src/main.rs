use std::process::ExitCode;

use vaultdrive::commands::{BridgeCommand, Cli, Commands};
use vaultdrive::VaultResult;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(tracing::Level::INFO)
        .init();

    let command = Cli::parse_command();
    match main_impl(command).await {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            eprintln!("{}", err.user_message());
            ExitCode::from(1)
        }
    }
}

async fn main_impl(command: Commands) -> VaultResult<i32> {
    let bridge = BridgeCommand::new()?;
    match command {
        Commands::Login => bridge.execute_login().await,
        Commands::Sync => bridge.execute_sync().await,
        Commands::Status => bridge.execute_status().await,
        Commands::Watch => bridge.execute_watch().await,
    }
}
