use clap::Parser;
use tracing_subscriber::EnvFilter;

use storyfeed::commands::{self, Command};
use storyfeed::config::{Cli, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Ignoring unreadable .env: {}", e);
        }
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::debug!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    let command = cli.command.unwrap_or(Command::Serve);
    commands::execute(command, config).await
}
