mod commands;
mod config;
mod main_lib;

use clap::Parser;
use config::Cli;
use main_lib::{build_registry, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing();

    let registry = build_registry(&cli)?;
    commands::run(cli.command, registry).await
}
