mod audio;
mod bridge;
mod cli;
mod config;
mod error;
mod models;
mod player;
mod session;
#[cfg(test)]
mod testing;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{App, Cli, Commands};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let app = App::new(cli.backend)?;

    match cli.command {
        Commands::Play { files } => {
            app.play(&files)?;
        }
        Commands::Check => {
            app.check()?;
        }
        Commands::Config { init } => {
            app.config(init)?;
        }
    }

    Ok(())
}
