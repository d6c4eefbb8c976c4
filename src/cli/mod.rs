use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Backend;

mod commands;
pub use commands::*;

#[derive(Parser)]
#[command(name = "nowplaying-bridge")]
#[command(about = "Show local playback in the OS now-playing controls")]
#[command(version)]
pub struct Cli {
    /// Transport controls backend (overrides the config file)
    #[arg(long, global = true, env = "NOWPLAYING_BACKEND")]
    pub backend: Option<Backend>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Play audio files and mirror playback to the transport controls
    Play {
        /// Audio files, played in order
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Check whether transport controls are available
    Check,

    /// Show the configuration
    Config {
        /// Write the default configuration file
        #[arg(long)]
        init: bool,
    },
}
