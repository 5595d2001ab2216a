//! CLI interface for coursedesk

pub mod commands;
mod output;

pub use output::*;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "coursedesk")]
#[command(author = "Krakaw")]
#[command(version = "1.0.0")]
#[command(about = "Course management API with role-based access", long_about = None)]
pub struct Cli {
    /// Path to the configuration file (defaults to searching for coursedesk.toml)
    #[arg(short, long, global = true, env = "COURSEDESK_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default coursedesk.toml in the current directory
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Start the HTTP API server
    Serve {
        /// Host to bind to (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Load and validate the configuration, then print it
    CheckConfig,
}
