//! CLI module - command parsing and dispatch
//!
//! All CLI logic lives here. `main.rs` calls `cli::run()`.

pub mod config;
pub mod serve;
pub mod tools;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};

use chatline::config::Config;

#[derive(Parser)]
#[command(name = "chatline")]
#[command(version)]
#[command(about = "Session-scoped streaming chat backend with tool calling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Config file (defaults to ~/.chatline/config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Override server.host
        #[arg(long)]
        host: Option<String>,
        /// Override server.port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Show the tools offered to the model
    Tools {
        #[command(subcommand)]
        action: Option<ToolsAction>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ToolsAction {
    /// List all tools (default)
    List,
    /// Show the parameters of one tool
    Info {
        /// Tool name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Check configuration for errors and warnings
    Check {
        /// Config file (defaults to ~/.chatline/config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Load the config at `path`, or the default location.
pub(crate) fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load().context("Failed to load config")?,
    };
    Ok(config)
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => {
            let mut cmd = Cli::command();
            cmd.print_help()?;
            println!();
        }
        Some(Commands::Serve { config, host, port }) => {
            serve::cmd_serve(config, host, port).await?;
        }
        Some(Commands::Tools { action }) => {
            tools::cmd_tools(action.unwrap_or(ToolsAction::List)).await?;
        }
        Some(Commands::Config { action }) => {
            config::cmd_config(action).await?;
        }
    }

    Ok(())
}
