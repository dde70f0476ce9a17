//! Config check command handler.

use std::path::PathBuf;

use anyhow::{Context, Result};

use chatline::config::validate::{validate_config, DiagnosticLevel};
use chatline::config::Config;

use super::ConfigAction;

/// Validate configuration file.
pub(crate) async fn cmd_config(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Check { config } => {
            let config_path = config.unwrap_or_else(Config::path);
            println!("Config file: {}", config_path.display());

            if !config_path.exists() {
                println!("[OK] No config file found (using defaults)");
                return Ok(());
            }

            let content = tokio::fs::read_to_string(&config_path)
                .await
                .context("Failed to read config file")?;

            let raw: serde_json::Value = match serde_json::from_str(&content) {
                Ok(v) => v,
                Err(e) => {
                    println!("[ERROR] Invalid JSON: {}", e);
                    return Ok(());
                }
            };

            let diagnostics = validate_config(&raw);
            for diag in &diagnostics {
                println!("{}", diag);
            }

            let errors = diagnostics
                .iter()
                .filter(|d| d.level == DiagnosticLevel::Error)
                .count();
            let warnings = diagnostics
                .iter()
                .filter(|d| d.level == DiagnosticLevel::Warn)
                .count();

            if errors == 0 && warnings == 0 {
                println!("\nConfiguration looks good!");
            } else {
                println!("\nFound {} error(s), {} warning(s)", errors, warnings);
            }
        }
    }
    Ok(())
}
