//! Tools module - capabilities the model can call mid-conversation
//!
//! Every tool implements [`Tool`] and is registered once at startup in a
//! [`ToolRegistry`], which is then shared read-only by all conversations.
//!
//! Built-in tools:
//! - `getWeather` ([`weather::WeatherTool`])
//! - `getDatetime` ([`DatetimeTool`])
//! - `updateEmployeeIdInstructions` ([`InstructionsTool`])

pub mod datetime;
pub mod instructions;
pub mod registry;
pub mod types;
pub mod weather;

use std::sync::Arc;

use crate::config::ToolsConfig;
use crate::error::Result;

pub use datetime::DatetimeTool;
pub use instructions::InstructionsTool;
pub use registry::{ToolOutcome, ToolRegistry};
pub use types::{ParameterSpec, Tool, ToolArguments, ToolDescriptor};
pub use weather::{OpenMeteoClient, WeatherService, WeatherTool};

/// Build the registry with every built-in tool.
pub fn builtin_registry(config: &ToolsConfig) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    let weather = Arc::new(OpenMeteoClient::new(&config.weather)?);
    registry.register(Box::new(WeatherTool::new(weather)))?;
    registry.register(Box::new(DatetimeTool))?;
    registry.register(Box::new(InstructionsTool::new(
        config.instructions.template_path.clone(),
    )))?;
    Ok(registry)
}
