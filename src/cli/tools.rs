//! Tools CLI command handlers - tool discovery and info.

use anyhow::{bail, Result};

use chatline::config::Config;
use chatline::tools::{builtin_registry, Tool, ToolDescriptor};

use super::ToolsAction;

pub(crate) async fn cmd_tools(action: ToolsAction) -> Result<()> {
    let tools = Config::load().map(|c| c.tools).unwrap_or_default();
    let registry = builtin_registry(&tools)?;

    match action {
        ToolsAction::List => {
            let descriptors = registry.descriptors();
            println!("Available Tools ({} total)", descriptors.len());
            println!("{}", "=".repeat(60));
            println!();
            for descriptor in &descriptors {
                println!("  {:<30} {}", descriptor.name, descriptor.description);
                if !descriptor.parameters.is_empty() {
                    let params: Vec<&str> = descriptor
                        .parameters
                        .iter()
                        .map(|p| p.name.as_str())
                        .collect();
                    println!("  {:<30} params: {}", "", params.join(", "));
                }
            }
        }
        ToolsAction::Info { name } => {
            let Some(tool) = registry.get(&name) else {
                bail!(
                    "Unknown tool '{}'. Available: {}",
                    name,
                    registry.names().join(", ")
                );
            };
            print_info(&tool.descriptor());
        }
    }
    Ok(())
}

fn print_info(descriptor: &ToolDescriptor) {
    println!("Tool: {}", descriptor.name);
    println!("Description: {}", descriptor.description);
    if descriptor.parameters.is_empty() {
        println!("Parameters: none");
        return;
    }
    println!("Parameters:");
    for param in &descriptor.parameters {
        let marker = if param.required { "required" } else { "optional" };
        println!("  {:<20} ({}) {}", param.name, marker, param.description);
    }
}
