//! Date-time tool

use async_trait::async_trait;
use chrono::Local;

use crate::error::Result;

use super::{ParameterSpec, Tool, ToolArguments};

/// `getDatetime()`: the server's local date and time.
pub struct DatetimeTool;

#[async_trait]
impl Tool for DatetimeTool {
    fn name(&self) -> &str {
        "getDatetime"
    }

    fn description(&self) -> &str {
        "Get the current date and time."
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![]
    }

    async fn execute(&self, _args: &ToolArguments) -> Result<String> {
        Ok(format!(
            "The current date and time is {}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        ))
    }
}
