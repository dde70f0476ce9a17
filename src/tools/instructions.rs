//! Employee-ID update instructions tool
//!
//! Loads a markdown runbook template and fills in the identifiers the support
//! specialist supplied.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::warn;

use crate::error::{Result, ToolError};

use super::{ParameterSpec, Tool, ToolArguments};

const TOOL_NAME: &str = "updateEmployeeIdInstructions";

/// Placeholder token and the parameter that fills it.
const PLACEHOLDERS: &[(&str, &str)] = &[
    ("{{NEW_EE_ID}}", "newEmployeeId"),
    ("{{OLD_EE_ID}}", "oldEmployeeId"),
    ("{{COMPANY_ID}}", "companyId"),
    ("{{WORK_AGREEMENT_ID}}", "workAgreementId"),
];

/// Replace every placeholder token in `template` with its argument value.
pub fn render_template(template: &str, args: &ToolArguments) -> Result<String> {
    let mut rendered = template.to_string();
    for (token, param) in PLACEHOLDERS {
        rendered = rendered.replace(token, args.require(param)?);
    }
    Ok(rendered)
}

/// `updateEmployeeIdInstructions(newEmployeeId, oldEmployeeId, companyId, workAgreementId)`
///
/// The template is read on every call so edits take effect without a restart.
pub struct InstructionsTool {
    template_path: PathBuf,
}

impl InstructionsTool {
    pub fn new(template_path: impl Into<PathBuf>) -> Self {
        Self {
            template_path: template_path.into(),
        }
    }
}

#[async_trait]
impl Tool for InstructionsTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Provides a comprehensive, multi-step guide for a technical support specialist to \
         update an employee's ID in the backend system. The instructions are in Markdown \
         format and include all required database scripts, commands, and approval steps. \
         This tool requires the employee's old ID (e.g., '12345'), the employee's new ID \
         (e.g., '12345'), the employee's current work agreement ID (e.g., '12345N'), and \
         the employee's company ID (e.g., '12345')."
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::required("newEmployeeId", "The employee's new ID, e.g. '12345'"),
            ParameterSpec::required("oldEmployeeId", "The employee's old ID, e.g. '12345'"),
            ParameterSpec::required("companyId", "The employee's company ID, e.g. '12345'"),
            ParameterSpec::required(
                "workAgreementId",
                "The employee's current work agreement ID, e.g. '12345N'",
            ),
        ]
    }

    async fn execute(&self, args: &ToolArguments) -> Result<String> {
        let old_id = args.require("oldEmployeeId")?;

        let template = match tokio::fs::read_to_string(&self.template_path).await {
            Ok(t) => t,
            Err(e) => {
                warn!(
                    path = %self.template_path.display(),
                    error = %e,
                    "Failed to load instructions template"
                );
                return Err(ToolError::execution(
                    TOOL_NAME,
                    format!(
                        "Could not retrieve instructions for updating employee ID {}",
                        old_id
                    ),
                )
                .into());
            }
        };

        render_template(&template, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChatlineError;
    use std::io::Write;

    fn args() -> ToolArguments {
        ToolArguments::from_pairs(
            TOOL_NAME,
            &[
                ("oldEmployeeId", "111"),
                ("newEmployeeId", "222"),
                ("companyId", "33"),
                ("workAgreementId", "44N"),
            ],
        )
    }

    #[tokio::test]
    async fn test_bundled_template_is_fully_substituted() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/how-to-update-ee-id.md");
        let text = InstructionsTool::new(path).execute(&args()).await.unwrap();

        assert!(!text.contains("{{"), "unreplaced placeholder in:\n{}", text);
        for value in ["111", "222", "33", "44N"] {
            assert!(text.contains(value), "missing {}", value);
        }
    }

    #[tokio::test]
    async fn test_substitutes_each_placeholder() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "old={{{{OLD_EE_ID}}}} new={{{{NEW_EE_ID}}}} co={{{{COMPANY_ID}}}} wa={{{{WORK_AGREEMENT_ID}}}} again={{{{OLD_EE_ID}}}}"
        )
        .unwrap();

        let text = InstructionsTool::new(file.path())
            .execute(&args())
            .await
            .unwrap();
        assert_eq!(text, "old=111 new=222 co=33 wa=44N again=111");
    }

    #[tokio::test]
    async fn test_missing_template_is_execution_error() {
        let dir = tempfile::tempdir().unwrap();
        let tool = InstructionsTool::new(dir.path().join("absent.md"));
        let err = tool.execute(&args()).await.unwrap_err();

        match err {
            ChatlineError::Tool(ToolError::Execution { tool, message }) => {
                assert_eq!(tool, TOOL_NAME);
                assert_eq!(
                    message,
                    "Could not retrieve instructions for updating employee ID 111"
                );
            }
            other => panic!("expected execution error, got {:?}", other),
        }
    }

    #[test]
    fn test_render_template_requires_all_parameters() {
        let partial = ToolArguments::from_pairs(TOOL_NAME, &[("oldEmployeeId", "1")]);
        let err = render_template("{{NEW_EE_ID}}", &partial).unwrap_err();
        assert!(matches!(
            err,
            ChatlineError::Tool(ToolError::MissingArgument { .. })
        ));
    }
}
