use kestrel_llm::{Describe, Schema};
use kestrel_lsp::DiagnosticsStore;
use serde::Deserialize;
use std::sync::Arc;

use crate::event::{DisplayBody, ToolCallDisplay, ToolResultDisplay};
use crate::tool::{Error, Tool, ToolOutput};

#[derive(Clone, Deserialize)]
pub struct DiagnosticsInput {}

impl Describe for DiagnosticsInput {
    fn describe() -> Schema {
        Schema::Object {
            description: None,
            properties: vec![],
            required: vec![],
        }
    }
}

pub struct DiagnosticsOutput {
    pub lines: Vec<String>,
}

impl ToolOutput for DiagnosticsOutput {
    fn to_llm(&self) -> String {
        if self.lines.is_empty() {
            "no diagnostics".to_string()
        } else {
            self.lines.join("\n")
        }
    }
}

/// Tool that aggregates diagnostics from every attached LSP client. Read-only.
#[derive(Clone)]
pub struct DiagnosticsTool {
    pub(crate) stores: Arc<Vec<DiagnosticsStore>>,
}

impl Tool for DiagnosticsTool {
    type Input = DiagnosticsInput;
    type Output = DiagnosticsOutput;

    fn name(&self) -> &str {
        "diagnostics"
    }

    fn description(&self) -> &str {
        "Report aggregated diagnostics (errors, warnings) from every attached language server."
    }

    async fn call(&self, _input: DiagnosticsInput) -> Result<DiagnosticsOutput, Error> {
        let mut lines = Vec::new();
        for store in self.stores.iter() {
            for d in store.all() {
                lines.push(format!(
                    "{}:{}:{} {:?}: {}",
                    d.path.display(),
                    d.line + 1,
                    d.character + 1,
                    d.severity,
                    d.message
                ));
            }
        }
        Ok(DiagnosticsOutput { lines })
    }

    fn render_input(&self, _input: &DiagnosticsInput) -> ToolCallDisplay {
        ToolCallDisplay {
            title: "Check diagnostics".to_string(),
            body: None,
        }
    }

    fn render_output(&self, _input: &DiagnosticsInput, output: &DiagnosticsOutput) -> ToolResultDisplay {
        ToolResultDisplay {
            title: format!("{} diagnostics", output.lines.len()),
            body: if output.lines.is_empty() {
                None
            } else {
                Some(DisplayBody::Text(output.lines.join("\n")))
            },
        }
    }
}
