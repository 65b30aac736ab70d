use kestrel_llm::{Describe, Property, Schema};
use serde::Deserialize;

use crate::event::{ToolCallDisplay, ToolResultDisplay};
use crate::tool::{Error, PermissionScope, Tool, ToolOutput};

#[derive(Clone, Deserialize)]
pub struct SingleEdit {
    pub old: String,
    pub new: String,
}

impl Describe for SingleEdit {
    fn describe() -> Schema {
        Schema::Object {
            description: None,
            properties: vec![
                Property {
                    name: "old".into(),
                    schema: Schema::String {
                        description: Some("Exact text to find".into()),
                        enumeration: None,
                    },
                },
                Property {
                    name: "new".into(),
                    schema: Schema::String {
                        description: Some("Replacement text".into()),
                        enumeration: None,
                    },
                },
            ],
            required: vec!["old".into(), "new".into()],
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct MultiEditInput {
    /// The file path to edit, relative to the working directory.
    pub path: String,
    /// Edits applied sequentially to the running buffer. If any edit fails
    /// to match, the whole call fails and the file is left untouched.
    pub edits: Vec<SingleEdit>,
}

impl Describe for MultiEditInput {
    fn describe() -> Schema {
        Schema::Object {
            description: None,
            properties: vec![
                Property {
                    name: "path".into(),
                    schema: Schema::String {
                        description: Some(
                            "File path to edit, relative to the working directory".into(),
                        ),
                        enumeration: None,
                    },
                },
                Property {
                    name: "edits".into(),
                    schema: Schema::Array {
                        description: Some(
                            "Edits applied sequentially to the running buffer".into(),
                        ),
                        items: Box::new(SingleEdit::describe()),
                    },
                },
            ],
            required: vec!["path".into(), "edits".into()],
        }
    }
}

pub struct MultiEditOutput {
    pub path: String,
    pub edits_applied: usize,
}

impl ToolOutput for MultiEditOutput {
    fn to_llm(&self) -> String {
        format!("applied {} edits to {}", self.edits_applied, self.path)
    }
}

/// Tool that applies several exact-match find-and-replace edits to a file
/// as a single atomic write. Edits run sequentially against an in-memory
/// buffer; the file on disk is untouched unless every edit succeeds.
#[derive(Clone)]
pub struct MultiEditTool {
    pub(crate) cwd: std::path::PathBuf,
}

impl Tool for MultiEditTool {
    type Input = MultiEditInput;
    type Output = MultiEditOutput;

    fn name(&self) -> &str {
        "multiedit"
    }

    fn description(&self) -> &str {
        "Apply several exact-match find-and-replace edits to one file, in order, as a single atomic write. If any edit fails to match, no changes are written."
    }

    async fn call(&self, input: MultiEditInput) -> Result<MultiEditOutput, Error> {
        let path = self.cwd.join(&input.path);

        let mut buffer = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Error::other(format!("{}: {e}", path.display())))?;

        for (i, edit) in input.edits.iter().enumerate() {
            let count = buffer.matches(&edit.old).count();
            if count == 0 {
                return Err(Error::other(format!(
                    "edit {i}: old string not found in {}",
                    input.path
                )));
            }
            if count > 1 {
                return Err(Error::other(format!(
                    "edit {i}: old string found {count} times in {} (must be exactly 1)",
                    input.path
                )));
            }
            buffer = buffer.replacen(&edit.old, &edit.new, 1);
        }

        tokio::fs::write(&path, &buffer)
            .await
            .map_err(|e| Error::other(format!("{}: {e}", path.display())))?;

        Ok(MultiEditOutput {
            path: input.path,
            edits_applied: input.edits.len(),
        })
    }

    fn render_input(&self, input: &MultiEditInput) -> ToolCallDisplay {
        ToolCallDisplay {
            title: format!("Edit {} ({} edits)", input.path, input.edits.len()),
            body: None,
        }
    }

    fn render_output(&self, _input: &MultiEditInput, output: &MultiEditOutput) -> ToolResultDisplay {
        ToolResultDisplay {
            title: format!("Applied {} edits to {}", output.edits_applied, output.path),
            body: None,
        }
    }

    fn permission_scope(&self, input: &MultiEditInput) -> Option<PermissionScope> {
        Some(PermissionScope {
            action: input.path.clone(),
            path: Some(input.path.clone()),
        })
    }
}
