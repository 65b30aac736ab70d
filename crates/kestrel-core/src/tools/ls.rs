use kestrel_llm::{Describe, Property, Schema};
use serde::Deserialize;

use crate::event::{DisplayBody, ToolCallDisplay, ToolResultDisplay};
use crate::tool::{Error, Tool, ToolOutput};
use crate::tools::exclude::{is_excluded_dir_name, is_excluded_file};

#[derive(Clone, Deserialize)]
pub struct LsInput {
    /// Directory to list, relative to the working directory. Defaults to ".".
    #[serde(default)]
    pub path: Option<String>,
}

impl Describe for LsInput {
    fn describe() -> Schema {
        Schema::Object {
            description: None,
            properties: vec![Property {
                name: "path".into(),
                schema: Schema::String {
                    description: Some("Directory to list, relative to the working directory".into()),
                    enumeration: None,
                },
            }],
            required: vec![],
        }
    }
}

pub struct LsOutput {
    pub tree: String,
}

impl ToolOutput for LsOutput {
    fn to_llm(&self) -> String {
        self.tree.clone()
    }
}

/// Tool that lists a directory tree, skipping excluded directories (`.git`,
/// `node_modules`, `target`, …) and dotfiles.
#[derive(Clone)]
pub struct LsTool {
    pub(crate) cwd: std::path::PathBuf,
}

impl Tool for LsTool {
    type Input = LsInput;
    type Output = LsOutput;

    fn name(&self) -> &str {
        "ls"
    }

    fn description(&self) -> &str {
        "List a directory tree, excluding build artifacts, VCS directories, and dotfiles."
    }

    async fn call(&self, input: LsInput) -> Result<LsOutput, Error> {
        let root = self.cwd.join(input.path.as_deref().unwrap_or("."));
        tokio::task::spawn_blocking(move || {
            let mut lines = Vec::new();
            walk(&root, 0, &mut lines);
            Ok(LsOutput {
                tree: lines.join("\n"),
            })
        })
        .await
        .map_err(|e| Error::other(format!("ls task panicked: {e}")))?
    }

    fn render_input(&self, input: &LsInput) -> ToolCallDisplay {
        ToolCallDisplay {
            title: format!("List {}", input.path.as_deref().unwrap_or(".")),
            body: None,
        }
    }

    fn render_output(&self, _input: &LsInput, output: &LsOutput) -> ToolResultDisplay {
        ToolResultDisplay {
            title: format!("{} lines", output.tree.lines().count()),
            body: Some(DisplayBody::Text(output.tree.clone())),
        }
    }
}

fn walk(dir: &std::path::Path, depth: usize, out: &mut Vec<String>) {
    let Ok(mut entries) = std::fs::read_dir(dir)
        .map(|it| it.filter_map(|e| e.ok()).collect::<Vec<_>>())
    else {
        return;
    };
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let path = entry.path();
        let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());

        if is_dir {
            if is_excluded_dir_name(name) {
                continue;
            }
            out.push(format!("{}{name}/", "  ".repeat(depth)));
            walk(&path, depth + 1, out);
        } else {
            if name.starts_with('.') || is_excluded_file(&path) {
                continue;
            }
            if entry.metadata().map(|m| m.len()).unwrap_or(0) > crate::tools::exclude::MAX_FILE_BYTES {
                continue;
            }
            out.push(format!("{}{name}", "  ".repeat(depth)));
        }
    }
}
