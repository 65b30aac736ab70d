use kestrel_llm::{Describe, Property, Schema};
use regex::Regex;
use serde::Deserialize;

use crate::event::{DisplayBody, ToolCallDisplay, ToolResultDisplay};
use crate::tool::{Error, Tool, ToolOutput};

const MAX_MATCHES: usize = 1000;

#[derive(Clone, Deserialize)]
pub struct GrepInput {
    /// Regular expression to search for.
    pub pattern: String,
    /// Directory to search, relative to the working directory. Defaults to ".".
    #[serde(default)]
    pub path: Option<String>,
    /// Restrict the search to files matching this glob (e.g. "*.rs").
    #[serde(default)]
    pub include: Option<String>,
}

impl Describe for GrepInput {
    fn describe() -> Schema {
        Schema::Object {
            description: None,
            properties: vec![
                Property {
                    name: "pattern".into(),
                    schema: Schema::String {
                        description: Some("Regular expression to search for".into()),
                        enumeration: None,
                    },
                },
                Property {
                    name: "path".into(),
                    schema: Schema::String {
                        description: Some(
                            "Directory to search, relative to the working directory".into(),
                        ),
                        enumeration: None,
                    },
                },
                Property {
                    name: "include".into(),
                    schema: Schema::String {
                        description: Some("Restrict the search to files matching this glob".into()),
                        enumeration: None,
                    },
                },
            ],
            required: vec!["pattern".into()],
        }
    }
}

pub struct GrepOutput {
    pub matches: Vec<String>,
    pub truncated: bool,
}

impl ToolOutput for GrepOutput {
    fn to_llm(&self) -> String {
        if self.matches.is_empty() {
            return "no matches".to_string();
        }
        let mut out = self.matches.join("\n");
        if self.truncated {
            out.push_str(&format!("\n... (truncated at {MAX_MATCHES} matches)"));
        }
        out
    }
}

/// Tool that searches file contents with a regex, honouring `.gitignore`.
#[derive(Clone)]
pub struct GrepTool {
    pub(crate) cwd: std::path::PathBuf,
}

impl Tool for GrepTool {
    type Input = GrepInput;
    type Output = GrepOutput;

    fn name(&self) -> &str {
        "grep"
    }

    fn description(&self) -> &str {
        "Search file contents for a regex pattern, honouring .gitignore. Returns `path:line:content` for each match, capped at 1000."
    }

    async fn call(&self, input: GrepInput) -> Result<GrepOutput, Error> {
        let cwd = self.cwd.clone();
        tokio::task::spawn_blocking(move || run_grep(&cwd, &input))
            .await
            .map_err(|e| Error::other(format!("grep task panicked: {e}")))?
    }

    fn render_input(&self, input: &GrepInput) -> ToolCallDisplay {
        ToolCallDisplay {
            title: format!("Grep `{}`", input.pattern),
            body: None,
        }
    }

    fn render_output(&self, _input: &GrepInput, output: &GrepOutput) -> ToolResultDisplay {
        ToolResultDisplay {
            title: format!("{} matches", output.matches.len()),
            body: if output.matches.is_empty() {
                None
            } else {
                Some(DisplayBody::Text(output.matches.join("\n")))
            },
        }
    }
}

fn run_grep(cwd: &std::path::Path, input: &GrepInput) -> Result<GrepOutput, Error> {
    let re = Regex::new(&input.pattern).map_err(|e| Error::other(format!("bad pattern: {e}")))?;
    let include = input
        .include
        .as_ref()
        .map(|g| globset::Glob::new(g).map(|g| g.compile_matcher()))
        .transpose()
        .map_err(|e| Error::other(format!("bad include glob: {e}")))?;

    let root = cwd.join(input.path.as_deref().unwrap_or("."));
    let mut matches = Vec::new();
    let mut truncated = false;

    for entry in ignore::WalkBuilder::new(&root).build() {
        if matches.len() >= MAX_MATCHES {
            truncated = true;
            break;
        }
        let Ok(entry) = entry else { continue };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = entry.path();
        if let Some(ref matcher) = include
            && !matcher.is_match(path.file_name().unwrap_or_default())
        {
            continue;
        }
        let Ok(content) = std::fs::read_to_string(path) else {
            continue; // skip binary/unreadable files
        };
        let display_path = path.strip_prefix(cwd).unwrap_or(path).display();
        for (lineno, line) in content.lines().enumerate() {
            if re.is_match(line) {
                matches.push(format!("{display_path}:{}:{line}", lineno + 1));
                if matches.len() >= MAX_MATCHES {
                    truncated = true;
                    break;
                }
            }
        }
    }

    Ok(GrepOutput { matches, truncated })
}
