use kestrel_llm::{Describe, Property, Schema};
use serde::Deserialize;

use crate::event::{DisplayBody, ToolCallDisplay, ToolResultDisplay};
use crate::tool::{Error, Tool, ToolOutput};

const MAX_RESULTS: usize = 1000;

#[derive(Clone, Deserialize)]
pub struct GlobInput {
    /// Glob pattern, e.g. "src/**/*.rs" or "**/*.{ts,tsx}".
    pub pattern: String,
    /// Directory the pattern is resolved against. Defaults to ".".
    #[serde(default)]
    pub path: Option<String>,
}

impl Describe for GlobInput {
    fn describe() -> Schema {
        Schema::Object {
            description: None,
            properties: vec![
                Property {
                    name: "pattern".into(),
                    schema: Schema::String {
                        description: Some(
                            "Glob pattern, e.g. \"src/**/*.rs\" or \"**/*.{ts,tsx}\"".into(),
                        ),
                        enumeration: None,
                    },
                },
                Property {
                    name: "path".into(),
                    schema: Schema::String {
                        description: Some("Directory the pattern is resolved against".into()),
                        enumeration: None,
                    },
                },
            ],
            required: vec!["pattern".into()],
        }
    }
}

pub struct GlobOutput {
    pub paths: Vec<String>,
    pub truncated: bool,
}

impl ToolOutput for GlobOutput {
    fn to_llm(&self) -> String {
        if self.paths.is_empty() {
            return "no matches".to_string();
        }
        let mut out = self.paths.join("\n");
        if self.truncated {
            out.push_str(&format!("\n... (truncated at {MAX_RESULTS} paths)"));
        }
        out
    }
}

/// Tool that expands a glob (with `**`, `*`, and `{a,b,c}` alternation)
/// against the filesystem.
#[derive(Clone)]
pub struct GlobTool {
    pub(crate) cwd: std::path::PathBuf,
}

impl Tool for GlobTool {
    type Input = GlobInput;
    type Output = GlobOutput;

    fn name(&self) -> &str {
        "glob"
    }

    fn description(&self) -> &str {
        "Find files matching a glob pattern (supports **, *, and {a,b,c} alternation). Returns matching paths, one per line."
    }

    async fn call(&self, input: GlobInput) -> Result<GlobOutput, Error> {
        let cwd = self.cwd.clone();
        tokio::task::spawn_blocking(move || run_glob(&cwd, &input))
            .await
            .map_err(|e| Error::other(format!("glob task panicked: {e}")))?
    }

    fn render_input(&self, input: &GlobInput) -> ToolCallDisplay {
        ToolCallDisplay {
            title: format!("Glob `{}`", input.pattern),
            body: None,
        }
    }

    fn render_output(&self, _input: &GlobInput, output: &GlobOutput) -> ToolResultDisplay {
        ToolResultDisplay {
            title: format!("{} paths", output.paths.len()),
            body: if output.paths.is_empty() {
                None
            } else {
                Some(DisplayBody::Text(output.paths.join("\n")))
            },
        }
    }
}

/// `globset` has no native `{a,b,c}` alternation support, so expand it
/// textually first — each branch becomes its own compiled glob.
fn expand_braces(pattern: &str) -> Vec<String> {
    if let Some(open) = pattern.find('{') {
        let Some(close) = pattern[open..].find('}').map(|i| i + open) else {
            return vec![pattern.to_string()];
        };
        let prefix = &pattern[..open];
        let suffix = &pattern[close + 1..];
        let alternatives = pattern[open + 1..close].split(',');
        let mut out = Vec::new();
        for alt in alternatives {
            for rest in expand_braces(suffix) {
                out.push(format!("{prefix}{alt}{rest}"));
            }
        }
        out
    } else {
        vec![pattern.to_string()]
    }
}

fn run_glob(cwd: &std::path::Path, input: &GlobInput) -> Result<GlobOutput, Error> {
    let root = cwd.join(input.path.as_deref().unwrap_or("."));

    let matchers: Vec<globset::GlobMatcher> = expand_braces(&input.pattern)
        .iter()
        .map(|p| {
            globset::GlobBuilder::new(p)
                .literal_separator(false)
                .build()
                .map(|g| g.compile_matcher())
        })
        .collect::<Result<_, _>>()
        .map_err(|e| Error::other(format!("bad pattern: {e}")))?;

    let mut paths = Vec::new();
    let mut truncated = false;

    for entry in ignore::WalkBuilder::new(&root).build() {
        if paths.len() >= MAX_RESULTS {
            truncated = true;
            break;
        }
        let Ok(entry) = entry else { continue };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(cwd).unwrap_or(path);
        if matchers.iter().any(|m| m.is_match(relative)) {
            paths.push(relative.display().to_string());
        }
    }

    paths.sort();
    Ok(GlobOutput { paths, truncated })
}
