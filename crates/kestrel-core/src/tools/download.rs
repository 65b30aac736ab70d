use kestrel_llm::{Describe, Property, Schema};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::event::{ToolCallDisplay, ToolResultDisplay};
use crate::tool::{Error, PermissionScope, Tool, ToolOutput};

#[derive(Clone, Deserialize)]
pub struct DownloadInput {
    /// The http(s) URL to download.
    pub url: String,
    /// Destination path, relative to the working directory.
    pub path: String,
}

impl Describe for DownloadInput {
    fn describe() -> Schema {
        Schema::Object {
            description: None,
            properties: vec![
                Property {
                    name: "url".into(),
                    schema: Schema::String {
                        description: Some("The http(s) URL to download".into()),
                        enumeration: None,
                    },
                },
                Property {
                    name: "path".into(),
                    schema: Schema::String {
                        description: Some("Destination path, relative to the working directory".into()),
                        enumeration: None,
                    },
                },
            ],
            required: vec!["url".into(), "path".into()],
        }
    }
}

pub struct DownloadOutput {
    pub path: String,
    pub bytes: usize,
    pub sha256: String,
}

impl ToolOutput for DownloadOutput {
    fn to_llm(&self) -> String {
        format!(
            "downloaded {} bytes to {} (sha256: {})",
            self.bytes, self.path, self.sha256
        )
    }
}

/// Tool that downloads a URL to a workspace-relative file, permission-gated.
#[derive(Clone)]
pub struct DownloadTool {
    pub(crate) cwd: std::path::PathBuf,
}

impl Tool for DownloadTool {
    type Input = DownloadInput;
    type Output = DownloadOutput;

    fn name(&self) -> &str {
        "download"
    }

    fn description(&self) -> &str {
        "Download a URL to a file in the workspace. Returns the byte count and sha256 hash."
    }

    async fn call(&self, input: DownloadInput) -> Result<DownloadOutput, Error> {
        if !input.url.starts_with("http://") && !input.url.starts_with("https://") {
            return Err(Error::other("only http(s) URLs are supported"));
        }

        let response = reqwest::get(&input.url)
            .await
            .map_err(|e| Error::other(format!("request failed: {e}")))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::other(format!("failed to read body: {e}")))?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let sha256 = format!("{:x}", hasher.finalize());

        let path = self.cwd.join(&input.path);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::other(format!("{}: {e}", parent.display())))?;
        }
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| Error::other(format!("{}: {e}", path.display())))?;

        Ok(DownloadOutput {
            path: input.path,
            bytes: bytes.len(),
            sha256,
        })
    }

    fn render_input(&self, input: &DownloadInput) -> ToolCallDisplay {
        ToolCallDisplay {
            title: format!("Download {} → {}", input.url, input.path),
            body: None,
        }
    }

    fn render_output(&self, _input: &DownloadInput, output: &DownloadOutput) -> ToolResultDisplay {
        ToolResultDisplay {
            title: format!("{} bytes → {}", output.bytes, output.path),
            body: None,
        }
    }

    fn permission_scope(&self, input: &DownloadInput) -> Option<PermissionScope> {
        Some(PermissionScope {
            action: input.path.clone(),
            path: Some(input.path.clone()),
        })
    }
}
