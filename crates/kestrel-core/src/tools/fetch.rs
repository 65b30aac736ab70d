use kestrel_llm::{Describe, Property, Schema};
use serde::Deserialize;

use crate::event::{DisplayBody, ToolCallDisplay, ToolResultDisplay};
use crate::tool::{Error, Tool, ToolOutput};

const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;
const MAX_REDIRECTS: usize = 5;

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FetchFormat {
    #[default]
    Markdown,
    Text,
    Html,
}

#[derive(Clone, Deserialize)]
pub struct FetchInput {
    /// The http(s) URL to fetch.
    pub url: String,
    /// Output format: "markdown" (default), "text", or "html".
    #[serde(default)]
    pub format: FetchFormat,
}

impl Describe for FetchInput {
    fn describe() -> Schema {
        Schema::Object {
            description: None,
            properties: vec![
                Property {
                    name: "url".into(),
                    schema: Schema::String {
                        description: Some("The http(s) URL to fetch".into()),
                        enumeration: None,
                    },
                },
                Property {
                    name: "format".into(),
                    schema: Schema::String {
                        description: Some("Output format".into()),
                        enumeration: Some(vec!["markdown".into(), "text".into(), "html".into()]),
                    },
                },
            ],
            required: vec!["url".into()],
        }
    }
}

pub struct FetchOutput {
    pub content: String,
}

impl ToolOutput for FetchOutput {
    fn to_llm(&self) -> String {
        self.content.clone()
    }
}

/// Tool that fetches a URL over HTTP(S) and converts the body to the
/// requested format. Read-only; never gated by the Permission Broker.
#[derive(Clone)]
pub struct FetchTool {
    client: reqwest::Client,
}

impl Default for FetchTool {
    fn default() -> Self {
        Self {
            client: reqwest::Client::builder()
                .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
                .build()
                .unwrap_or_default(),
        }
    }
}

impl Tool for FetchTool {
    type Input = FetchInput;
    type Output = FetchOutput;

    fn name(&self) -> &str {
        "fetch"
    }

    fn description(&self) -> &str {
        "Fetch a URL over HTTP(S) and return its body as markdown, plain text, or raw HTML."
    }

    async fn call(&self, input: FetchInput) -> Result<FetchOutput, Error> {
        if !input.url.starts_with("http://") && !input.url.starts_with("https://") {
            return Err(Error::other("only http(s) URLs are supported"));
        }

        let response = self
            .client
            .get(&input.url)
            .send()
            .await
            .map_err(|e| Error::other(format!("request failed: {e}")))?;

        if let Some(len) = response.content_length()
            && len as usize > MAX_BODY_BYTES
        {
            return Err(Error::other(format!(
                "response too large ({len} bytes, max {MAX_BODY_BYTES})"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::other(format!("failed to read body: {e}")))?;
        let body = if body.len() > MAX_BODY_BYTES {
            body.chars().take(MAX_BODY_BYTES).collect()
        } else {
            body
        };

        let content = match input.format {
            FetchFormat::Html => body,
            FetchFormat::Text => strip_html(&body),
            FetchFormat::Markdown => html_to_markdown(&body),
        };

        Ok(FetchOutput { content })
    }

    fn render_input(&self, input: &FetchInput) -> ToolCallDisplay {
        ToolCallDisplay {
            title: format!("Fetch {}", input.url),
            body: None,
        }
    }

    fn render_output(&self, _input: &FetchInput, output: &FetchOutput) -> ToolResultDisplay {
        ToolResultDisplay {
            title: format!("{} bytes", output.content.len()),
            body: Some(DisplayBody::Text(output.content.clone())),
        }
    }
}

/// Strip all tags, leaving the raw text content.
fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Minimal HTML-to-markdown reduction: preserve headings and link targets,
/// strip everything else. Not a full rendering pipeline.
fn html_to_markdown(html: &str) -> String {
    let mut out = String::new();
    let mut rest = html;
    let mut pending_href: Option<&str> = None;

    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let Some(end) = rest[start..].find('>') else {
            break;
        };
        let tag = &rest[start + 1..start + end];
        let closing = tag.starts_with('/');
        let tag_name = tag.trim_start_matches('/').split_whitespace().next().unwrap_or("");

        match (tag_name.to_lowercase().as_str(), closing) {
            ("h1", false) => out.push_str("\n# "),
            ("h2", false) => out.push_str("\n## "),
            ("h3", false) => out.push_str("\n### "),
            ("p" | "br" | "div" | "li", _) => out.push('\n'),
            ("a", false) => pending_href = extract_attr(tag, "href"),
            ("a", true) => {
                if let Some(href) = pending_href.take() {
                    out.push_str(&format!(" ({href})"));
                }
            }
            _ => {}
        }

        rest = &rest[start + end + 1..];
    }
    out.push_str(rest);

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn extract_attr<'a>(tag: &'a str, attr: &str) -> Option<&'a str> {
    let needle = format!("{attr}=\"");
    let start = tag.find(&needle)? + needle.len();
    let end = tag[start..].find('"')? + start;
    Some(&tag[start..end])
}
