use kestrel_llm::{Describe, Property, Schema};
use serde::Deserialize;

use crate::event::{DisplayBody, ToolCallDisplay, ToolResultDisplay};
use crate::tool::{Error, Tool, ToolOutput};

const GRAPHQL_ENDPOINT: &str = "https://sourcegraph.com/.api/graphql";

const SEARCH_QUERY: &str = r#"
query Search($query: String!) {
  search(query: $query, version: V3) {
    results {
      results {
        __typename
        ... on FileMatch {
          repository { name }
          file { path url }
          lineMatches { lineNumber preview }
        }
      }
    }
  }
}
"#;

#[derive(Clone, Deserialize)]
pub struct SourcegraphInput {
    /// Sourcegraph search query.
    pub query: String,
    /// Maximum number of results to return (default 20).
    #[serde(default)]
    pub count: Option<u32>,
}

impl Describe for SourcegraphInput {
    fn describe() -> Schema {
        Schema::Object {
            description: None,
            properties: vec![
                Property {
                    name: "query".into(),
                    schema: Schema::String {
                        description: Some("Sourcegraph search query".into()),
                        enumeration: None,
                    },
                },
                Property {
                    name: "count".into(),
                    schema: Schema::Integer {
                        description: Some("Maximum number of results to return".into()),
                    },
                },
            ],
            required: vec!["query".into()],
        }
    }
}

pub struct SourcegraphOutput {
    pub hits: Vec<String>,
}

impl ToolOutput for SourcegraphOutput {
    fn to_llm(&self) -> String {
        if self.hits.is_empty() {
            "no results".to_string()
        } else {
            self.hits.join("\n")
        }
    }
}

/// Tool that searches public code via the Sourcegraph GraphQL API. External,
/// read-only, no permission gate.
#[derive(Clone, Default)]
pub struct SourcegraphTool {
    client: reqwest::Client,
}

impl Tool for SourcegraphTool {
    type Input = SourcegraphInput;
    type Output = SourcegraphOutput;

    fn name(&self) -> &str {
        "sourcegraph"
    }

    fn description(&self) -> &str {
        "Search public code on Sourcegraph. Returns matching file:line hits."
    }

    async fn call(&self, input: SourcegraphInput) -> Result<SourcegraphOutput, Error> {
        let count = input.count.unwrap_or(20).min(100);
        let query = format!("{} count:{count}", input.query);

        let body = serde_json::json!({
            "query": SEARCH_QUERY,
            "variables": { "query": query },
        });

        let response = self
            .client
            .post(GRAPHQL_ENDPOINT)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::other(format!("request failed: {e}")))?;

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::other(format!("invalid response: {e}")))?;

        let hits = parse_hits(&value);
        Ok(SourcegraphOutput { hits })
    }

    fn render_input(&self, input: &SourcegraphInput) -> ToolCallDisplay {
        ToolCallDisplay {
            title: format!("Sourcegraph search `{}`", input.query),
            body: None,
        }
    }

    fn render_output(&self, _input: &SourcegraphInput, output: &SourcegraphOutput) -> ToolResultDisplay {
        ToolResultDisplay {
            title: format!("{} hits", output.hits.len()),
            body: if output.hits.is_empty() {
                None
            } else {
                Some(DisplayBody::Text(output.hits.join("\n")))
            },
        }
    }
}

fn parse_hits(value: &serde_json::Value) -> Vec<String> {
    let mut hits = Vec::new();
    let Some(results) = value
        .pointer("/data/search/results/results")
        .and_then(|v| v.as_array())
    else {
        return hits;
    };

    for result in results {
        let repo = result
            .pointer("/repository/name")
            .and_then(|v| v.as_str())
            .unwrap_or("?");
        let path = result.pointer("/file/path").and_then(|v| v.as_str()).unwrap_or("?");
        let Some(lines) = result.pointer("/lineMatches").and_then(|v| v.as_array()) else {
            continue;
        };
        for line in lines {
            let lineno = line.get("lineNumber").and_then(|v| v.as_i64()).unwrap_or(0);
            let preview = line.get("preview").and_then(|v| v.as_str()).unwrap_or("");
            hits.push(format!("{repo}/{path}:{}:{preview}", lineno + 1));
        }
    }

    hits
}
