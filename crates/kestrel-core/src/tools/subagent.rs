use std::sync::Arc;

use kestrel_llm::{Describe, LanguageModel, Property, Schema};
use serde::Deserialize;

use crate::agent::Agent;
use crate::event::{AgentEvent, ToolCallDisplay, ToolResultDisplay};
use crate::permission::PermissionBroker;
use crate::tool::{Error, Tool, ToolOutput};

#[derive(Clone, Deserialize)]
pub struct AgentInput {
    /// The task to hand off to the sub-agent.
    pub prompt: String,
}

impl Describe for AgentInput {
    fn describe() -> Schema {
        Schema::Object {
            description: None,
            properties: vec![Property {
                name: "prompt".into(),
                schema: Schema::String {
                    description: Some("The task to hand off to the sub-agent".into()),
                    enumeration: None,
                },
            }],
            required: vec!["prompt".into()],
        }
    }
}

pub struct AgentOutput {
    pub result: String,
}

impl ToolOutput for AgentOutput {
    fn to_llm(&self) -> String {
        self.result.clone()
    }
}

/// Tool that delegates a bounded sub-task to a child agent running a
/// restricted Tool Registry (no Bash, Download, or nested Agent tool below
/// the depth limit). The child shares the parent's model handle and
/// inherits its session-level permission grants as a seed.
#[derive(Clone)]
pub struct AgentTool {
    pub(crate) model: Arc<LanguageModel>,
    pub(crate) cwd: std::path::PathBuf,
    pub(crate) permissions: PermissionBroker,
    pub(crate) parent_session_id: String,
    pub(crate) depth: usize,
}

impl Tool for AgentTool {
    type Input = AgentInput;
    type Output = AgentOutput;

    fn name(&self) -> &str {
        "agent"
    }

    fn description(&self) -> &str {
        "Delegate a bounded sub-task to a sub-agent with read/edit/search tools but no Bash or network access. Use for self-contained research or multi-step lookups that don't need the full tool set."
    }

    async fn call(&self, input: AgentInput) -> Result<AgentOutput, Error> {
        let child_session_id = format!("{}-sub{}-{}", self.parent_session_id, self.depth, sub_session_suffix());
        self.permissions
            .inherit_session_grants(&self.parent_session_id, &child_session_id);

        let child = Agent::with_restricted_tools(
            Arc::clone(&self.model),
            self.cwd.clone(),
            self.permissions.clone(),
            child_session_id,
        );

        let mut stream = child.submit(input.prompt);
        let mut result = String::new();
        while let Some(event) = stream.next().await {
            match event {
                AgentEvent::TextDelta { delta } => result.push_str(&delta),
                AgentEvent::Error { error } => return Err(Error::other(error)),
                AgentEvent::TurnComplete { .. } => break,
                _ => {}
            }
        }

        Ok(AgentOutput { result })
    }

    fn render_input(&self, input: &AgentInput) -> ToolCallDisplay {
        ToolCallDisplay {
            title: format!("Delegate: {}", truncate(&input.prompt, 80)),
            body: None,
        }
    }

    fn render_output(&self, _input: &AgentInput, output: &AgentOutput) -> ToolResultDisplay {
        ToolResultDisplay {
            title: "Sub-agent finished".to_string(),
            body: Some(crate::event::DisplayBody::Text(output.result.clone())),
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{head}…")
    }
}

fn sub_session_suffix() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    COUNTER.fetch_add(1, Ordering::Relaxed).to_string()
}
