use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use kestrel_llm::stream::{FinishReason, StreamEvent, Usage};
use kestrel_llm::{LanguageModel, Message, ToolDefinition};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::event::AgentEvent;
use crate::permission::{Decision, PermissionBroker};
use crate::tool::{Error as ToolError, ErasedTool, Tool};
use crate::tools::{
    BashTool, DownloadTool, EditTool, FetchTool, GlobTool, GrepTool, LsTool, MultiEditTool,
    ReadTool, SourcegraphTool, WriteTool,
};

/// Sub-agent recursion depth limit, matching the Session DAG's max-depth
/// invariant.
const MAX_AGENT_DEPTH: usize = 3;

// ---------------------------------------------------------------------------
// Agent state (shared between handle and spawned task)
// ---------------------------------------------------------------------------

struct AgentState {
    messages: Vec<Message>,
    tools: Vec<Box<dyn ErasedTool>>,
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// The core agent. Holds a language model, conversation history, and
/// registered tools. UI-agnostic — communicates via [`AgentEvent`]s.
pub struct Agent {
    model: Arc<LanguageModel>,
    system_prompt: Option<String>,
    state: Arc<Mutex<AgentState>>,
    permissions: PermissionBroker,
    session_id: String,
    configure: Option<Box<dyn Fn(&mut kestrel_llm::RequestBuilder) + Send + Sync>>,
}

impl Agent {
    /// Create a new agent backed by the given model.
    ///
    /// `permissions` gates every side-effecting tool call this agent makes;
    /// `session_id` scopes session-level permission grants and becomes the
    /// `(session_id, tool_name, scope)` key the broker remembers.
    pub fn new(model: LanguageModel, permissions: PermissionBroker, session_id: impl Into<String>) -> Self {
        Self {
            model: Arc::new(model),
            system_prompt: None,
            state: Arc::new(Mutex::new(AgentState {
                messages: Vec::new(),
                tools: Vec::new(),
            })),
            permissions,
            session_id: session_id.into(),
            configure: None,
        }
    }

    /// Create an agent with the full default coding tool set and a system
    /// prompt that turns it into a coding assistant.
    ///
    /// `cwd` is the working directory that file, bash, and fetch tools
    /// operate in.
    pub fn with_defaults(
        model: LanguageModel,
        cwd: PathBuf,
        permissions: PermissionBroker,
        session_id: impl Into<String>,
    ) -> Self {
        let session_id = session_id.into();
        let mut agent = Self::new(model, permissions, session_id);
        agent.system(system_prompt(&cwd));
        agent.register_default_tools(cwd, 0);
        agent
    }

    fn register_default_tools(&mut self, cwd: PathBuf, depth: usize) {
        self.tool(ReadTool { cwd: cwd.clone() });
        self.tool(WriteTool { cwd: cwd.clone() });
        self.tool(EditTool { cwd: cwd.clone() });
        self.tool(MultiEditTool { cwd: cwd.clone() });
        self.tool(GrepTool { cwd: cwd.clone() });
        self.tool(GlobTool { cwd: cwd.clone() });
        self.tool(LsTool { cwd: cwd.clone() });
        self.tool(FetchTool::default());
        self.tool(SourcegraphTool::default());
        self.tool(BashTool { cwd: cwd.clone() });
        self.tool(DownloadTool { cwd: cwd.clone() });

        if depth < MAX_AGENT_DEPTH {
            self.tool(crate::tools::AgentTool {
                model: Arc::clone(&self.model),
                cwd,
                permissions: self.permissions.clone(),
                parent_session_id: self.session_id.clone(),
                depth: depth + 1,
            });
        }
    }

    /// Like [`with_defaults`](Self::with_defaults), but excludes `Bash`,
    /// `Download`, and `Agent` itself — the restricted registry a sub-agent
    /// (Agent tool) runs with.
    pub(crate) fn with_restricted_tools(
        model: Arc<LanguageModel>,
        cwd: PathBuf,
        permissions: PermissionBroker,
        session_id: impl Into<String>,
    ) -> Self {
        let mut agent = Self {
            model,
            system_prompt: None,
            state: Arc::new(Mutex::new(AgentState {
                messages: Vec::new(),
                tools: Vec::new(),
            })),
            permissions,
            session_id: session_id.into(),
            configure: None,
        };
        agent.system(system_prompt(&cwd));
        agent.tool(ReadTool { cwd: cwd.clone() });
        agent.tool(WriteTool { cwd: cwd.clone() });
        agent.tool(EditTool { cwd: cwd.clone() });
        agent.tool(MultiEditTool { cwd: cwd.clone() });
        agent.tool(GrepTool { cwd: cwd.clone() });
        agent.tool(GlobTool { cwd });
        agent
    }

    /// Set the system prompt.
    pub fn system(&mut self, prompt: impl Into<String>) -> &mut Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Register a tool the model can call.
    pub fn tool(&mut self, tool: impl Tool) -> &mut Self {
        self.state.lock().unwrap().tools.push(Box::new(tool));
        self
    }

    /// Install a hook that customizes every [`kestrel_llm::RequestBuilder`]
    /// before it's sent (e.g. to set provider-specific reasoning options).
    pub fn configure_request(
        &mut self,
        f: impl Fn(&mut kestrel_llm::RequestBuilder) + Send + Sync + 'static,
    ) -> &mut Self {
        self.configure = Some(Box::new(f));
        self
    }

    /// Access the conversation history (completed messages only).
    pub fn messages(&self) -> Vec<Message> {
        self.state.lock().unwrap().messages.clone()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Submit user input and get back a stream of events.
    ///
    /// The returned [`AgentStream`] yields [`AgentEvent`]s as the model
    /// generates a response. If tool calls occur, the agent executes them
    /// automatically and loops until the model produces a final text answer.
    ///
    /// Dropping the `AgentStream` cancels the generation.
    pub fn submit(&self, content: impl Into<String>) -> AgentStream {
        let content = content.into();
        let (tx, rx) = mpsc::channel(64);
        let cancel = CancellationToken::new();

        let model = Arc::clone(&self.model);
        let state = Arc::clone(&self.state);
        let system_prompt = self.system_prompt.clone();
        let permissions = self.permissions.clone();
        let session_id = self.session_id.clone();
        let task_cancel = cancel.clone();

        tokio::spawn(async move {
            generation_loop(
                model,
                state,
                system_prompt,
                content,
                tx,
                permissions,
                session_id,
                task_cancel,
            )
            .await;
        });

        AgentStream { rx, cancel }
    }
}

// ---------------------------------------------------------------------------
// AgentStream
// ---------------------------------------------------------------------------

/// A stream of [`AgentEvent`]s from a single generation turn.
///
/// Implements async iteration via [`next()`](AgentStream::next).
/// Drop to cancel the in-flight generation.
pub struct AgentStream {
    rx: mpsc::Receiver<AgentEvent>,
    cancel: CancellationToken,
}

impl AgentStream {
    /// Get the next event, or `None` when the turn is complete.
    pub async fn next(&mut self) -> Option<AgentEvent> {
        self.rx.recv().await
    }

    /// Cancel the in-flight generation without dropping the stream (so
    /// already-queued events can still be drained).
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Drop for AgentStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ---------------------------------------------------------------------------
// Generation loop (runs in spawned task)
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
async fn generation_loop(
    model: Arc<LanguageModel>,
    state: Arc<Mutex<AgentState>>,
    system_prompt: Option<String>,
    content: String,
    tx: mpsc::Sender<AgentEvent>,
    permissions: PermissionBroker,
    session_id: String,
    cancel: CancellationToken,
) {
    // 1. Record user message
    {
        let mut s = state.lock().unwrap();
        s.messages.push(Message::user(&content));
    }
    if tx
        .send(AgentEvent::UserMessage {
            content: content.clone(),
        })
        .await
        .is_err()
    {
        return; // receiver dropped
    }

    let mut cumulative_usage = Usage::default();

    // 2. Generation loop (may iterate for tool calls)
    loop {
        // Build request from current state
        let request = {
            let s = state.lock().unwrap();
            let mut req = kestrel_llm::request();
            if let Some(ref system) = system_prompt {
                req.system(system.as_str());
            }
            req.messages(s.messages.clone());

            let tool_defs: Vec<ToolDefinition> = s.tools.iter().map(|t| t.definition()).collect();
            req.tools(tool_defs);

            req.build()
        };

        // Stream the response. We collect AssistantParts in arrival order
        // so interleaved reasoning/text/tool-calls are preserved exactly.
        let mut stream = model.generate(request).events();
        let mut parts: Vec<kestrel_llm::AssistantPart> = Vec::new();
        let mut text = String::new();
        let mut text_metadata = std::collections::HashMap::new();
        let mut tool_calls: Vec<kestrel_llm::ToolCallPart> = Vec::new();
        let mut finish_reason = FinishReason::Stop;
        let mut canceled = false;

        // Helper: flush accumulated text deltas into a Text part.
        macro_rules! flush_text {
            ($parts:expr, $text:expr, $metadata:expr) => {
                if !$text.is_empty() {
                    $parts.push(kestrel_llm::AssistantPart::Text(kestrel_llm::TextPart {
                        text: std::mem::take(&mut $text),
                        metadata: std::mem::take(&mut $metadata),
                    }));
                }
            };
        }

        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    canceled = true;
                    break;
                }
                event = stream.next() => {
                    match event {
                        Some(e) => e,
                        None => break,
                    }
                }
            };

            match event {
                Ok(StreamEvent::TextDelta(delta)) => {
                    text.push_str(&delta);
                    if tx
                        .send(AgentEvent::TextDelta {
                            delta: delta.clone(),
                        })
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
                Ok(StreamEvent::TextDone { metadata }) => {
                    text_metadata = metadata;
                }
                Ok(StreamEvent::ReasoningDelta(delta)) => {
                    if tx.send(AgentEvent::ReasoningDelta { delta }).await.is_err() {
                        return;
                    }
                }
                Ok(StreamEvent::ReasoningDone(part)) => {
                    flush_text!(parts, text, text_metadata);
                    parts.push(kestrel_llm::AssistantPart::Reasoning(part));
                }
                Ok(StreamEvent::ToolCallBegin { .. }) => {
                    // Rendered display is sent once the call is fully
                    // parsed (ToolCallEnd); partial-argument streaming has
                    // no UI consumer yet.
                }
                Ok(StreamEvent::ToolCallDelta { .. }) => {}
                Ok(StreamEvent::ToolCallEnd { call, .. }) => {
                    flush_text!(parts, text, text_metadata);
                    tool_calls.push(call.clone());
                    parts.push(kestrel_llm::AssistantPart::ToolCall(call));
                }
                Ok(StreamEvent::Finish { reason, usage }) => {
                    finish_reason = reason;
                    if let Some(u) = usage {
                        cumulative_usage.input_tokens += u.input_tokens;
                        cumulative_usage.output_tokens += u.output_tokens;
                        if let Some(r) = u.reasoning_tokens {
                            *cumulative_usage.reasoning_tokens.get_or_insert(0) += r;
                        }
                        if let Some(c) = u.cached_tokens {
                            *cumulative_usage.cached_tokens.get_or_insert(0) += c;
                        }
                    }
                }
                Ok(StreamEvent::Error(msg)) => {
                    let _ = tx.send(AgentEvent::Error { error: msg }).await;
                    return;
                }
                Err(e) => {
                    let _ = tx
                        .send(AgentEvent::Error {
                            error: e.to_string(),
                        })
                        .await;
                    return;
                }
            }
        }

        if canceled {
            let _ = tx
                .send(AgentEvent::Error {
                    error: "canceled".to_string(),
                })
                .await;
            return;
        }

        // Flush any trailing text
        flush_text!(parts, text, text_metadata);

        // Record the assistant message with parts in arrival order
        {
            let mut s = state.lock().unwrap();
            if !parts.is_empty() {
                s.messages.push(Message::Assistant { parts });
            }
        }

        // If no tool calls, we're done
        if finish_reason != FinishReason::ToolCalls || tool_calls.is_empty() {
            let _ = tx
                .send(AgentEvent::TurnComplete {
                    usage: cumulative_usage,
                })
                .await;
            return;
        }

        // Execute tool calls sequentially, in emission order (resolved Open
        // Question: no built-in tool is parallel-safe).
        for tc in &tool_calls {
            let (tool_name, definition_found, render_result, permission_scope, fut) = {
                let s = state.lock().unwrap();
                match s.tools.iter().find(|t| t.definition().name == tc.name) {
                    Some(t) => {
                        let render = t.render_call(&tc.arguments);
                        let scope = t.permission_scope(&tc.arguments).unwrap_or(None);
                        (tc.name.clone(), true, render, scope, Some(t.call_erased(&tc.arguments)))
                    }
                    None => (tc.name.clone(), false, Err(ToolError::other(format!("unknown tool: {}", tc.name))), None, None),
                }
                // lock drops here
            };

            let call_display = render_result.unwrap_or_else(|_| crate::event::ToolCallDisplay {
                title: format!("Call {tool_name}"),
                body: None,
            });
            if tx
                .send(AgentEvent::ToolCallStart {
                    id: tc.id.clone(),
                    display: call_display,
                })
                .await
                .is_err()
            {
                return;
            }

            if !definition_found {
                let msg = format!("unknown tool: {tool_name}");
                record_tool_error(&state, &tx, &tc.id, &msg).await;
                continue;
            }

            if let Some(scope) = permission_scope {
                let decision = permissions
                    .request(
                        &session_id,
                        &tc.id,
                        &tool_name,
                        &scope.action,
                        scope.path,
                        scope.action.clone(),
                        &cancel,
                    )
                    .await;
                if decision == Decision::Deny {
                    record_tool_error(&state, &tx, &tc.id, "permission denied").await;
                    // §4.5: deny ends the turn immediately with
                    // Finish{reason=permission_denied}; remaining queued
                    // tool calls in this batch are not run.
                    let _ = tx
                        .send(AgentEvent::TurnComplete {
                            usage: cumulative_usage,
                        })
                        .await;
                    return;
                }
            }

            let outcome = fut.expect("definition_found implies a future").await;
            let (result_text, result_display, is_error) = match outcome {
                Ok((text, display)) => (text, display, false),
                Err(e) => {
                    let msg = format!("tool error: {e}");
                    (
                        msg.clone(),
                        crate::event::ToolResultDisplay {
                            title: "error".to_string(),
                            body: Some(crate::event::DisplayBody::Text(msg)),
                        },
                        true,
                    )
                }
            };

            if tx
                .send(AgentEvent::ToolCallDone {
                    id: tc.id.clone(),
                    display: result_display,
                })
                .await
                .is_err()
            {
                return;
            }

            {
                let mut s = state.lock().unwrap();
                let message = if is_error {
                    Message::tool_error(&tc.id, &result_text)
                } else {
                    Message::tool_result(&tc.id, &result_text)
                };
                s.messages.push(message);
            }
        }

        // Loop back to generate again with tool results in context
    }
}

async fn record_tool_error(
    state: &Arc<Mutex<AgentState>>,
    tx: &mpsc::Sender<AgentEvent>,
    tool_call_id: &str,
    message: &str,
) {
    let _ = tx
        .send(AgentEvent::ToolCallDone {
            id: tool_call_id.to_string(),
            display: crate::event::ToolResultDisplay {
                title: "error".to_string(),
                body: Some(crate::event::DisplayBody::Text(message.to_string())),
            },
        })
        .await;
    let mut s = state.lock().unwrap();
    s.messages.push(Message::tool_error(tool_call_id, message));
}

// ---------------------------------------------------------------------------
// Default system prompt
// ---------------------------------------------------------------------------

fn system_prompt(cwd: &std::path::Path) -> String {
    format!(
        r#"You are an expert coding assistant. You help the user by reading, writing, editing, and running code in their project.

Working directory: {cwd}

Tools available to you include file read/write/edit/multi-edit, grep, glob, ls, bash, fetch, download, Sourcegraph code search, and (when not already nested) a sub-agent tool for delegating bounded sub-tasks.

Guidelines:
- Before editing a file, read it first so you have the exact content to match against.
- Use edit for a single surgical change; use multi-edit for several related changes to one file; use write only when creating new files or replacing the entire content.
- When running commands, prefer non-interactive invocations.
- Be concise in your explanations. Focus on what changed and why.
- If a command fails, read the error and try to fix it."#,
        cwd = cwd.display()
    )
}
