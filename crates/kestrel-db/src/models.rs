use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub parent_id: Option<String>,
    pub title: Option<String>,
    pub message_count: i64,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub cost: f64,
    pub summary_message_id: Option<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionInput {
    pub parent_id: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "system" => Some(Role::System),
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            "tool" => Some(Role::Tool),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    EndTurn,
    ToolUse,
    Canceled,
    Error,
    PermissionDenied,
    Length,
}

/// A single tagged element of a [`Message`]'s `parts` sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Part {
    Text {
        content: String,
    },
    /// Assistant-only.
    Reasoning {
        thinking: String,
        started_at_ms: i64,
        finished_at_ms: Option<i64>,
    },
    /// Assistant-only.
    ToolUse {
        id: String,
        name: String,
        input_json: serde_json::Value,
        finished: bool,
    },
    /// Tool-role only.
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default)]
        metadata_json: serde_json::Value,
        is_error: bool,
    },
    /// User-only.
    Binary {
        mime: String,
        path: String,
    },
    Finish {
        reason: FinishReason,
        time_ms: i64,
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        details: Option<serde_json::Value>,
    },
}

impl Part {
    pub fn is_finish(&self) -> bool {
        matches!(self, Part::Finish { .. })
    }

    pub fn as_tool_use(&self) -> Option<(&str, &str)> {
        match self {
            Part::ToolUse { id, name, .. } => Some((id, name)),
            _ => None,
        }
    }

    pub fn as_tool_result_id(&self) -> Option<&str> {
        match self {
            Part::ToolResult { tool_use_id, .. } => Some(tool_use_id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub session_id: String,
    pub role: Role,
    pub parts: Vec<Part>,
    pub model: Option<String>,
    pub provider: Option<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl Message {
    /// True once a [`Part::Finish`] has been appended; per the Finish
    /// invariant, no further `parts` mutation is valid once this is true.
    pub fn is_finished(&self) -> bool {
        self.parts.iter().any(Part::is_finish)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMessageInput {
    pub session_id: String,
    pub role: Role,
    pub parts: Vec<Part>,
    pub model: Option<String>,
    pub provider: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct File {
    pub id: String,
    pub session_id: String,
    pub path: String,
    pub content_hash: String,
    pub version: i64,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

/// Token/cost deltas added to a session's running totals at the end of a
/// generation stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsageDelta {
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub cost: f64,
}
