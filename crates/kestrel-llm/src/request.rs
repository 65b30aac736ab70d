use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Top-level request
// ---------------------------------------------------------------------------

/// A request to generate a language model response.
#[derive(Default, Debug, Clone)]
pub struct GenerateRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub options: GenerateOptions,
    /// Provider-specific metadata. Passed through to the backend as-is.
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Knobs that control generation behavior.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub stop: Option<Vec<String>>,
    pub tool_choice: ToolChoice,
}

// ---------------------------------------------------------------------------
// Reusable part types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextPart {
    pub text: String,
    /// Provider-specific metadata (e.g. `openai:item_id`), opaque to callers
    /// and passed through unchanged when a message is replayed to the same
    /// provider.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePart {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallPart {
    pub id: String,
    pub name: String,
    pub arguments: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResultPart {
    pub tool_call_id: String,
    pub content: String,
    #[serde(default)]
    pub is_error: bool,
}

/// A chain-of-thought summary emitted by a reasoning model. `text` holds zero
/// or more summary segments; it is empty when the provider redacted the
/// summary but still reports an item id via `metadata`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningPart {
    #[serde(default)]
    pub text: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

// ---------------------------------------------------------------------------
// Role-specific part enums (composed from reusable parts)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum SystemPart {
    Text(TextPart),
}

#[derive(Debug, Clone)]
pub enum UserPart {
    Text(TextPart),
    Image(ImagePart),
}

#[derive(Debug, Clone)]
pub enum AssistantPart {
    Text(TextPart),
    ToolCall(ToolCallPart),
    Reasoning(ReasoningPart),
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Message {
    System { parts: Vec<SystemPart> },
    User { parts: Vec<UserPart> },
    Assistant { parts: Vec<AssistantPart> },
    Tool { parts: Vec<ToolResultPart> },
}

// ---------------------------------------------------------------------------
// Convenience constructors
// ---------------------------------------------------------------------------

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Message::System {
            parts: vec![SystemPart::Text(TextPart {
                text: text.into(),
                metadata: HashMap::new(),
            })],
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Message::User {
            parts: vec![UserPart::Text(TextPart {
                text: text.into(),
                metadata: HashMap::new(),
            })],
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Message::Assistant {
            parts: vec![AssistantPart::Text(TextPart {
                text: text.into(),
                metadata: HashMap::new(),
            })],
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Message::Tool {
            parts: vec![ToolResultPart {
                tool_call_id: tool_call_id.into(),
                content: content.into(),
                is_error: false,
            }],
        }
    }

    pub fn tool_error(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Message::Tool {
            parts: vec![ToolResultPart {
                tool_call_id: tool_call_id.into(),
                content: content.into(),
                is_error: true,
            }],
        }
    }
}

// ---------------------------------------------------------------------------
// Tools
// ---------------------------------------------------------------------------

/// Describes a tool the model may call: name, description, and JSON Schema
/// parameters. Built from a [`crate::describe::Describe`] input type via
/// `ErasedTool::definition` on the caller's side.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Schema,
}

/// Controls how the model selects tools.
#[derive(Debug, Clone, Default)]
pub enum ToolChoice {
    #[default]
    Auto,
    None,
    Required,
    /// Force calling a specific tool by name.
    Tool(String),
}

// ---------------------------------------------------------------------------
// Schema descriptor — Rust-native, converts to JSON Schema downstream
// ---------------------------------------------------------------------------

/// A Rust-native description of a value's shape, convertible to JSON Schema.
#[derive(Debug, Clone)]
pub enum Schema {
    String {
        description: Option<String>,
        enumeration: Option<Vec<String>>,
    },
    Number {
        description: Option<String>,
    },
    Integer {
        description: Option<String>,
    },
    Boolean {
        description: Option<String>,
    },
    Array {
        description: Option<String>,
        items: Box<Schema>,
    },
    Object {
        description: Option<String>,
        properties: Vec<Property>,
        required: Vec<String>,
    },
    /// Escape hatch: a literal JSON Schema value for cases we don't cover.
    Raw(serde_json::Value),
}

#[derive(Debug, Clone)]
pub struct Property {
    pub name: String,
    pub schema: Schema,
}

impl Schema {
    /// Convert to a JSON Schema `serde_json::Value`.
    pub fn to_json_schema(&self) -> serde_json::Value {
        match self {
            Schema::String {
                description,
                enumeration,
            } => {
                let mut obj = serde_json::json!({ "type": "string" });
                if let Some(d) = description {
                    obj["description"] = serde_json::json!(d);
                }
                if let Some(e) = enumeration {
                    obj["enum"] = serde_json::json!(e);
                }
                obj
            }
            Schema::Number { description } => {
                let mut obj = serde_json::json!({ "type": "number" });
                if let Some(d) = description {
                    obj["description"] = serde_json::json!(d);
                }
                obj
            }
            Schema::Integer { description } => {
                let mut obj = serde_json::json!({ "type": "integer" });
                if let Some(d) = description {
                    obj["description"] = serde_json::json!(d);
                }
                obj
            }
            Schema::Boolean { description } => {
                let mut obj = serde_json::json!({ "type": "boolean" });
                if let Some(d) = description {
                    obj["description"] = serde_json::json!(d);
                }
                obj
            }
            Schema::Array { description, items } => {
                let mut obj = serde_json::json!({
                    "type": "array",
                    "items": items.to_json_schema(),
                });
                if let Some(d) = description {
                    obj["description"] = serde_json::json!(d);
                }
                obj
            }
            Schema::Object {
                description,
                properties,
                required,
            } => {
                let props: serde_json::Map<String, serde_json::Value> = properties
                    .iter()
                    .map(|p| (p.name.clone(), p.schema.to_json_schema()))
                    .collect();
                let mut obj = serde_json::json!({
                    "type": "object",
                    "properties": props,
                });
                if !required.is_empty() {
                    obj["required"] = serde_json::json!(required);
                }
                if let Some(d) = description {
                    obj["description"] = serde_json::json!(d);
                }
                obj
            }
            Schema::Raw(v) => v.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Fluent request builder
// ---------------------------------------------------------------------------

/// Start building a [`GenerateRequest`].
///
/// ```ignore
/// let mut req = kestrel_llm::request();
/// req.system("You are helpful").user("Explain monads");
/// let request = req.build();
/// ```
pub fn request() -> RequestBuilder {
    RequestBuilder::default()
}

/// Fluent builder for [`GenerateRequest`]. The system prompt is tracked
/// separately from `messages` so callers can set it before or after
/// appending conversation history; [`build`](RequestBuilder::build) always
/// places it first.
#[derive(Default)]
pub struct RequestBuilder {
    system: Option<String>,
    messages: Vec<Message>,
    tools: Vec<ToolDefinition>,
    options: GenerateOptions,
    metadata: HashMap<String, serde_json::Value>,
}

impl RequestBuilder {
    pub fn system(&mut self, text: impl Into<String>) -> &mut Self {
        self.system = Some(text.into());
        self
    }

    pub fn user(&mut self, text: impl Into<String>) -> &mut Self {
        self.messages.push(Message::user(text));
        self
    }

    pub fn assistant(&mut self, text: impl Into<String>) -> &mut Self {
        self.messages.push(Message::assistant(text));
        self
    }

    /// Append messages to the conversation, preserving their order relative
    /// to ones already added via `user`/`assistant`/`tool_result`.
    pub fn messages(&mut self, messages: Vec<Message>) -> &mut Self {
        self.messages.extend(messages);
        self
    }

    pub fn tools(&mut self, tools: Vec<ToolDefinition>) -> &mut Self {
        self.tools = tools;
        self
    }

    pub fn tool_choice(&mut self, choice: ToolChoice) -> &mut Self {
        self.options.tool_choice = choice;
        self
    }

    pub fn temperature(&mut self, temperature: f32) -> &mut Self {
        self.options.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(&mut self, max_tokens: u32) -> &mut Self {
        self.options.max_tokens = Some(max_tokens);
        self
    }

    /// Set a provider-specific metadata entry (e.g. `reasoning_effort`).
    pub fn meta(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> &mut Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn build(&mut self) -> GenerateRequest {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        if let Some(system) = self.system.take() {
            messages.push(Message::system(system));
        }
        messages.append(&mut self.messages);

        GenerateRequest {
            messages,
            tools: std::mem::take(&mut self.tools),
            options: std::mem::take(&mut self.options),
            metadata: std::mem::take(&mut self.metadata),
        }
    }
}
