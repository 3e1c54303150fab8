use crate::tools::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Who authored a history entry supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    #[serde(alias = "assistant")]
    Model,
}

/// A flattened text turn supplied by the caller as prior history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub text: String,
}

impl HistoryEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Named arguments of a tool call.
pub type Arguments = Map<String, Value>;

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlates the call with its result.
    pub id: String,
    pub name: String,
    pub arguments: Arguments,
    /// Opaque provider state that must be sent back with the call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Arguments) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
            signature: None,
        }
    }

    pub fn with_signature(mut self, signature: Option<String>) -> Self {
        self.signature = signature;
        self
    }

    /// Generate a fresh invocation id.
    pub fn fresh_id() -> String {
        format!("call_{}", uuid::Uuid::new_v4().simple())
    }
}

/// Outcome of executing a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Success { output: Value },
    Failure { error: ToolError },
}

impl ToolOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }
}

impl From<Result<Value, ToolError>> for ToolOutcome {
    fn from(result: Result<Value, ToolError>) -> Self {
        match result {
            Ok(output) => Self::Success { output },
            Err(error) => Self::Failure { error },
        }
    }
}

/// The result of a tool call, paired with the call by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: String,
    pub name: String,
    pub outcome: ToolOutcome,
}

impl ToolResult {
    pub fn new(call: &ToolCall, outcome: ToolOutcome) -> Self {
        Self {
            call_id: call.id.clone(),
            name: call.name.clone(),
            outcome,
        }
    }

    /// Text form of the outcome as sent back to a provider.
    pub fn content(&self) -> String {
        match &self.outcome {
            ToolOutcome::Success {
                output: Value::String(text),
            } => text.clone(),
            ToolOutcome::Success { output } => output.to_string(),
            ToolOutcome::Failure { error } => format!("error: {error}"),
        }
    }
}

/// One entry of a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Turn {
    User { text: String },
    Model { text: String },
    ToolCall(ToolCall),
    ToolResult(ToolResult),
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self::User { text: text.into() }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::Model { text: text.into() }
    }
}

impl From<HistoryEntry> for Turn {
    fn from(entry: HistoryEntry) -> Self {
        match entry.role {
            Role::User => Self::User { text: entry.text },
            Role::Model => Self::Model { text: entry.text },
        }
    }
}

/// What a provider wants to happen next.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// A final natural-language answer.
    Final(String),
    /// One or more tool calls, in the order the model requested them.
    Invoke {
        /// Narrative the model emitted next to its calls, if any.
        text: Option<String>,
        calls: Vec<ToolCall>,
    },
}

impl Decision {
    pub fn invoke(calls: Vec<ToolCall>) -> Self {
        Self::Invoke { text: None, calls }
    }
}
