//! Groq backend over its OpenAI-compatible chat completions API.
//!
//! Tool calls travel on assistant messages with JSON-encoded argument
//! strings. Each result goes back as its own `tool` message carrying the
//! call id.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{ErrorBody, ModelRequest, Provider, ProviderConfig, assign_call_id, into_decision};
use crate::Result;
use crate::model::{Arguments, Decision, ModelError, ToolCall, Transcript, Turn};
use crate::tools::ToolSpec;

pub(super) const ID: &str = "groq";

const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";
const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

// ─────────────────────────────────────────────────────────────────────────────
// API Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ApiToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ApiMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type", default = "function_type")]
    kind: String,
    function: ApiFunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ApiTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: ApiFunction,
}

#[derive(Debug, Serialize)]
struct ApiFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Provider Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Groq chat completions backend.
pub struct GroqProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GroqProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        Ok(Self {
            client: config.http_client()?,
            model: config.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: config.base_url.unwrap_or_else(|| GROQ_API_BASE.to_string()),
            api_key: config.api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn messages(system: Option<&str>, turns: &[Turn]) -> Vec<ApiMessage> {
        let mut messages = Vec::with_capacity(turns.len() + 1);
        if let Some(system) = system {
            messages.push(ApiMessage::new("system", system));
        }

        for turn in turns {
            match turn {
                Turn::User { text } => messages.push(ApiMessage::new("user", text)),
                Turn::Model { text } => messages.push(ApiMessage::new("assistant", text)),
                Turn::ToolCall(call) => {
                    let wire = ApiToolCall {
                        id: Some(call.id.clone()),
                        kind: function_type(),
                        function: ApiFunctionCall {
                            name: call.name.clone(),
                            arguments: Value::Object(call.arguments.clone()).to_string(),
                        },
                    };
                    // Calls attach to the preceding assistant message, which
                    // may carry the narrative the model emitted with them.
                    match messages.last_mut() {
                        Some(last) if last.role == "assistant" => last.tool_calls.push(wire),
                        _ => messages.push(ApiMessage {
                            role: "assistant".to_string(),
                            content: None,
                            tool_calls: vec![wire],
                            tool_call_id: None,
                        }),
                    }
                }
                Turn::ToolResult(result) => messages.push(ApiMessage {
                    role: "tool".to_string(),
                    content: Some(result.content()),
                    tool_calls: Vec::new(),
                    tool_call_id: Some(result.call_id.clone()),
                }),
            }
        }
        messages
    }

    fn build_request(&self, request: &ModelRequest<'_>) -> ApiRequest {
        let tools: Vec<ApiTool> = request.tools.iter().map(tool_definition).collect();
        ApiRequest {
            model: self.model.clone(),
            messages: Self::messages(request.system, request.transcript.render()),
            tool_choice: (!tools.is_empty()).then_some("auto"),
            tools,
        }
    }

    fn parse_decision(
        response: ApiResponse,
        transcript: &Transcript,
    ) -> std::result::Result<Decision, ModelError> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::InvalidResponse("no choices in response".into()))?;

        debug!(finish_reason = ?choice.finish_reason, "Groq choice");

        let mut calls: Vec<ToolCall> = Vec::with_capacity(choice.message.tool_calls.len());
        for call in choice.message.tool_calls {
            let arguments = parse_arguments(&call.function.name, &call.function.arguments)?;
            let id = assign_call_id(call.id, transcript, &calls);
            calls.push(ToolCall::new(id, call.function.name, arguments));
        }

        into_decision(choice.message.content.unwrap_or_default(), calls)
    }
}

impl fmt::Display for GroqProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "groq({})", self.model)
    }
}

#[async_trait]
impl Provider for GroqProvider {
    fn id(&self) -> &str {
        ID
    }

    async fn decide(&self, request: ModelRequest<'_>) -> std::result::Result<Decision, ModelError> {
        let api_request = self.build_request(&request);

        debug!(
            provider = %self,
            messages = api_request.messages.len(),
            tools = api_request.tools.len(),
            "sending Groq request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&api_request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ErrorBody::read(ID, response).await.into_error());
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        if let Some(usage) = &api_response.usage {
            debug!(
                provider = %self,
                input_tokens = usage.prompt_tokens,
                output_tokens = usage.completion_tokens,
                "Groq usage"
            );
        }

        Self::parse_decision(api_response, request.transcript)
    }
}

fn tool_definition(spec: &ToolSpec) -> ApiTool {
    ApiTool {
        kind: "function",
        function: ApiFunction {
            name: spec.name.clone(),
            description: spec.description.clone(),
            parameters: spec.schema(),
        },
    }
}

/// Decode a JSON-encoded argument string. Blank and `null` mean no arguments.
fn parse_arguments(tool: &str, raw: &str) -> std::result::Result<Arguments, ModelError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Arguments::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Arguments::new()),
        Ok(other) => Err(ModelError::InvalidResponse(format!(
            "arguments for `{tool}` are not an object: {other}"
        ))),
        Err(e) => Err(ModelError::InvalidResponse(format!(
            "arguments for `{tool}` are not valid JSON: {e}"
        ))),
    }
}
