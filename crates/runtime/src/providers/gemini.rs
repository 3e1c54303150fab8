//! Google Gemini backend.
//!
//! Gemini nests the conversation as `contents`, each with a role (`user` or
//! `model`) and a list of typed parts: `text`, `functionCall`, or
//! `functionResponse`.

use std::fmt;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

use super::{ErrorBody, ModelRequest, Provider, ProviderConfig, assign_call_id, into_decision};
use crate::Result;
use crate::model::{
    Arguments, Decision, ModelError, ToolCall, ToolOutcome, ToolResult, Transcript, Turn,
};
use crate::tools::ToolSpec;

pub(super) const ID: &str = "gemini";

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Schema keys Gemini's OpenAPI subset rejects.
const UNSUPPORTED_SCHEMA_KEYS: [&str; 4] =
    ["default", "additionalProperties", "examples", "nullable"];

// ─────────────────────────────────────────────────────────────────────────────
// API Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<ApiContent>,
    contents: Vec<ApiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTools>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ApiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<ApiPart>,
}

/// Exactly one payload field is set per part.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<ApiFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<ApiFunctionResponse>,
    #[serde(default, skip_serializing)]
    thought: bool,
    /// Thinking models sign their function calls and expect the signature
    /// back on replay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought_signature: Option<String>,
}

impl ApiPart {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Self::default()
        }
    }

    fn function_call(call: &ToolCall) -> Self {
        Self {
            function_call: Some(ApiFunctionCall {
                id: Some(call.id.clone()),
                name: call.name.clone(),
                args: call.arguments.clone(),
            }),
            thought_signature: call.signature.clone(),
            ..Self::default()
        }
    }

    fn function_response(result: &ToolResult) -> Self {
        let response = match &result.outcome {
            ToolOutcome::Success { output } => json!({ "result": output }),
            ToolOutcome::Failure { error } => json!({ "error": error.to_string() }),
        };
        Self {
            function_response: Some(ApiFunctionResponse {
                id: Some(result.call_id.clone()),
                name: result.name.clone(),
                response,
            }),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    #[serde(default)]
    args: Arguments,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunctionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiTools {
    function_declarations: Vec<ApiFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct ApiFunctionDeclaration {
    name: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<ApiCandidate>,
    prompt_feedback: Option<ApiPromptFeedback>,
    usage_metadata: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCandidate {
    content: Option<ApiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Provider Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Gemini `generateContent` backend.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        Ok(Self {
            client: config.http_client()?,
            model: config.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: config
                .base_url
                .unwrap_or_else(|| GEMINI_API_BASE.to_string()),
            api_key: config.api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    /// Group consecutive same-role turns into one content.
    ///
    /// The transcript interleaves each call with its result; Gemini wants a
    /// batch as one content of calls followed by one content of responses.
    /// A signed call opens a new batch.
    fn contents(turns: &[Turn]) -> Vec<ApiContent> {
        let mut contents: Vec<ApiContent> = Vec::new();
        for turn in turns {
            if let Turn::ToolCall(call) = turn
                && call.signature.is_none()
                && let Some(calls) = open_batch(&mut contents)
            {
                calls.parts.push(ApiPart::function_call(call));
                continue;
            }

            let (role, part) = match turn {
                Turn::User { text } => ("user", ApiPart::text(text)),
                Turn::Model { text } => ("model", ApiPart::text(text)),
                Turn::ToolCall(call) => ("model", ApiPart::function_call(call)),
                Turn::ToolResult(result) => ("user", ApiPart::function_response(result)),
            };
            match contents.last_mut() {
                Some(last) if last.role.as_deref() == Some(role) => last.parts.push(part),
                _ => contents.push(ApiContent {
                    role: Some(role.to_string()),
                    parts: vec![part],
                }),
            }
        }
        contents
    }

    fn declaration(spec: &ToolSpec) -> ApiFunctionDeclaration {
        ApiFunctionDeclaration {
            name: spec.name.clone(),
            description: spec.description.clone(),
            // Gemini rejects OBJECT schemas with no properties.
            parameters: (!spec.params.is_empty()).then(|| gemini_schema(&spec.schema())),
        }
    }

    fn build_request(request: &ModelRequest<'_>) -> ApiRequest {
        let tools = if request.tools.is_empty() {
            Vec::new()
        } else {
            vec![ApiTools {
                function_declarations: request.tools.iter().map(Self::declaration).collect(),
            }]
        };

        ApiRequest {
            system_instruction: request.system.map(|s| ApiContent {
                role: None,
                parts: vec![ApiPart::text(s)],
            }),
            contents: Self::contents(request.transcript.render()),
            tools,
        }
    }

    fn parse_decision(
        response: ApiResponse,
        transcript: &Transcript,
    ) -> std::result::Result<Decision, ModelError> {
        let Some(candidate) = response.candidates.into_iter().next() else {
            let reason = response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "none given".to_string());
            return Err(ModelError::InvalidResponse(format!(
                "no candidates (block reason: {reason})"
            )));
        };

        let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
        if parts.is_empty() {
            let reason = candidate.finish_reason.unwrap_or_default();
            return Err(ModelError::InvalidResponse(format!(
                "candidate has no content (finish reason: {reason})"
            )));
        }

        let mut text = String::new();
        let mut calls: Vec<ToolCall> = Vec::new();
        for part in parts.into_iter().filter(|p| !p.thought) {
            if let Some(t) = part.text {
                text.push_str(&t);
            }
            if let Some(call) = part.function_call {
                let id = assign_call_id(call.id, transcript, &calls);
                calls.push(
                    ToolCall::new(id, call.name, call.args).with_signature(part.thought_signature),
                );
            }
        }

        into_decision(text, calls)
    }
}

impl fmt::Display for GeminiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gemini({})", self.model)
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn id(&self) -> &str {
        ID
    }

    async fn decide(&self, request: ModelRequest<'_>) -> std::result::Result<Decision, ModelError> {
        let api_request = Self::build_request(&request);

        debug!(
            provider = %self,
            contents = api_request.contents.len(),
            tools = request.tools.len(),
            "sending Gemini request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&api_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let body = ErrorBody::read(ID, response).await;
            // Gemini reports a bad key as 400 INVALID_ARGUMENT.
            if body.status == StatusCode::BAD_REQUEST && body.raw.contains("API_KEY_INVALID") {
                return Err(ModelError::Auth(body.message));
            }
            return Err(body.into_error());
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        if let Some(usage) = &api_response.usage_metadata {
            debug!(
                provider = %self,
                input_tokens = usage.prompt_token_count,
                output_tokens = usage.candidates_token_count,
                "Gemini usage"
            );
        }

        Self::parse_decision(api_response, request.transcript)
    }
}

/// The model content of calls still open for more calls: the last two
/// contents are those calls and the user content answering them.
fn open_batch(contents: &mut [ApiContent]) -> Option<&mut ApiContent> {
    match contents {
        [.., calls, responses]
            if calls.role.as_deref() == Some("model")
                && calls.parts.last().is_some_and(|p| p.function_call.is_some())
                && responses.role.as_deref() == Some("user")
                && responses.parts.iter().all(|p| p.function_response.is_some()) =>
        {
            Some(calls)
        }
        _ => None,
    }
}

/// Rewrite a JSON Schema into Gemini's dialect: upper-case type names and
/// no unsupported keys.
fn gemini_schema(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => {
            let converted: Map<String, Value> = map
                .iter()
                .filter(|(key, _)| !UNSUPPORTED_SCHEMA_KEYS.contains(&key.as_str()))
                .map(|(key, value)| {
                    let value = match (key.as_str(), value) {
                        ("type", Value::String(ty)) => Value::String(ty.to_uppercase()),
                        ("properties", Value::Object(props)) => Value::Object(
                            props
                                .iter()
                                .map(|(name, prop)| (name.clone(), gemini_schema(prop)))
                                .collect(),
                        ),
                        (_, other) => gemini_schema(other),
                    };
                    (key.clone(), value)
                })
                .collect();
            Value::Object(converted)
        }
        Value::Array(items) => Value::Array(items.iter().map(gemini_schema).collect()),
        other => other.clone(),
    }
}
