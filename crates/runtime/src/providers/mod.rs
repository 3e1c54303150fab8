//! LLM provider adapters.
//!
//! Each provider translates the transcript into its own wire format and its
//! response back into a [`Decision`]. Nothing outside this module knows a
//! provider's wire format.

mod gemini;
mod groq;
#[cfg(any(test, feature = "testing"))]
mod scripted;

pub use gemini::GeminiProvider;
pub use groq::GroqProvider;
#[cfg(any(test, feature = "testing"))]
pub use scripted::ScriptedProvider;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::warn;

use crate::model::{Decision, ModelError, ToolCall, Transcript};
#[cfg(test)]
use crate::model::{ToolOutcome, Turn};
#[cfg(test)]
use crate::tools::ToolError;
use crate::tools::ToolSpec;
use crate::{Error, Result};

/// Default bound on a single provider HTTP call.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(60);

/// Everything a provider needs to decide the next step.
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    pub system: Option<&'a str>,
    pub transcript: &'a Transcript,
    pub tools: &'a [ToolSpec],
}

/// An LLM backend with function calling.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Identifier callers use to select this provider.
    fn id(&self) -> &str;

    /// Ask the model what to do next.
    async fn decide(&self, request: ModelRequest<'_>) -> std::result::Result<Decision, ModelError>;
}

/// Connection settings shared by the HTTP providers.
#[derive(Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    /// Overrides the provider's default model.
    pub model: Option<String>,
    /// Overrides the provider's default API base URL.
    pub base_url: Option<String>,
    pub timeout: Duration,
}

impl ProviderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: None,
            base_url: None,
            timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// The providers a turn can be routed to, keyed by id.
#[derive(Clone, Default)]
pub struct Providers {
    by_id: HashMap<String, Arc<dyn Provider>>,
}

impl Providers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its own id, replacing any previous one.
    pub fn with(mut self, provider: Arc<dyn Provider>) -> Self {
        self.by_id.insert(provider.id().to_string(), provider);
        self
    }

    /// Build the HTTP providers from per-provider settings.
    pub fn from_configs(configs: HashMap<String, ProviderConfig>) -> Result<Self> {
        let mut providers = Self::new();
        for (id, config) in configs {
            let provider: Arc<dyn Provider> = match id.as_str() {
                gemini::ID => Arc::new(GeminiProvider::new(config)?),
                groq::ID => Arc::new(GroqProvider::new(config)?),
                other => return Err(Error::Config(format!("unsupported provider: {other}"))),
            };
            providers = providers.with(provider);
        }
        Ok(providers)
    }

    /// Build the HTTP providers from a map of provider id to credential.
    pub fn from_credentials(credentials: HashMap<String, String>) -> Result<Self> {
        Self::from_configs(
            credentials
                .into_iter()
                .map(|(id, key)| (id, ProviderConfig::new(key)))
                .collect(),
        )
    }

    pub fn get(&self, id: &str) -> Result<Arc<dyn Provider>> {
        self.by_id
            .get(id)
            .cloned()
            .ok_or_else(|| Error::UnknownProvider(id.to_string()))
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.by_id.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl fmt::Debug for Providers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.ids()).finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared response handling
// ─────────────────────────────────────────────────────────────────────────────

/// Both providers wrap errors as `{"error": {"message": ...}}`.
#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// A non-success provider response.
struct ErrorBody {
    status: StatusCode,
    message: String,
    raw: String,
}

impl ErrorBody {
    async fn read(provider: &str, response: reqwest::Response) -> Self {
        let status = response.status();
        let raw = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorEnvelope>(&raw)
            .map(|envelope| envelope.error.message)
            .unwrap_or_else(|_| raw.clone());
        warn!(provider, %status, %message, "provider returned an error");
        Self {
            status,
            message,
            raw,
        }
    }

    fn into_error(self) -> ModelError {
        ModelError::from_status(self.status, self.message)
    }
}

/// Use the provider's call id unless it is missing or already taken.
fn assign_call_id(proposed: Option<String>, transcript: &Transcript, taken: &[ToolCall]) -> String {
    match proposed {
        Some(id)
            if !id.is_empty()
                && !transcript.has_call_id(&id)
                && !taken.iter().any(|call| call.id == id) =>
        {
            id
        }
        _ => ToolCall::fresh_id(),
    }
}

/// Turn the text and calls parsed from a response into a decision.
fn into_decision(
    text: String,
    calls: Vec<ToolCall>,
) -> std::result::Result<Decision, ModelError> {
    let text = text.trim();
    if calls.is_empty() {
        if text.is_empty() {
            return Err(ModelError::InvalidResponse(
                "response has neither text nor tool calls".into(),
            ));
        }
        return Ok(Decision::Final(text.to_string()));
    }
    Ok(Decision::Invoke {
        text: (!text.is_empty()).then(|| text.to_string()),
        calls,
    })
}

/// Tool failures cross the wire as their message only. Rewrites each
/// failure as an `Execution` error carrying that message, so a decoded
/// transcript compares equal to the one that was sent.
#[cfg(test)]
pub(crate) fn failures_as_text(turns: &[Turn]) -> Vec<Turn> {
    turns
        .iter()
        .cloned()
        .map(|turn| match turn {
            Turn::ToolResult(mut result) => {
                if let ToolOutcome::Failure { error } = &result.outcome {
                    let message = error.to_string();
                    result.outcome = ToolOutcome::Failure {
                        error: ToolError::Execution(message),
                    };
                }
                Turn::ToolResult(result)
            }
            other => other,
        })
        .collect()
}
