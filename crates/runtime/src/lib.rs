//! Plenario runtime: tool-calling orchestration over interchangeable LLM
//! providers.
//!
//! # Overview
//!
//! The runtime is organized around these concepts:
//!
//! - **Transcript**: the append-only record of one conversation, replayed to
//!   the provider on every call.
//! - **Provider**: a trait over LLM backends (Gemini, Groq) that turns a
//!   transcript into a [`Decision`]: a final answer or tool calls.
//! - **ToolRegistry**: the read-only set of tools the model may call, with
//!   argument validation and a per-call timeout.
//! - **Orchestrator**: the bounded loop tying the three together.
//!
//! Tools may also come from external MCP servers; see [`mcp`].
//!
//! # Example
//!
//! ```ignore
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use runtime::{Orchestrator, Providers, ToolRegistry};
//!
//! # async fn example() -> runtime::Result<()> {
//! let providers = Providers::from_credentials(HashMap::from([
//!     ("gemini".to_string(), std::env::var("GOOGLE_API_KEY").unwrap_or_default()),
//! ]))?;
//! let registry = Arc::new(ToolRegistry::new(legis::catalog(&Default::default())?)?);
//!
//! let orchestrator = Orchestrator::new(providers, registry);
//! let reply = orchestrator
//!     .handle_turn("Liste os senadores do Ceará", vec![], "gemini")
//!     .await;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

mod error;
pub mod mcp;
pub mod model;
mod orchestrator;
pub mod prompt;
pub mod providers;
pub mod tools;

// Error types
pub use error::{Error, Result};

// Transcript model
pub use model::{
    Arguments, Decision, HistoryEntry, ModelError, Role, ToolCall, ToolOutcome, ToolResult,
    Transcript, Turn,
};

// Orchestration
pub use orchestrator::{
    DEFAULT_MAX_ROUNDS, FALLBACK_REPLY, Orchestrator, RunOutput, UNEXPECTED_REPLY,
    UNKNOWN_PROVIDER_REPLY, UNREACHABLE_REPLY, user_reply,
};

// Providers
pub use providers::{
    GeminiProvider, GroqProvider, ModelRequest, Provider, ProviderConfig, Providers,
};
#[cfg(any(test, feature = "testing"))]
pub use providers::ScriptedProvider;

// Tools
pub use tools::{FnTool, ParamSpec, ParamType, Tool, ToolError, ToolRegistry, ToolSpec};
