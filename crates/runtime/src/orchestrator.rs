//! The tool-calling loop.
//!
//! One `run` owns one [`Transcript`]: it asks the provider for a decision,
//! executes any requested tools, appends their results and asks again, until
//! the model answers or the round bound is reached.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::model::{Decision, HistoryEntry, ModelError, ToolCall, Transcript, Turn};
use crate::prompt::{DEFAULT_INSTRUCTIONS, system_instruction};
use crate::providers::{DEFAULT_PROVIDER_TIMEOUT, ModelRequest, Provider, Providers};
use crate::tools::ToolRegistry;
use crate::{Error, Result};

/// Default number of tool-calling rounds per run.
pub const DEFAULT_MAX_ROUNDS: usize = 5;

/// Reply when the model keeps calling tools past the round bound.
pub const FALLBACK_REPLY: &str = "Desculpe, não consegui concluir a consulta dentro do limite \
de etapas. Tente reformular a pergunta de forma mais específica.";

/// Reply when the provider cannot be reached or is throttling us.
pub const UNREACHABLE_REPLY: &str = "Desculpe, o serviço de IA está indisponível ou \
sobrecarregado no momento. Tente novamente em instantes.";

/// Reply when the requested provider is not configured.
pub const UNKNOWN_PROVIDER_REPLY: &str =
    "Desculpe, o modelo solicitado não está disponível neste servidor.";

/// Reply for any other fatal error.
pub const UNEXPECTED_REPLY: &str =
    "Desculpe, ocorreu um erro inesperado ao processar sua pergunta.";

/// User-facing text for a fatal run error. Never includes provider payloads.
pub fn user_reply(error: &Error) -> &'static str {
    match error {
        Error::UnknownProvider(_) => UNKNOWN_PROVIDER_REPLY,
        Error::IterationBoundExceeded { .. } => FALLBACK_REPLY,
        e if e.is_unreachable() => UNREACHABLE_REPLY,
        _ => UNEXPECTED_REPLY,
    }
}

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub reply: String,
    pub transcript: Transcript,
    /// Tool-calling rounds executed.
    pub rounds: usize,
    /// Whether the reply is the fallback after hitting the round bound.
    pub exhausted: bool,
}

/// Drives conversations against the configured providers and tools.
///
/// Cheap to share: every run builds its own transcript and only reads the
/// registry and providers.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    providers: Providers,
    registry: Arc<ToolRegistry>,
    max_rounds: usize,
    provider_timeout: Duration,
    instructions: String,
}

impl Orchestrator {
    pub fn new(providers: Providers, registry: Arc<ToolRegistry>) -> Self {
        Self {
            providers,
            registry,
            max_rounds: DEFAULT_MAX_ROUNDS,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Bound on each provider call, on top of the HTTP client's own timeout.
    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    /// Persona placed before the date context in the system instruction.
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn providers(&self) -> &Providers {
        &self.providers
    }

    /// Answer one user message. Always returns a reply.
    pub async fn handle_turn(
        &self,
        message: &str,
        history: Vec<HistoryEntry>,
        provider_id: &str,
    ) -> String {
        match self.run(message, history, provider_id).await {
            Ok(output) => output.reply,
            Err(error) => {
                warn!(provider = provider_id, %error, "turn failed");
                user_reply(&error).to_string()
            }
        }
    }

    /// Run the loop for one user message on top of prior history.
    ///
    /// Fails on unknown provider ids and on provider errors. Hitting the
    /// round bound is not an error: the reply is then [`FALLBACK_REPLY`].
    #[tracing::instrument(skip(self, message, history), fields(history = history.len()))]
    pub async fn run(
        &self,
        message: &str,
        history: Vec<HistoryEntry>,
        provider_id: &str,
    ) -> Result<RunOutput> {
        let provider = self.providers.get(provider_id)?;

        let mut transcript = Transcript::from_history(history);
        transcript.append(Turn::user(message));

        let mut rounds = 0;
        match self.drive(&mut transcript, provider.as_ref(), &mut rounds).await {
            Ok(reply) => Ok(RunOutput {
                reply,
                transcript,
                rounds,
                exhausted: false,
            }),
            Err(Error::IterationBoundExceeded { rounds }) => {
                warn!(rounds, "round bound reached without a final answer");
                Ok(RunOutput {
                    reply: FALLBACK_REPLY.to_string(),
                    transcript,
                    rounds,
                    exhausted: true,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Ask, execute and append until the model answers.
    ///
    /// Each completed round leaves every call immediately followed by its
    /// result. A decision that would exceed the bound is dropped unexecuted.
    pub async fn drive(
        &self,
        transcript: &mut Transcript,
        provider: &dyn Provider,
        rounds: &mut usize,
    ) -> Result<String> {
        let system = system_instruction(&self.instructions, &chrono::Local::now());

        loop {
            let decision = self.decide(provider, &system, transcript).await?;

            let (text, calls) = match decision {
                Decision::Final(text) => {
                    info!(rounds = *rounds, "final answer");
                    transcript.append(Turn::model(text.clone()));
                    return Ok(text);
                }
                Decision::Invoke { text, calls } => (text, calls),
            };

            if *rounds >= self.max_rounds {
                return Err(Error::IterationBoundExceeded { rounds: *rounds });
            }
            *rounds += 1;

            let span = info_span!("round", round = *rounds, calls = calls.len());
            self.execute(transcript, text, calls).instrument(span).await;
        }
    }

    async fn decide(
        &self,
        provider: &dyn Provider,
        system: &str,
        transcript: &Transcript,
    ) -> Result<Decision> {
        let request = ModelRequest {
            system: Some(system),
            transcript,
            tools: self.registry.specs(),
        };

        debug!(provider = provider.id(), turns = transcript.len(), "asking provider");
        match tokio::time::timeout(self.provider_timeout, provider.decide(request)).await {
            Ok(decision) => Ok(decision?),
            Err(_) => Err(ModelError::Network(format!(
                "no response within {}s",
                self.provider_timeout.as_secs()
            ))
            .into()),
        }
    }

    /// Run a batch concurrently, then append in request order.
    async fn execute(
        &self,
        transcript: &mut Transcript,
        text: Option<String>,
        calls: Vec<ToolCall>,
    ) {
        let names: Vec<&str> = calls.iter().map(|c| c.name.as_str()).collect();
        info!(tools = ?names, "executing tools");

        let results = join_all(calls.iter().map(|call| self.registry.execute(call))).await;

        if let Some(text) = text {
            transcript.append(Turn::model(text));
        }
        for (call, result) in calls.into_iter().zip(results) {
            transcript.append(Turn::ToolCall(call));
            transcript.append(Turn::ToolResult(result));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Arguments, ToolOutcome};
    use crate::providers::ScriptedProvider;
    use crate::tools::{FnTool, ParamSpec, ParamType, ToolError, ToolSpec};
    use serde_json::{Value, json};

    fn args(value: Value) -> Arguments {
        value.as_object().cloned().unwrap_or_default()
    }

    fn registry() -> Arc<ToolRegistry> {
        let senadores = ToolSpec::new(
            "buscar_senadores",
            "Lista senadores",
            FnTool::new(|args: Arguments| async move {
                let uf = args.get("uf").and_then(Value::as_str).unwrap_or("BR").to_string();
                Ok(json!([{"nome": "Fulano", "uf": uf}]))
            }),
        )
        .param(ParamSpec::optional("uf", ParamType::String, "UF"));
        Arc::new(ToolRegistry::new(vec![senadores]).unwrap())
    }

    fn orchestrator(provider: Arc<ScriptedProvider>) -> Orchestrator {
        Orchestrator::new(Providers::new().with(provider), registry())
    }

    fn senadores_call(id: &str) -> ToolCall {
        ToolCall::new(id, "buscar_senadores", args(json!({"uf": "CE"})))
    }

    #[tokio::test]
    async fn final_answer_without_tools() {
        let provider =
            Arc::new(ScriptedProvider::new("gemini").then(Decision::Final("Olá!".into())));
        let output = orchestrator(provider.clone())
            .run("oi", vec![], "gemini")
            .await
            .unwrap();

        assert_eq!(output.reply, "Olá!");
        assert_eq!(output.rounds, 0);
        assert_eq!(
            output.transcript.render(),
            &[Turn::user("oi"), Turn::model("Olá!")]
        );
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn history_precedes_the_new_message() {
        let provider = Arc::new(ScriptedProvider::new("gemini").then(Decision::Final("ok".into())));
        orchestrator(provider.clone())
            .run(
                "e agora?",
                vec![HistoryEntry::user("oi"), HistoryEntry::model("olá")],
                "gemini",
            )
            .await
            .unwrap();

        assert_eq!(
            provider.seen()[0],
            vec![Turn::user("oi"), Turn::model("olá"), Turn::user("e agora?")]
        );
    }

    #[tokio::test]
    async fn narrative_is_kept_before_calls() {
        let provider = Arc::new(
            ScriptedProvider::new("gemini")
                .then(Decision::Invoke {
                    text: Some("Vou consultar.".into()),
                    calls: vec![senadores_call("c1")],
                })
                .then(Decision::Final("Fulano.".into())),
        );
        let output = orchestrator(provider)
            .run("senadores do CE", vec![], "gemini")
            .await
            .unwrap();

        let turns = output.transcript.render();
        assert_eq!(turns[1], Turn::model("Vou consultar."));
        assert_eq!(turns[2], Turn::ToolCall(senadores_call("c1")));
        assert!(matches!(&turns[3], Turn::ToolResult(r) if r.call_id == "c1"));
    }

    #[tokio::test]
    async fn unknown_tool_is_fed_back_as_failure() {
        let provider = Arc::new(
            ScriptedProvider::new("gemini")
                .then(Decision::invoke(vec![
                    ToolCall::new("a", "inexistente", Arguments::new()),
                    senadores_call("b"),
                ]))
                .then(Decision::Final("Parcial.".into())),
        );
        let output = orchestrator(provider)
            .run("?", vec![], "gemini")
            .await
            .unwrap();

        let turns = output.transcript.render();
        let Turn::ToolResult(missing) = &turns[2] else {
            panic!("expected a result after the first call");
        };
        assert_eq!(
            missing.outcome,
            ToolOutcome::Failure {
                error: ToolError::NotFound("inexistente".into())
            }
        );
        let Turn::ToolResult(found) = &turns[4] else {
            panic!("expected a result after the second call");
        };
        assert!(!found.outcome.is_failure());
    }

    #[tokio::test]
    async fn bound_yields_fallback() {
        let provider = Arc::new(ScriptedProvider::repeating(
            "groq",
            Decision::invoke(vec![senadores_call("x")]),
        ));
        let output = orchestrator(provider.clone())
            .with_max_rounds(2)
            .run("loop", vec![], "groq")
            .await
            .unwrap();

        assert!(output.exhausted);
        assert_eq!(output.rounds, 2);
        assert_eq!(output.reply, FALLBACK_REPLY);
        assert_eq!(provider.calls(), 3);
        // user + 2 rounds of (call, result); the third decision is dropped.
        assert_eq!(output.transcript.len(), 5);
    }

    #[tokio::test]
    async fn provider_errors_are_fatal() {
        let provider = Arc::new(
            ScriptedProvider::new("gemini").then_fail(ModelError::Auth("bad key".into())),
        );
        let err = orchestrator(provider)
            .run("oi", vec![], "gemini")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Model(ModelError::Auth(_))));
        assert_eq!(user_reply(&err), UNEXPECTED_REPLY);
    }

    #[tokio::test]
    async fn handle_turn_maps_errors_to_replies() {
        let provider = Arc::new(
            ScriptedProvider::new("gemini")
                .then_fail(ModelError::RateLimited("quota".into())),
        );
        let orchestrator = orchestrator(provider);

        assert_eq!(
            orchestrator.handle_turn("oi", vec![], "gemini").await,
            UNREACHABLE_REPLY
        );
        assert_eq!(
            orchestrator.handle_turn("oi", vec![], "claude").await,
            UNKNOWN_PROVIDER_REPLY
        );
    }

    #[test]
    fn replies_never_leak_details() {
        let err = Error::Model(ModelError::Api("400: secret payload".into()));
        assert!(!user_reply(&err).contains("secret"));
        let err = Error::Model(ModelError::Network("connection refused".into()));
        assert_eq!(user_reply(&err), UNREACHABLE_REPLY);
    }
}
