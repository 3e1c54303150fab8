//! HTTP surface: `POST /api/chat` and `GET /api/health`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use runtime::{HistoryEntry, Orchestrator};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{Error, Result};

/// Provider used when a request does not name one.
const DEFAULT_PROVIDER: &str = "gemini";

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default = "default_provider", alias = "model")]
    pub provider: String,
}

fn default_provider() -> String {
    DEFAULT_PROVIDER.to_string()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub tools_count: usize,
    pub tools: Vec<String>,
    pub providers: Vec<String>,
}

/// Answer one chat turn. Provider failures still produce a 200 with an
/// apologetic reply.
async fn chat(
    State(orchestrator): State<Arc<Orchestrator>>,
    Json(request): Json<ChatRequest>,
) -> Json<ChatResponse> {
    let reply = orchestrator
        .handle_turn(&request.message, request.history, &request.provider)
        .await;
    Json(ChatResponse { reply })
}

async fn health(State(orchestrator): State<Arc<Orchestrator>>) -> Json<HealthResponse> {
    let registry = orchestrator.registry();
    Json(HealthResponse {
        status: "ok".to_string(),
        tools_count: registry.len(),
        tools: registry.names().into_iter().map(str::to_string).collect(),
        providers: orchestrator
            .providers()
            .ids()
            .into_iter()
            .map(str::to_string)
            .collect(),
    })
}

pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/health", get(health))
        // The browser front-end is served from another origin.
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(orchestrator)
}

/// Serve until the process is interrupted.
pub async fn serve(orchestrator: Arc<Orchestrator>, addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| Error::Bind { addr, source })?;

    info!(%addr, "listening");

    axum::serve(listener, router(orchestrator))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use runtime::{
        Arguments, Decision, FnTool, ModelError, ParamSpec, ParamType, Providers,
        ScriptedProvider, ToolCall, ToolRegistry, ToolSpec, Turn, UNREACHABLE_REPLY,
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn registry() -> Arc<ToolRegistry> {
        let tool = ToolSpec::new(
            "buscar_senadores",
            "Lista senadores",
            FnTool::new(|_| async { Ok(json!(["Cid Gomes"])) }),
        )
        .param(ParamSpec::optional("uf", ParamType::String, "UF"));
        Arc::new(ToolRegistry::new(vec![tool]).unwrap())
    }

    fn app(provider: Arc<ScriptedProvider>) -> Router {
        router(Arc::new(Orchestrator::new(
            Providers::new().with(provider),
            registry(),
        )))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn chat_runs_the_loop() {
        let provider = Arc::new(
            ScriptedProvider::new("gemini")
                .then(Decision::invoke(vec![ToolCall::new(
                    "c1",
                    "buscar_senadores",
                    [("uf".to_string(), json!("CE"))].into_iter().collect::<Arguments>(),
                )]))
                .then(Decision::Final("Cid Gomes.".into())),
        );
        let response = app(provider.clone())
            .oneshot(post_json(
                "/api/chat",
                json!({
                    "message": "Liste os senadores do Ceará",
                    "history": [
                        {"role": "user", "text": "oi"},
                        {"role": "assistant", "text": "olá"}
                    ]
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"reply": "Cid Gomes."}));
        assert_eq!(provider.seen()[0][1], Turn::model("olá"));
    }

    #[tokio::test]
    async fn chat_accepts_model_as_provider_alias() {
        let provider = Arc::new(ScriptedProvider::new("groq").then(Decision::Final("ok".into())));
        let response = app(provider.clone())
            .oneshot(post_json(
                "/api/chat",
                json!({"message": "oi", "model": "groq"}),
            ))
            .await
            .unwrap();

        assert_eq!(body_json(response).await["reply"], "ok");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn provider_failures_still_reply() {
        let provider = Arc::new(
            ScriptedProvider::new("gemini").then_fail(ModelError::Network("reset".into())),
        );
        let response = app(provider)
            .oneshot(post_json("/api/chat", json!({"message": "oi"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["reply"], UNREACHABLE_REPLY);
    }

    #[tokio::test]
    async fn malformed_body_is_rejected() {
        let provider = Arc::new(ScriptedProvider::new("gemini"));
        let response = app(provider.clone())
            .oneshot(post_json("/api/chat", json!({"history": []})))
            .await
            .unwrap();

        assert!(response.status().is_client_error());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn health_lists_tools_and_providers() {
        let response = app(Arc::new(ScriptedProvider::new("gemini")))
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let health: HealthResponse = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(health.status, "ok");
        assert_eq!(health.tools_count, 1);
        assert_eq!(health.tools, vec!["buscar_senadores"]);
        assert_eq!(health.providers, vec!["gemini"]);
    }

    #[tokio::test]
    async fn cors_allows_any_origin() {
        let response = app(Arc::new(ScriptedProvider::new("gemini")))
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/chat")
                    .header(header::ORIGIN, "https://plenario.example")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(
            response
                .headers()
                .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        );
    }
}
