//! Tools served by external MCP (Model Context Protocol) servers.
//!
//! Each configured server is connected once at startup, over a child
//! process's stdio or over streamable HTTP, using the official rmcp SDK.
//! Its tools are listed and registered as ordinary [`ToolSpec`]s whose
//! handler forwards the call to the server.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use runtime::mcp::{McpServer, McpTransport, discover_tools};
//!
//! # async fn example() {
//! let servers = vec![McpServer::new(
//!     "legis",
//!     McpTransport::Stdio {
//!         command: "python3".into(),
//!         args: vec!["senado_camara_mcp_server.py".into()],
//!         env: Default::default(),
//!     },
//! )];
//! let specs = discover_tools(&servers, Duration::from_secs(10)).await;
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use rmcp::ServiceExt;
use rmcp::model::{CallToolRequestParams, CallToolResult, JsonObject, RawContent};
use rmcp::service::{RoleClient, RunningService};
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::{ConfigureCommandExt, StreamableHttpClientTransport, TokioChildProcess};
use serde_json::Value;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::model::Arguments;
use crate::tools::{ParamSpec, ParamType, Tool, ToolError, ToolSpec};

/// Errors from connecting to or talking with an MCP server.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("failed to start MCP server `{server}`: {source}")]
    Spawn {
        server: String,
        source: std::io::Error,
    },

    #[error("MCP server `{server}`: {message}")]
    Protocol { server: String, message: String },

    #[error("MCP server `{server}` did not answer within {seconds}s")]
    Timeout { server: String, seconds: u64 },
}

/// How to reach an MCP server.
#[derive(Clone)]
pub enum McpTransport {
    /// A child process speaking MCP over stdin/stdout. It inherits the
    /// environment, plus `env`.
    Stdio {
        command: String,
        args: Vec<String>,
        env: HashMap<String, String>,
    },
    /// A streamable HTTP endpoint.
    Http {
        url: String,
        bearer_token: Option<String>,
    },
}

impl fmt::Debug for McpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdio { command, args, env } => f
                .debug_struct("Stdio")
                .field("command", command)
                .field("args", args)
                .field("env", &env.keys().collect::<Vec<_>>())
                .finish(),
            Self::Http { url, bearer_token } => f
                .debug_struct("Http")
                .field("url", url)
                .field("bearer_token", &bearer_token.as_ref().map(|_| "<redacted>"))
                .finish(),
        }
    }
}

/// A named MCP server.
#[derive(Debug, Clone)]
pub struct McpServer {
    pub name: String,
    pub transport: McpTransport,
}

impl McpServer {
    pub fn new(name: impl Into<String>, transport: McpTransport) -> Self {
        Self {
            name: name.into(),
            transport,
        }
    }
}

/// A live connection to one MCP server. Dropping it closes the session
/// and stops a stdio server's process.
pub struct McpClient {
    server: String,
    service: RunningService<RoleClient, ()>,
}

impl McpClient {
    /// Start or reach the server and complete the MCP handshake.
    pub async fn connect(server: &McpServer) -> Result<Self, McpError> {
        let name = server.name.as_str();
        let service = match &server.transport {
            McpTransport::Stdio { command, args, env } => {
                let transport = TokioChildProcess::new(Command::new(command).configure(|cmd| {
                    cmd.args(args).envs(env);
                }))
                .map_err(|source| McpError::Spawn {
                    server: name.to_string(),
                    source,
                })?;
                ().serve(transport)
                    .await
                    .map_err(|e| protocol(name, format!("initialization failed: {e}")))?
            }
            McpTransport::Http { url, bearer_token } => {
                let mut config = StreamableHttpClientTransportConfig::with_uri(url.as_str());
                if let Some(token) = bearer_token {
                    config = config.auth_header(token.clone());
                }
                ().serve(StreamableHttpClientTransport::from_config(config))
                    .await
                    .map_err(|e| protocol(name, format!("initialization failed: {e}")))?
            }
        };

        Ok(Self {
            server: name.to_string(),
            service,
        })
    }

    /// The server's tools as registry entries that call back into it.
    ///
    /// Tools whose parameters cannot be declared are skipped with a warning.
    pub async fn tool_specs(self: &Arc<Self>) -> Result<Vec<ToolSpec>, McpError> {
        let tools = self
            .service
            .list_all_tools()
            .await
            .map_err(|e| protocol(&self.server, format!("tools/list failed: {e}")))?;

        let mut specs = Vec::with_capacity(tools.len());
        for tool in tools {
            let name = tool.name.to_string();
            match params(&tool.input_schema) {
                Ok(params) => {
                    debug!(server = %self.server, tool = %name, "registered MCP tool");
                    let description = tool.description.as_deref().unwrap_or_default().to_string();
                    let handler = McpTool {
                        client: Arc::clone(self),
                        name: name.clone(),
                    };
                    specs.push(
                        params
                            .into_iter()
                            .fold(ToolSpec::new(name, description, handler), ToolSpec::param),
                    );
                }
                Err(reason) => {
                    warn!(server = %self.server, tool = %name, %reason, "skipping MCP tool");
                }
            }
        }
        Ok(specs)
    }

    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Arguments,
    ) -> Result<CallToolResult, McpError> {
        self.service
            .call_tool(CallToolRequestParams {
                meta: None,
                name: name.to_string().into(),
                arguments: Some(arguments),
                task: None,
            })
            .await
            .map_err(|e| protocol(&self.server, format!("tools/call `{name}` failed: {e}")))
    }
}

fn protocol(server: &str, message: String) -> McpError {
    McpError::Protocol {
        server: server.to_string(),
        message,
    }
}

/// Handler of a tool that lives on an MCP server.
struct McpTool {
    client: Arc<McpClient>,
    name: String,
}

#[async_trait]
impl Tool for McpTool {
    async fn call(&self, arguments: &Arguments) -> Result<Value, ToolError> {
        let result = self
            .client
            .call_tool(&self.name, arguments.clone())
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;
        output(result)
    }
}

/// Connect to every server concurrently and collect their tools.
///
/// A server that cannot be reached within `timeout` is logged and skipped;
/// the others still contribute.
pub async fn discover_tools(servers: &[McpServer], timeout: Duration) -> Vec<ToolSpec> {
    let discovered = join_all(servers.iter().map(|server| async move {
        let connect = async {
            let client = Arc::new(McpClient::connect(server).await?);
            client.tool_specs().await
        };
        let specs = tokio::time::timeout(timeout, connect)
            .await
            .unwrap_or_else(|_| {
                Err(McpError::Timeout {
                    server: server.name.clone(),
                    seconds: timeout.as_secs(),
                })
            });
        match specs {
            Ok(specs) => {
                info!(server = %server.name, tools = specs.len(), "MCP server connected");
                specs
            }
            Err(error) => {
                warn!(server = %server.name, %error, "MCP server unavailable");
                Vec::new()
            }
        }
    }))
    .await;

    discovered.into_iter().flatten().collect()
}

/// Declared parameters from a tool's JSON Schema. Only scalar parameter
/// types are supported; a nullable type such as `["string", "null"]`
/// counts as its non-null member.
fn params(schema: &JsonObject) -> Result<Vec<ParamSpec>, String> {
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(Vec::new());
    };

    properties
        .iter()
        .map(|(name, property)| {
            let ty = match property.get("type") {
                Some(Value::String(ty)) => ParamType::parse(ty),
                Some(Value::Array(types)) => types
                    .iter()
                    .filter_map(Value::as_str)
                    .find(|ty| *ty != "null")
                    .and_then(ParamType::parse),
                _ => None,
            }
            .ok_or_else(|| format!("parameter `{name}` has no supported type"))?;

            let description = property
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();

            Ok(if required.contains(&name.as_str()) {
                ParamSpec::required(name.clone(), ty, description)
            } else {
                ParamSpec::optional(name.clone(), ty, description)
            })
        })
        .collect()
}

/// The tool output carried by a call result: its text content, decoded as
/// JSON when it is JSON.
fn output(result: CallToolResult) -> Result<Value, ToolError> {
    let text = result
        .content
        .iter()
        .filter_map(|content| match &content.raw {
            RawContent::Text(text) => Some(text.text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n");

    if result.is_error.unwrap_or(false) {
        let message = if text.is_empty() {
            "server reported an error".to_string()
        } else {
            text
        };
        return Err(ToolError::Execution(message));
    }

    Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::Content;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn schema(value: Value) -> JsonObject {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn params_follow_the_input_schema() {
        let params = params(&schema(json!({
            "type": "object",
            "properties": {
                "ano": {"type": "integer", "description": "Ano"},
                "sigla": {"type": "string", "description": "Tipo da proposição"},
                "uf": {"type": ["string", "null"]}
            },
            "required": ["sigla"]
        })))
        .unwrap();

        assert_eq!(
            params,
            vec![
                ParamSpec::optional("ano", ParamType::Integer, "Ano"),
                ParamSpec::required("sigla", ParamType::String, "Tipo da proposição"),
                ParamSpec::optional("uf", ParamType::String, ""),
            ]
        );
    }

    #[test]
    fn schema_without_properties_declares_nothing() {
        assert!(params(&schema(json!({"type": "object"}))).unwrap().is_empty());
    }

    #[test]
    fn non_scalar_params_are_rejected() {
        let err = params(&schema(json!({
            "type": "object",
            "properties": {"ids": {"type": "array", "items": {"type": "string"}}}
        })))
        .unwrap_err();
        assert!(err.contains("`ids`"));
    }

    #[test]
    fn json_text_is_decoded() {
        let result = CallToolResult::success(vec![Content::text(r#"{"dados": [1, 2]}"#)]);
        assert_eq!(output(result).unwrap(), json!({"dados": [1, 2]}));
    }

    #[test]
    fn plain_text_is_kept_as_string() {
        let result = CallToolResult::success(vec![
            Content::text("<xml>"),
            Content::text("</xml>"),
        ]);
        assert_eq!(output(result).unwrap(), json!("<xml>\n</xml>"));
    }

    #[test]
    fn error_results_are_execution_failures() {
        let result = CallToolResult::error(vec![Content::text("HTTP 503")]);
        assert_eq!(
            output(result).unwrap_err(),
            ToolError::Execution("HTTP 503".into())
        );
    }

    #[test]
    fn debug_hides_bearer_token() {
        let transport = McpTransport::Http {
            url: "https://mcp.example/mcp".into(),
            bearer_token: Some("very-secret".into()),
        };
        assert!(!format!("{transport:?}").contains("very-secret"));
    }

    /// Answer a JSON-RPC request with `result`, echoing its id.
    fn rpc_result(result: Value) -> impl Fn(&Request) -> ResponseTemplate + Send + Sync {
        move |request: &Request| {
            let body: Value = serde_json::from_slice(&request.body).unwrap();
            ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": body["id"],
                "result": result,
            }))
        }
    }

    async fn mount_rpc(server: &MockServer, rpc_method: &str, result: Value) {
        Mock::given(method("POST"))
            .and(path("/mcp"))
            .and(header("authorization", "Bearer legis-token"))
            .and(body_partial_json(json!({"method": rpc_method})))
            .respond_with(rpc_result(result))
            .mount(server)
            .await;
    }

    async fn legis_server() -> MockServer {
        let server = MockServer::start().await;
        mount_rpc(
            &server,
            "initialize",
            json!({
                "protocolVersion": "2025-03-26",
                "capabilities": {"tools": {}},
                "serverInfo": {"name": "legis", "version": "0.1.0"}
            }),
        )
        .await;
        Mock::given(method("POST"))
            .and(path("/mcp"))
            .and(body_partial_json(json!({"method": "notifications/initialized"})))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;
        mount_rpc(
            &server,
            "tools/list",
            json!({"tools": [
                {
                    "name": "buscar_senadores",
                    "description": "Lista senadores em exercício",
                    "inputSchema": {
                        "type": "object",
                        "properties": {"uf": {"type": "string", "description": "UF"}}
                    }
                },
                {
                    "name": "comparar",
                    "inputSchema": {
                        "type": "object",
                        "properties": {"ids": {"type": "array"}}
                    }
                }
            ]}),
        )
        .await;
        mount_rpc(
            &server,
            "tools/call",
            json!({
                "content": [{"type": "text", "text": "[\"Cid Gomes\", \"Camilo Santana\"]"}],
                "isError": false
            }),
        )
        .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(405))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn http_server_tools_are_discovered_and_called() {
        let server = legis_server().await;
        let servers = vec![McpServer::new(
            "legis",
            McpTransport::Http {
                url: format!("{}/mcp", server.uri()),
                bearer_token: Some("legis-token".into()),
            },
        )];

        let specs = discover_tools(&servers, Duration::from_secs(5)).await;
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "buscar_senadores");
        assert_eq!(specs[0].description, "Lista senadores em exercício");
        assert_eq!(
            specs[0].params,
            vec![ParamSpec::optional("uf", ParamType::String, "UF")]
        );

        let registry = crate::tools::ToolRegistry::new(specs).unwrap();
        let outcome = registry
            .invoke("buscar_senadores", &schema(json!({"uf": "CE"})))
            .await;
        assert_eq!(
            outcome,
            crate::model::ToolOutcome::Success {
                output: json!(["Cid Gomes", "Camilo Santana"])
            }
        );
    }

    #[tokio::test]
    async fn unreachable_servers_are_skipped() {
        let servers = vec![
            McpServer::new(
                "fora",
                McpTransport::Http {
                    url: "http://127.0.0.1:9/mcp".into(),
                    bearer_token: None,
                },
            ),
            McpServer::new(
                "inexistente",
                McpTransport::Stdio {
                    command: "plenario-no-such-mcp-server".into(),
                    args: vec!["--stdio".into()],
                    env: HashMap::new(),
                },
            ),
        ];
        assert!(discover_tools(&servers, Duration::from_secs(5)).await.is_empty());
    }
}
