//! Configuration loading from plenario.toml.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use legis::SourcesConfig;
use runtime::ProviderConfig;
use runtime::mcp::{McpServer, McpTransport};
use serde::Deserialize;

/// File read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "plenario.toml";

/// Top-level configuration. Every field has a default.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub providers: ProvidersConfig,
    pub orchestrator: OrchestratorConfig,
    pub sources: SourcesConfig,
    pub mcp: McpConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8000)),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub gemini: ProviderSection,
    pub groq: ProviderSection,
}

/// One `[providers.<id>]` table.
#[derive(Default, Deserialize)]
#[serde(default)]
pub struct ProviderSection {
    /// Falls back to the provider's environment variable when unset.
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

impl std::fmt::Debug for ProviderSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSection")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub max_rounds: usize,
    pub provider_timeout_secs: u64,
    pub tool_timeout_secs: u64,
    /// Persona text; the built-in one is used when unset.
    pub instructions: Option<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_rounds: runtime::DEFAULT_MAX_ROUNDS,
            provider_timeout_secs: 60,
            tool_timeout_secs: 25,
            instructions: None,
        }
    }
}

/// External MCP servers whose tools join the catalog.
///
/// String values of `env` and `bearer_token` that start with `$` name an
/// environment variable; the literal is kept when it is unset.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct McpConfig {
    pub connect_timeout_secs: u64,
    pub stdio: HashMap<String, StdioServerSection>,
    pub http: HashMap<String, HttpServerSection>,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 5,
            stdio: HashMap::new(),
            http: HashMap::new(),
        }
    }
}

/// One `[mcp.stdio.<name>]` table.
#[derive(Default, Deserialize)]
#[serde(default)]
pub struct StdioServerSection {
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
}

impl std::fmt::Debug for StdioServerSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdioServerSection")
            .field("command", &self.command)
            .field("args", &self.args)
            .field("env", &self.env.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// One `[mcp.http.<name>]` table.
#[derive(Default, Deserialize)]
#[serde(default)]
pub struct HttpServerSection {
    pub url: String,
    pub bearer_token: Option<String>,
}

impl std::fmt::Debug for HttpServerSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpServerSection")
            .field("url", &self.url)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Replace a `$NAME` value with that variable, when it is set.
fn expand_env(value: &str, env: &impl Fn(&str) -> Option<String>) -> String {
    value
        .strip_prefix('$')
        .and_then(env)
        .unwrap_or_else(|| value.to_string())
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load the given file, or `plenario.toml` if present, or defaults.
    pub fn discover(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::load(DEFAULT_CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.orchestrator.provider_timeout_secs)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.orchestrator.tool_timeout_secs)
    }

    /// Settings for every provider that has a credential, keyed by id.
    ///
    /// `env` looks up environment variables; it is a parameter so tests do
    /// not depend on the process environment.
    pub fn provider_configs(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> HashMap<String, ProviderConfig> {
        [
            ("gemini", "GOOGLE_API_KEY", &self.providers.gemini),
            ("groq", "GROQ_API_KEY", &self.providers.groq),
        ]
        .into_iter()
        .filter_map(|(id, var, section)| {
            let key = section
                .api_key
                .clone()
                .or_else(|| env(var))
                .filter(|k| !k.trim().is_empty())?;

            let mut config = ProviderConfig::new(key).with_timeout(self.provider_timeout());
            if let Some(model) = &section.model {
                config = config.with_model(model);
            }
            if let Some(url) = &section.base_url {
                config = config.with_base_url(url);
            }
            Some((id.to_string(), config))
        })
        .collect()
    }

    pub fn mcp_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.mcp.connect_timeout_secs)
    }

    /// Every configured MCP server, sorted by name, with `$NAME` values
    /// resolved through `env`.
    pub fn mcp_servers(&self, env: impl Fn(&str) -> Option<String>) -> Vec<McpServer> {
        let stdio = self.mcp.stdio.iter().map(|(name, section)| {
            let vars = section
                .env
                .iter()
                .map(|(key, value)| (key.clone(), expand_env(value, &env)))
                .collect();
            let transport = McpTransport::Stdio {
                command: section.command.clone(),
                args: section.args.clone(),
                env: vars,
            };
            McpServer::new(name.clone(), transport)
        });
        let http = self.mcp.http.iter().map(|(name, section)| {
            let transport = McpTransport::Http {
                url: section.url.clone(),
                bearer_token: section
                    .bearer_token
                    .as_deref()
                    .map(|token| expand_env(token, &env))
                    .filter(|token| !token.trim().is_empty()),
            };
            McpServer::new(name.clone(), transport)
        });

        let mut servers: Vec<McpServer> = stdio.chain(http).collect();
        servers.sort_by(|a, b| a.name.cmp(&b.name));
        servers
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.server.bind.to_string(), "127.0.0.1:8000");
        assert_eq!(config.orchestrator.max_rounds, 5);
        assert_eq!(config.tool_timeout(), Duration::from_secs(25));
        assert_eq!(config.provider_timeout(), Duration::from_secs(60));
        assert_eq!(config.sources, SourcesConfig::default());
        assert_eq!(config.mcp_connect_timeout(), Duration::from_secs(5));
        assert!(config.mcp_servers(|_| None).is_empty());
    }

    #[test]
    fn parses_sections() {
        let config = Config::parse(
            r#"
            [server]
            bind = "0.0.0.0:9000"

            [providers.groq]
            api_key = "gsk-file"
            model = "llama-3.1-8b-instant"

            [orchestrator]
            max_rounds = 3
            instructions = "Responda em uma frase."

            [sources]
            timeout_secs = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind.port(), 9000);
        assert_eq!(config.orchestrator.max_rounds, 3);
        assert_eq!(
            config.orchestrator.instructions.as_deref(),
            Some("Responda em uma frase.")
        );
        assert_eq!(config.sources.timeout_secs, 10);
        assert_eq!(
            config.providers.groq.model.as_deref(),
            Some("llama-3.1-8b-instant")
        );
    }

    #[test]
    fn rejects_bad_toml() {
        assert!(matches!(
            Config::parse("[server]\nbind = 12"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn credentials_fall_back_to_environment() {
        let config = Config::parse("[providers.groq]\napi_key = \"gsk-file\"").unwrap();
        let env = |var: &str| (var == "GOOGLE_API_KEY").then(|| "g-env".to_string());

        let configs = config.provider_configs(env);
        assert_eq!(configs.len(), 2);
        assert_eq!(configs["gemini"].api_key, "g-env");
        assert_eq!(configs["groq"].api_key, "gsk-file");
        assert_eq!(configs["groq"].timeout, Duration::from_secs(60));
    }

    #[test]
    fn providers_without_credentials_are_skipped() {
        let config = Config::parse("[providers.gemini]\napi_key = \"  \"").unwrap();
        assert!(config.provider_configs(|_| None).is_empty());
    }

    #[test]
    fn debug_redacts_keys() {
        let config = Config::parse("[providers.gemini]\napi_key = \"AIza-secret\"").unwrap();
        assert!(!format!("{config:?}").contains("AIza-secret"));
    }

    #[test]
    fn mcp_servers_resolve_environment_references() {
        let config = Config::parse(
            r#"
            [mcp]
            connect_timeout_secs = 8

            [mcp.stdio.legis]
            command = "python3"
            args = ["senado_camara_mcp_server.py"]
            env = { CAMARA_TOKEN = "$CAMARA_TOKEN", MODE = "$UNSET", LANG = "pt_BR" }

            [mcp.http.agenda]
            url = "https://agenda.example/mcp"
            bearer_token = "$AGENDA_TOKEN"
            "#,
        )
        .unwrap();
        let env = |var: &str| match var {
            "CAMARA_TOKEN" => Some("c-123".to_string()),
            "AGENDA_TOKEN" => Some("a-456".to_string()),
            _ => None,
        };

        assert_eq!(config.mcp_connect_timeout(), Duration::from_secs(8));
        let servers = config.mcp_servers(env);
        let names: Vec<&str> = servers.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["agenda", "legis"]);

        let McpTransport::Http { url, bearer_token } = &servers[0].transport else {
            panic!("expected an HTTP server: {:?}", servers[0]);
        };
        assert_eq!(url, "https://agenda.example/mcp");
        assert_eq!(bearer_token.as_deref(), Some("a-456"));

        let McpTransport::Stdio { command, args, env } = &servers[1].transport else {
            panic!("expected a stdio server: {:?}", servers[1]);
        };
        assert_eq!(command, "python3");
        assert_eq!(args, &vec!["senado_camara_mcp_server.py".to_string()]);
        assert_eq!(env["CAMARA_TOKEN"], "c-123");
        assert_eq!(env["MODE"], "$UNSET");
        assert_eq!(env["LANG"], "pt_BR");
    }

    #[test]
    fn debug_redacts_mcp_secrets() {
        let config = Config::parse(
            r#"
            [mcp.stdio.legis]
            command = "legis-mcp"
            env = { TOKEN = "stdio-secret" }

            [mcp.http.agenda]
            url = "https://agenda.example/mcp"
            bearer_token = "http-secret"
            "#,
        )
        .unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("stdio-secret"));
        assert!(!debug.contains("http-secret"));
    }
}
