//! HTTP access to the Senado and Câmara open-data APIs.

use std::time::Duration;

use reqwest::Url;
use runtime::{Error, ToolError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

pub const SENADO_API_BASE: &str = "https://legis.senado.leg.br/dadosabertos";
pub const CAMARA_API_BASE: &str = "https://dadosabertos.camara.leg.br/api/v2";

/// Where the open-data APIs live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub senado_base_url: String,
    pub camara_base_url: String,
    /// Per-request HTTP timeout.
    pub timeout_secs: u64,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            senado_base_url: SENADO_API_BASE.to_string(),
            camara_base_url: CAMARA_API_BASE.to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Senado,
    Camara,
}

/// A GET request against one of the APIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub source: Source,
    pub path: String,
    pub params: Vec<(&'static str, String)>,
    /// Append `.json` to the path to select the Senado JSON rendering.
    pub json_suffix: bool,
}

impl Query {
    /// A Senado endpoint rendered as JSON.
    pub fn senado(path: impl Into<String>) -> Self {
        Self {
            source: Source::Senado,
            path: path.into(),
            params: Vec::new(),
            json_suffix: true,
        }
    }

    /// A Senado endpoint in its default rendering (usually XML).
    pub fn senado_raw(path: impl Into<String>) -> Self {
        Self {
            json_suffix: false,
            ..Self::senado(path)
        }
    }

    pub fn camara(path: impl Into<String>) -> Self {
        Self {
            source: Source::Camara,
            path: path.into(),
            params: Vec::new(),
            json_suffix: false,
        }
    }

    pub fn param(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.params.push((name, value.into()));
        self
    }

    /// Add the parameter only when a value is present.
    pub fn param_opt(self, name: &'static str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.param(name, value),
            None => self,
        }
    }

    /// Câmara list ordering.
    pub fn ordered(self, ordem: &'static str, ordenar_por: &'static str) -> Self {
        self.param("ordem", ordem).param("ordenarPor", ordenar_por)
    }
}

/// Client for both open-data APIs.
#[derive(Debug, Clone)]
pub struct DadosAbertos {
    http: reqwest::Client,
    senado: String,
    camara: String,
}

impl DadosAbertos {
    pub fn new(config: &SourcesConfig) -> runtime::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("plenario/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            senado: config.senado_base_url.trim_end_matches('/').to_string(),
            camara: config.camara_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, query: &Query) -> Result<Url, ToolError> {
        let base = match query.source {
            Source::Senado => &self.senado,
            Source::Camara => &self.camara,
        };
        let suffix = if query.json_suffix { ".json" } else { "" };
        let raw = format!("{base}{}{suffix}", query.path);
        Url::parse(&raw).map_err(|e| ToolError::Execution(format!("invalid URL {raw}: {e}")))
    }

    /// Fetch an endpoint. JSON bodies are parsed; anything else comes back
    /// as a string.
    pub async fn fetch(&self, query: &Query) -> Result<Value, ToolError> {
        let url = self.url(query)?;
        debug!(%url, params = ?query.params, "fetching open data");

        let response = self
            .http
            .get(url.clone())
            .query(&query.params)
            .send()
            .await
            .map_err(|e| ToolError::Execution(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "open-data API returned an error");
            return Err(ToolError::Execution(format!("HTTP {status} from {url}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ToolError::Execution(format!("failed to read body from {url}: {e}")))?;

        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }
}
