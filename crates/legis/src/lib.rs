//! Tools over the Brazilian legislative open-data APIs.
//!
//! Every tool is a read-only GET against either the Senado Federal
//! (`legis.senado.leg.br/dadosabertos`) or the Câmara dos Deputados
//! (`dadosabertos.camara.leg.br/api/v2`). Upstream failures surface as
//! [`runtime::ToolError::Execution`] so the model can react to them.

mod camara;
mod client;
mod endpoint;
mod senado;

use std::sync::Arc;

use runtime::ToolSpec;

pub use client::{CAMARA_API_BASE, DadosAbertos, Query, SENADO_API_BASE, Source, SourcesConfig};

/// The full tool catalog: Senado tools first, then Câmara tools.
pub fn catalog(config: &SourcesConfig) -> runtime::Result<Vec<ToolSpec>> {
    let client = Arc::new(DadosAbertos::new(config)?);
    let mut specs = senado::tools(&client);
    specs.extend(camara::tools(&client));
    tracing::debug!(tools = specs.len(), "built legislative tool catalog");
    Ok(specs)
}
