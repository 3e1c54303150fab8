//! Tools that map their arguments onto a single API request.

use std::sync::Arc;

use async_trait::async_trait;
use runtime::{Arguments, Tool, ToolError, ToolSpec, tools::string_arg};
use serde_json::Value;

use crate::client::{DadosAbertos, Query};

/// Turns validated arguments into a request.
pub(crate) type Build = fn(&Arguments) -> Result<Query, ToolError>;

struct Endpoint {
    client: Arc<DadosAbertos>,
    build: Build,
}

#[async_trait]
impl Tool for Endpoint {
    async fn call(&self, arguments: &Arguments) -> Result<Value, ToolError> {
        let query = (self.build)(arguments)?;
        self.client.fetch(&query).await
    }
}

pub(crate) fn endpoint(
    client: &Arc<DadosAbertos>,
    name: &str,
    description: &str,
    build: Build,
) -> ToolSpec {
    ToolSpec::new(
        name,
        description,
        Endpoint {
            client: Arc::clone(client),
            build,
        },
    )
}

/// An optional argument, trimmed, `None` when blank.
pub(crate) fn opt(arguments: &Arguments, name: &str) -> Option<String> {
    string_arg(arguments, name).map(str::to_string)
}

/// An optional argument, upper-cased.
pub(crate) fn opt_upper(arguments: &Arguments, name: &str) -> Option<String> {
    string_arg(arguments, name).map(str::to_uppercase)
}

/// A required argument that goes into a URL path.
///
/// Only letters, digits, `-` and `_` are accepted so the value cannot
/// escape its path segment.
pub(crate) fn segment(arguments: &Arguments, name: &str) -> Result<String, ToolError> {
    let value = string_arg(arguments, name).ok_or_else(|| {
        ToolError::InvalidArguments(format!("parameter `{name}` must not be blank"))
    })?;
    if value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Ok(value.to_string())
    } else {
        Err(ToolError::InvalidArguments(format!(
            "parameter `{name}` has invalid characters: {value}"
        )))
    }
}

/// An optional argument that goes into a URL path.
pub(crate) fn opt_segment(arguments: &Arguments, name: &str) -> Result<Option<String>, ToolError> {
    match string_arg(arguments, name) {
        Some(_) => segment(arguments, name).map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
pub(crate) fn args(value: Value) -> Arguments {
    value.as_object().cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn segments_reject_path_tricks() {
        let a = args(json!({"codigo": " 132046 ", "mal": "../senador", "vazio": " "}));
        assert_eq!(segment(&a, "codigo").unwrap(), "132046");
        assert!(matches!(
            segment(&a, "mal"),
            Err(ToolError::InvalidArguments(_))
        ));
        assert!(matches!(
            segment(&a, "vazio"),
            Err(ToolError::InvalidArguments(_))
        ));
        assert_eq!(opt_segment(&a, "ausente").unwrap(), None);
    }

    #[test]
    fn optional_helpers() {
        let a = args(json!({"uf": "ce", "ano": ""}));
        assert_eq!(opt_upper(&a, "uf").as_deref(), Some("CE"));
        assert_eq!(opt(&a, "ano"), None);
    }
}
