//! Name-indexed, read-only set of tools.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tracing::{info, warn};

use super::{ToolError, ToolSpec};
use crate::model::{Arguments, ToolCall, ToolOutcome, ToolResult};
use crate::{Error, Result};

/// Default bound on a single tool invocation.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(25);

/// The tools available to the model.
///
/// Built once at startup and shared read-only between concurrent turns.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    specs: Vec<ToolSpec>,
    index: HashMap<String, usize>,
    timeout: Duration,
}

impl ToolRegistry {
    /// Build a registry; tool names must be unique.
    pub fn new(specs: Vec<ToolSpec>) -> Result<Self> {
        let mut index = HashMap::with_capacity(specs.len());
        for (position, spec) in specs.iter().enumerate() {
            if index.insert(spec.name.clone(), position).is_some() {
                return Err(Error::Config(format!("duplicate tool name: {}", spec.name)));
            }
        }
        Ok(Self {
            specs,
            index,
            timeout: DEFAULT_TOOL_TIMEOUT,
        })
    }

    /// Set the bound on each invocation.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// All tools, in registration order.
    pub fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    pub fn names(&self) -> Vec<&str> {
        self.specs.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn lookup(&self, name: &str) -> std::result::Result<&ToolSpec, ToolError> {
        self.index
            .get(name)
            .map(|&position| &self.specs[position])
            .ok_or_else(|| ToolError::NotFound(name.to_string()))
    }

    /// Validate and run a tool. Every failure becomes a `Failure` outcome.
    #[tracing::instrument(skip(self, arguments))]
    pub async fn invoke(&self, name: &str, arguments: &Arguments) -> ToolOutcome {
        let outcome = ToolOutcome::from(self.try_invoke(name, arguments).await);
        match &outcome {
            ToolOutcome::Success { .. } => info!("tool succeeded"),
            ToolOutcome::Failure { error } => warn!(%error, "tool failed"),
        }
        outcome
    }

    /// Run a model-requested call and pair the outcome with it.
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        ToolResult::new(call, self.invoke(&call.name, &call.arguments).await)
    }

    async fn try_invoke(
        &self,
        name: &str,
        arguments: &Arguments,
    ) -> std::result::Result<Value, ToolError> {
        let spec = self.lookup(name)?;
        spec.validate(arguments)?;

        tokio::time::timeout(self.timeout, spec.handler().call(arguments))
            .await
            .map_err(|_| ToolError::Timeout(self.timeout.as_millis() as u64))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{FnTool, ParamSpec, ParamType};
    use serde_json::json;

    fn echo() -> ToolSpec {
        ToolSpec::new(
            "buscar_senadores",
            "Lista senadores",
            FnTool::new(|args: Arguments| async move { Ok(Value::Object(args)) }),
        )
        .param(ParamSpec::optional("uf", ParamType::String, "UF"))
    }

    fn slow() -> ToolSpec {
        ToolSpec::new(
            "lento",
            "Never finishes in time",
            FnTool::new(|_| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Value::Null)
            }),
        )
    }

    fn broken() -> ToolSpec {
        ToolSpec::new(
            "quebrado",
            "Always fails",
            FnTool::new(|_| async { Err(ToolError::Execution("HTTP 502".into())) }),
        )
    }

    fn args(value: Value) -> Arguments {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = ToolRegistry::new(vec![echo(), echo()]).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("buscar_senadores")));
    }

    #[test]
    fn lookup_and_names() {
        let registry = ToolRegistry::new(vec![echo(), broken()]).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["buscar_senadores", "quebrado"]);
        assert!(registry.lookup("buscar_senadores").is_ok());
        assert_eq!(
            registry.lookup("nope").unwrap_err(),
            ToolError::NotFound("nope".into())
        );
        assert!(ToolRegistry::new(Vec::new()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn invoke_success() {
        let registry = ToolRegistry::new(vec![echo()]).unwrap();
        let outcome = registry
            .invoke("buscar_senadores", &args(json!({"uf": "CE"})))
            .await;
        assert_eq!(
            outcome,
            ToolOutcome::Success {
                output: json!({"uf": "CE"})
            }
        );
    }

    #[tokio::test]
    async fn unknown_tool_is_a_failure_outcome() {
        let registry = ToolRegistry::new(vec![echo()]).unwrap();
        let outcome = registry.invoke("inexistente", &Arguments::new()).await;
        assert_eq!(
            outcome,
            ToolOutcome::Failure {
                error: ToolError::NotFound("inexistente".into())
            }
        );
    }

    #[tokio::test]
    async fn invalid_arguments_never_reach_the_tool() {
        let registry = ToolRegistry::new(vec![echo()]).unwrap();
        let outcome = registry
            .invoke("buscar_senadores", &args(json!({"estado": "CE"})))
            .await;
        assert!(matches!(
            outcome,
            ToolOutcome::Failure {
                error: ToolError::InvalidArguments(_)
            }
        ));
    }

    #[tokio::test]
    async fn execution_errors_are_caught() {
        let registry = ToolRegistry::new(vec![broken()]).unwrap();
        let call = ToolCall::new("c1", "quebrado", Arguments::new());
        let result = registry.execute(&call).await;
        assert_eq!(result.call_id, "c1");
        assert_eq!(result.name, "quebrado");
        assert_eq!(
            result.outcome,
            ToolOutcome::Failure {
                error: ToolError::Execution("HTTP 502".into())
            }
        );
    }

    #[tokio::test]
    async fn slow_tools_time_out() {
        let registry = ToolRegistry::new(vec![slow()])
            .unwrap()
            .with_timeout(Duration::from_millis(50));
        let outcome = registry.invoke("lento", &Arguments::new()).await;
        assert_eq!(
            outcome,
            ToolOutcome::Failure {
                error: ToolError::Timeout(50)
            }
        );
    }
}
