//! Tool trait.

use crate::model::Arguments;
use crate::tools::ToolError;
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;

/// The callable half of a tool.
///
/// Arguments have already been validated against the tool's parameters
/// when `call` runs.
#[async_trait]
pub trait Tool: Send + Sync {
    async fn call(&self, arguments: &Arguments) -> Result<Value, ToolError>;
}

/// Adapts an async closure into a [`Tool`].
pub struct FnTool<F>(F);

impl<F> FnTool<F> {
    pub fn new<Fut>(f: F) -> Self
    where
        F: Fn(Arguments) -> Fut + Send + Sync,
        Fut: Future<Output = Result<Value, ToolError>> + Send,
    {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut> Tool for FnTool<F>
where
    F: Fn(Arguments) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ToolError>> + Send,
{
    async fn call(&self, arguments: &Arguments) -> Result<Value, ToolError> {
        (self.0)(arguments.clone()).await
    }
}
