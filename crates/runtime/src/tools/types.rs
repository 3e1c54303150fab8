//! Tool-related types.

use super::{Tool, ToolError};
use crate::model::Arguments;
use serde_json::{Map, Value, json};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// JSON type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
}

impl ParamType {
    /// Parse a JSON Schema type name. Only scalar types are supported.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::String),
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            _ => None,
        }
    }

    /// JSON Schema type name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

/// One declared parameter of a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: Cow<'static, str>,
    pub ty: ParamType,
    pub required: bool,
    pub description: Cow<'static, str>,
}

impl ParamSpec {
    pub fn required(
        name: impl Into<Cow<'static, str>>,
        ty: ParamType,
        description: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            name: name.into(),
            ty,
            required: true,
            description: description.into(),
        }
    }

    pub fn optional(
        name: impl Into<Cow<'static, str>>,
        ty: ParamType,
        description: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            name: name.into(),
            ty,
            required: false,
            description: description.into(),
        }
    }
}

/// A tool exposed to the model: its name, declared parameters, and callable.
#[derive(Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
    handler: Arc<dyn Tool>,
}

impl ToolSpec {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: impl Tool + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    /// Declare a parameter. Declaration order is preserved.
    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    pub(crate) fn handler(&self) -> &dyn Tool {
        self.handler.as_ref()
    }

    /// JSON Schema (object) describing the parameters.
    pub fn schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| {
                (
                    p.name.to_string(),
                    json!({ "type": p.ty.as_str(), "description": p.description }),
                )
            })
            .collect();

        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_ref())
            .collect();

        let mut schema = json!({ "type": "object", "properties": properties });
        if !required.is_empty() {
            schema["required"] = json!(required);
        }
        schema
    }

    /// Check arguments against the declared parameters.
    ///
    /// `null` values count as absent.
    pub fn validate(&self, arguments: &Arguments) -> Result<(), ToolError> {
        if let Some(unknown) = arguments
            .keys()
            .find(|key| !self.params.iter().any(|p| p.name == key.as_str()))
        {
            return Err(ToolError::InvalidArguments(format!(
                "unknown parameter `{unknown}`"
            )));
        }

        for param in &self.params {
            match arguments.get(&*param.name).filter(|v| !v.is_null()) {
                None if param.required => {
                    return Err(ToolError::InvalidArguments(format!(
                        "missing required parameter `{}`",
                        param.name
                    )));
                }
                Some(value) if !param.ty.accepts(value) => {
                    return Err(ToolError::InvalidArguments(format!(
                        "parameter `{}` must be {}",
                        param.name,
                        param.ty.as_str()
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSpec")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// A non-blank string argument, trimmed.
pub fn string_arg<'a>(arguments: &'a Arguments, name: &str) -> Option<&'a str> {
    arguments
        .get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
