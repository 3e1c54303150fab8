//! Tool registry and execution.

pub mod errors;
mod registry;
mod r#trait;
mod types;

pub use errors::ToolError;
pub use r#trait::{FnTool, Tool};
pub use registry::{DEFAULT_TOOL_TIMEOUT, ToolRegistry};
pub use types::{ParamSpec, ParamType, ToolSpec, string_arg};
