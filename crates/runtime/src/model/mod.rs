pub mod errors;
pub mod transcript;
pub mod types;

pub use errors::ModelError;
pub use transcript::Transcript;
pub use types::{Arguments, Decision, HistoryEntry, Role, ToolCall, ToolOutcome, ToolResult, Turn};
