use thiserror::Error;

use crate::{ToolSpec, Value};

/// Marks a tool result that reports a failure instead of an answer.
pub const TOOL_ERROR_PREFIX: &str = "[TOOL ERROR]";

/// Why a tool call produced no answer.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
    #[error("unknown tool")]
    Unknown,
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    /// Tool-result text the worker reads in place of an answer.
    pub fn result_text(&self, tool_name: &str) -> String {
        format!("{TOOL_ERROR_PREFIX} {tool_name}: {self}")
    }
}

/// A named callable the worker may request.
///
/// `parameters` is the JSON schema of the call arguments. An `Err` never
/// aborts a run: the tool executor answers the call with
/// [`ToolError::result_text`] and the worker decides what to do next.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters(&self) -> Value;

    /// What the model is shown for this tool.
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }

    async fn invoke(&self, args: Value) -> Result<Value, ToolError>;
}
