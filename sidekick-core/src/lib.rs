mod checkpoint;
mod error;
mod llm;
mod output_parsers;
mod state;
mod tool;
mod value;

pub use checkpoint::{
    Checkpoint, CheckpointMetadata, Checkpointer, HistoryCheckpointer, InMemoryCheckpointer,
};
pub use error::SidekickError;
pub use llm::{
    LlmRequest, LlmResponse, Message, Role, ToolCall, ToolCallingLlm, ToolChoice, ToolSpec,
};
pub use output_parsers::StructuredOutputParser;
pub use state::{GraphState, StateSchema, StateUpdate};
pub use tool::{Tool, ToolError, TOOL_ERROR_PREFIX};
pub use value::Value;
