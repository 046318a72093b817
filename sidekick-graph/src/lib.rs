mod config;
mod error;
mod graph;
mod observer;
mod reducer;
mod tool_node;

pub use config::{ExecutionConfig, ExecutionOptions};
pub use error::GraphError;
pub use graph::{ExecutableGraph, GraphBuilder, GraphContext, GraphNode};
pub use observer::Observer;
pub use reducer::{AppendVec, Override};
pub use tool_node::{HasToolCalls, ToolNode};

pub use sidekick_core::{
    Checkpoint, CheckpointMetadata, Checkpointer, GraphState, HistoryCheckpointer,
    InMemoryCheckpointer, StateSchema, StateUpdate,
};

/// Virtual node that marks where a run begins.
pub const START: &str = "__start__";
/// Virtual node that marks where a run stops.
pub const END: &str = "__end__";
