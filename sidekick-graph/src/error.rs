use sidekick_core::SidekickError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("checkpoint failed: {0}")]
    Checkpoint(String),
    #[error("node '{node}' failed: {source}")]
    NodeFailed {
        node: String,
        #[source]
        source: SidekickError,
    },
    #[error("missing node: {node}")]
    MissingNode { node: String },
    #[error("graph has no entry node")]
    MissingEntry,
    #[error("invalid edge to '{node}'")]
    InvalidEdge { node: String },
    #[error("duplicate tool name: {0}")]
    DuplicateToolName(String),
    #[error("Max steps exceeded: reached {reached}, limit {max}")]
    MaxStepsExceeded { max: usize, reached: usize },
    #[error("Cycle detected: node '{node}' repeated in recent window")]
    CycleDetected { node: String, recent: Vec<String> },
    #[error("nothing to resume for thread '{thread_id}'")]
    NothingToResume { thread_id: String },
}

impl GraphError {
    /// The node error behind a failed step, if that is what this is.
    pub fn node_source(&self) -> Option<&SidekickError> {
        match self {
            GraphError::NodeFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<GraphError> for SidekickError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::NodeFailed { source, .. } => source,
            GraphError::Checkpoint(reason) => SidekickError::CheckpointFailed(reason),
            other => SidekickError::Custom(other.to_string()),
        }
    }
}
