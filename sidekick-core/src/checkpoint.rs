use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::state::{GraphState, StateSchema};
use crate::SidekickError;

/// Snapshot of a thread taken after a completed step.
///
/// `next` names the node the run would have entered after `node`; it is
/// `None` once the run reached its end.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(bound = "S: StateSchema")]
pub struct Checkpoint<S: StateSchema> {
    pub thread_id: String,
    pub state: GraphState<S>,
    pub step: u64,
    pub node: String,
    pub next: Option<String>,
    pub created_at: String,
}

impl<S: StateSchema> Checkpoint<S> {
    pub fn new(
        thread_id: String,
        state: GraphState<S>,
        step: u64,
        node: String,
        next: Option<String>,
    ) -> Self {
        Self {
            thread_id,
            state,
            step,
            node,
            next,
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

#[async_trait::async_trait]
pub trait Checkpointer<S: StateSchema>: Send + Sync {
    async fn save(&self, checkpoint: &Checkpoint<S>) -> Result<(), SidekickError>;
    async fn load(&self, thread_id: &str) -> Result<Option<Checkpoint<S>>, SidekickError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointMetadata {
    pub seq: u64,
    pub node: String,
    pub created_at: String,
}

#[async_trait::async_trait]
pub trait HistoryCheckpointer<S: StateSchema>: Send + Sync {
    async fn list_checkpoints(
        &self,
        thread_id: &str,
    ) -> Result<Vec<CheckpointMetadata>, SidekickError>;
}

/// Per-thread checkpoint history held in memory.
///
/// Threads live in separate shards of a concurrent map, so runs on distinct
/// thread ids do not serialize on one another.
#[derive(Default, Clone)]
pub struct InMemoryCheckpointer<S: StateSchema> {
    inner: Arc<DashMap<String, Vec<Checkpoint<S>>>>,
}

impl<S: StateSchema> InMemoryCheckpointer<S> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
        }
    }

    pub fn thread_count(&self) -> usize {
        self.inner.len()
    }
}

#[async_trait::async_trait]
impl<S: StateSchema> Checkpointer<S> for InMemoryCheckpointer<S> {
    async fn save(&self, checkpoint: &Checkpoint<S>) -> Result<(), SidekickError> {
        self.inner
            .entry(checkpoint.thread_id.clone())
            .or_default()
            .push(checkpoint.clone());
        Ok(())
    }

    async fn load(&self, thread_id: &str) -> Result<Option<Checkpoint<S>>, SidekickError> {
        Ok(self
            .inner
            .get(thread_id)
            .and_then(|history| history.last().cloned()))
    }
}

#[async_trait::async_trait]
impl<S: StateSchema> HistoryCheckpointer<S> for InMemoryCheckpointer<S> {
    async fn list_checkpoints(
        &self,
        thread_id: &str,
    ) -> Result<Vec<CheckpointMetadata>, SidekickError> {
        let metadata = match self.inner.get(thread_id) {
            Some(history) => history
                .iter()
                .map(|cp| CheckpointMetadata {
                    seq: cp.step,
                    node: cp.node.clone(),
                    created_at: cp.created_at.clone(),
                })
                .collect(),
            None => Vec::new(),
        };
        Ok(metadata)
    }
}
