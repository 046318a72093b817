use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use sidekick_core::{
    Checkpoint, Checkpointer, GraphState, SidekickError, StateSchema, StateUpdate, Value,
};
use tracing::Instrument;

use crate::config::{ExecutionConfig, ExecutionOptions};
use crate::observer::Observer;
use crate::{GraphError, END, START};

/// Per-step information handed to a node.
#[derive(Clone)]
pub struct GraphContext {
    pub node_id: String,
    pub step: u64,
    pub thread_id: Option<String>,
    pub remaining_steps: Option<usize>,
    pub observer: Option<Arc<dyn Observer>>,
}

#[async_trait::async_trait]
pub trait GraphNode<S: StateSchema>: Send + Sync {
    async fn invoke_with_context(
        &self,
        input: GraphState<S>,
        context: &GraphContext,
    ) -> Result<StateUpdate<S>, SidekickError>;
}

type Router<S> = Arc<dyn Fn(&GraphState<S>) -> String + Send + Sync>;

enum Edge<S: StateSchema> {
    Direct(String),
    Conditional(Router<S>),
}

pub struct GraphBuilder<S: StateSchema> {
    nodes: HashMap<String, Arc<dyn GraphNode<S>>>,
    edges: HashMap<String, Edge<S>>,
    entry: Option<String>,
    config: ExecutionConfig,
    checkpointer: Option<Arc<dyn Checkpointer<S>>>,
    observer: Option<Arc<dyn Observer>>,
}

impl<S: StateSchema> Default for GraphBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: StateSchema> GraphBuilder<S> {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            entry: None,
            config: ExecutionConfig::default(),
            checkpointer: None,
            observer: None,
        }
    }

    pub fn add_node<N>(mut self, name: &str, node: N) -> Self
    where
        N: GraphNode<S> + 'static,
    {
        self.nodes.insert(name.to_string(), Arc::new(node));
        self
    }

    pub fn set_entry(mut self, name: &str) -> Self {
        self.entry = Some(name.to_string());
        self
    }

    /// Adds an unconditional edge. An edge out of [`START`] sets the entry.
    pub fn add_edge(mut self, from: &str, to: &str) -> Self {
        if from == START {
            self.entry = Some(to.to_string());
        } else {
            self.edges
                .insert(from.to_string(), Edge::Direct(to.to_string()));
        }
        self
    }

    /// Adds an edge whose target is chosen from the state after `from` ran.
    /// The router returns a node name or [`END`].
    pub fn add_conditional_edge<F>(mut self, from: &str, router: F) -> Self
    where
        F: Fn(&GraphState<S>) -> String + Send + Sync + 'static,
    {
        self.edges
            .insert(from.to_string(), Edge::Conditional(Arc::new(router)));
        self
    }

    pub fn with_config(mut self, config: ExecutionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_checkpointer<C>(mut self, checkpointer: C) -> Self
    where
        C: Checkpointer<S> + 'static,
    {
        self.checkpointer = Some(Arc::new(checkpointer));
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> Result<ExecutableGraph<S>, GraphError> {
        let entry = self.entry.ok_or(GraphError::MissingEntry)?;
        if !self.nodes.contains_key(&entry) {
            return Err(GraphError::MissingNode { node: entry });
        }
        for (from, edge) in &self.edges {
            if !self.nodes.contains_key(from) {
                return Err(GraphError::MissingNode { node: from.clone() });
            }
            if let Edge::Direct(to) = edge {
                if to != END && !self.nodes.contains_key(to) {
                    return Err(GraphError::InvalidEdge { node: to.clone() });
                }
            }
        }
        Ok(ExecutableGraph {
            nodes: self.nodes,
            edges: self.edges,
            entry,
            config: self.config,
            checkpointer: self.checkpointer,
            observer: self.observer,
        })
    }
}

pub struct ExecutableGraph<S: StateSchema> {
    nodes: HashMap<String, Arc<dyn GraphNode<S>>>,
    edges: HashMap<String, Edge<S>>,
    entry: String,
    config: ExecutionConfig,
    checkpointer: Option<Arc<dyn Checkpointer<S>>>,
    observer: Option<Arc<dyn Observer>>,
}

impl<S: StateSchema> ExecutableGraph<S> {
    /// Runs from the entry node without touching the checkpointer.
    pub async fn invoke_graph(&self, state: GraphState<S>) -> Result<GraphState<S>, GraphError> {
        self.invoke_graph_with_options(state, ExecutionOptions::default())
            .await
    }

    pub async fn invoke_graph_with_options(
        &self,
        state: GraphState<S>,
        options: ExecutionOptions,
    ) -> Result<GraphState<S>, GraphError> {
        let config = self.config.merge(&options);
        let span = tracing::debug_span!("graph_run");
        self.execute(state, self.entry.clone(), None, 0, &config)
            .instrument(span)
            .await
    }

    /// Folds `input` into the latest checkpoint of `thread_id` (or into the
    /// default state when the thread is new) and runs from the entry node.
    pub async fn invoke_with_thread(
        &self,
        input: S::Update,
        thread_id: &str,
    ) -> Result<GraphState<S>, GraphError> {
        self.invoke_with_thread_and_options(input, thread_id, ExecutionOptions::default())
            .await
    }

    pub async fn invoke_with_thread_and_options(
        &self,
        input: S::Update,
        thread_id: &str,
        options: ExecutionOptions,
    ) -> Result<GraphState<S>, GraphError> {
        let config = self.config.merge(&options);
        let previous = self.load_checkpoint(thread_id).await?;
        let (base, step) = match previous {
            Some(checkpoint) => (checkpoint.state, checkpoint.step),
            None => (GraphState::new(S::default()), 0),
        };
        let state = base.apply_update(StateUpdate::new(input));
        let span = tracing::info_span!("graph_run", thread_id = %thread_id);
        self.execute(state, self.entry.clone(), Some(thread_id), step, &config)
            .instrument(span)
            .await
    }

    /// Continues an interrupted run from the node its last checkpoint
    /// recorded as next.
    pub async fn resume(&self, thread_id: &str) -> Result<GraphState<S>, GraphError> {
        let checkpoint = self.load_checkpoint(thread_id).await?.ok_or_else(|| {
            GraphError::NothingToResume {
                thread_id: thread_id.to_string(),
            }
        })?;
        let next = checkpoint
            .next
            .clone()
            .ok_or_else(|| GraphError::NothingToResume {
                thread_id: thread_id.to_string(),
            })?;
        let span = tracing::info_span!("graph_resume", thread_id = %thread_id, node = %next);
        self.execute(
            checkpoint.state,
            next,
            Some(thread_id),
            checkpoint.step,
            &self.config,
        )
        .instrument(span)
        .await
    }

    async fn load_checkpoint(&self, thread_id: &str) -> Result<Option<Checkpoint<S>>, GraphError> {
        match &self.checkpointer {
            Some(checkpointer) => checkpointer
                .load(thread_id)
                .await
                .map_err(|err| GraphError::Checkpoint(err.to_string())),
            None => Ok(None),
        }
    }

    async fn execute(
        &self,
        mut state: GraphState<S>,
        start: String,
        thread_id: Option<&str>,
        step_offset: u64,
        config: &ExecutionConfig,
    ) -> Result<GraphState<S>, GraphError> {
        let mut current = start;
        let mut steps = 0usize;
        let mut recent: VecDeque<String> = VecDeque::new();

        while current != END {
            if let Some(max) = config.max_steps {
                if steps >= max {
                    return Err(GraphError::MaxStepsExceeded {
                        max,
                        reached: steps,
                    });
                }
            }
            if config.cycle_detection {
                if recent.contains(&current) {
                    return Err(GraphError::CycleDetected {
                        node: current,
                        recent: recent.into_iter().collect(),
                    });
                }
                recent.push_back(current.clone());
                while recent.len() > config.cycle_window {
                    recent.pop_front();
                }
            }

            let node = self
                .nodes
                .get(&current)
                .ok_or_else(|| GraphError::MissingNode {
                    node: current.clone(),
                })?;
            let step = step_offset + steps as u64 + 1;
            let context = GraphContext {
                node_id: current.clone(),
                step,
                thread_id: thread_id.map(str::to_string),
                remaining_steps: config.max_steps.map(|max| max.saturating_sub(steps + 1)),
                observer: self.observer.clone(),
            };

            if let Some(observer) = &self.observer {
                let input = serde_json::to_value(&state.data).unwrap_or(Value::Null);
                observer.on_node_start(&current, &input).await;
            }
            tracing::debug!(node = %current, step, "entering node");
            let started = Instant::now();

            let update = match node.invoke_with_context(state.clone(), &context).await {
                Ok(update) => update,
                Err(source) => {
                    let error = GraphError::NodeFailed {
                        node: current.clone(),
                        source,
                    };
                    tracing::debug!(node = %current, error = %error, "node failed");
                    if let Some(observer) = &self.observer {
                        observer.on_error(&current, &error).await;
                    }
                    return Err(error);
                }
            };

            if let Some(observer) = &self.observer {
                let output = serde_json::to_value(&update.data).unwrap_or(Value::Null);
                observer
                    .on_node_end(&current, &output, started.elapsed().as_millis())
                    .await;
            }
            state = state.apply_update(update);
            steps += 1;

            let next = self.route(&current, &state)?;
            tracing::debug!(from = %current, to = %next, "routing");
            if let Some(observer) = &self.observer {
                observer.on_route(&current, &next).await;
            }

            if let (Some(checkpointer), Some(thread_id)) = (&self.checkpointer, thread_id) {
                let pending = (next != END).then(|| next.clone());
                let checkpoint = Checkpoint::new(
                    thread_id.to_string(),
                    state.clone(),
                    step,
                    current.clone(),
                    pending,
                );
                checkpointer
                    .save(&checkpoint)
                    .await
                    .map_err(|err| GraphError::Checkpoint(err.to_string()))?;
                tracing::trace!(node = %current, step, "checkpoint saved");
                if let Some(observer) = &self.observer {
                    observer.on_checkpoint_saved(&current, step).await;
                }
            }

            current = next;
        }

        Ok(state)
    }

    fn route(&self, from: &str, state: &GraphState<S>) -> Result<String, GraphError> {
        let next = match self.edges.get(from) {
            Some(Edge::Direct(to)) => to.clone(),
            Some(Edge::Conditional(router)) => router(state),
            None => END.to_string(),
        };
        if next != END && !self.nodes.contains_key(&next) {
            return Err(GraphError::InvalidEdge { node: next });
        }
        Ok(next)
    }
}
