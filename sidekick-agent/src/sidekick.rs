use std::sync::Arc;

use sidekick_core::{
    Checkpointer, CheckpointMetadata, HistoryCheckpointer, InMemoryCheckpointer, SidekickError,
    Tool, ToolCallingLlm,
};
use sidekick_graph::{ExecutableGraph, Observer};

use crate::config::SidekickConfig;
use crate::evaluator::{Judge, LlmJudge};
use crate::graph::build_sidekick_graph;
use crate::state::{SidekickState, SidekickUpdate};

/// Outcome of one conversation turn.
#[derive(Clone, Debug)]
pub struct SidekickReply {
    /// The worker's final message for this turn.
    pub answer: String,
    /// The evaluator's feedback on that message.
    pub feedback: String,
    pub state: SidekickState,
}

impl SidekickReply {
    fn from_state(state: SidekickState) -> Self {
        let mut tail = state.messages.iter().rev().map(|m| m.content.clone());
        let feedback = tail.next().unwrap_or_default();
        let answer = tail.next().unwrap_or_default();
        Self {
            answer,
            feedback,
            state,
        }
    }
}

/// Worker/evaluator agent with per-thread memory.
///
/// Every completed step is checkpointed under the caller's thread id, so a
/// later turn on the same id continues the conversation and a failed turn
/// can be retried with [`Sidekick::resume`].
pub struct Sidekick {
    graph: ExecutableGraph<SidekickState>,
    checkpointer: InMemoryCheckpointer<SidekickState>,
}

impl Sidekick {
    pub fn builder() -> SidekickBuilder {
        SidekickBuilder::default()
    }

    /// Runs one turn: `message` is appended to the thread's history, the
    /// criterion replaces the previous one, and feedback and flags start
    /// cleared.
    pub async fn run(
        &self,
        message: impl Into<String>,
        success_criteria: impl Into<String>,
        thread_id: &str,
    ) -> Result<SidekickReply, SidekickError> {
        let state = self
            .invoke(SidekickUpdate::turn(message, success_criteria), thread_id)
            .await?;
        Ok(SidekickReply::from_state(state))
    }

    /// Folds `input` into the thread's latest state and runs to completion.
    pub async fn invoke(
        &self,
        input: SidekickUpdate,
        thread_id: &str,
    ) -> Result<SidekickState, SidekickError> {
        let state = self.graph.invoke_with_thread(input, thread_id).await?;
        Ok(state.data)
    }

    /// Retries a turn that failed mid-run, starting at the step that failed.
    pub async fn resume(&self, thread_id: &str) -> Result<SidekickReply, SidekickError> {
        let state = self.graph.resume(thread_id).await?;
        Ok(SidekickReply::from_state(state.data))
    }

    /// Latest saved state of a thread.
    pub async fn state(&self, thread_id: &str) -> Result<Option<SidekickState>, SidekickError> {
        let checkpoint = self.checkpointer.load(thread_id).await?;
        Ok(checkpoint.map(|checkpoint| checkpoint.state.data))
    }

    /// One entry per completed step of the thread, oldest first.
    pub async fn history(&self, thread_id: &str) -> Result<Vec<CheckpointMetadata>, SidekickError> {
        self.checkpointer.list_checkpoints(thread_id).await
    }

    /// Allocates a fresh thread id; nothing carries over from earlier ones.
    pub fn reset(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

#[derive(Default)]
pub struct SidekickBuilder {
    llm: Option<Arc<dyn ToolCallingLlm>>,
    judge: Option<Arc<dyn Judge>>,
    tools: Vec<Arc<dyn Tool>>,
    config: SidekickConfig,
    observer: Option<Arc<dyn Observer>>,
}

impl SidekickBuilder {
    pub fn llm(mut self, llm: Arc<dyn ToolCallingLlm>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Overrides the default judge, an [`LlmJudge`] over the worker's model.
    pub fn judge(mut self, judge: Arc<dyn Judge>) -> Self {
        self.judge = Some(judge);
        self
    }

    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn tools(mut self, tools: Vec<Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn config(mut self, config: SidekickConfig) -> Self {
        self.config = config;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> Result<Sidekick, SidekickError> {
        let llm = self
            .llm
            .ok_or_else(|| SidekickError::InvalidConfig("a language model is required".to_string()))?;
        if self.config.max_steps == 0 {
            return Err(SidekickError::InvalidConfig(
                "max_steps must be at least 1".to_string(),
            ));
        }
        let judge: Arc<dyn Judge> = match self.judge {
            Some(judge) => judge,
            None => Arc::new(
                LlmJudge::new(llm.clone()).with_model(self.config.evaluator_model.clone()),
            ),
        };
        let checkpointer = InMemoryCheckpointer::new();
        let graph = build_sidekick_graph(
            &self.config,
            llm,
            judge,
            self.tools,
            checkpointer.clone(),
            self.observer,
        )?;
        Ok(Sidekick {
            graph,
            checkpointer,
        })
    }
}
