use std::collections::HashMap;
use std::sync::Arc;

use sidekick_core::{
    GraphState, LlmRequest, Message, SidekickError, StateUpdate, ToolCallingLlm, ToolSpec, Value,
};
use sidekick_graph::{GraphContext, GraphNode};
use sidekick_prompt::PromptTemplate;

use crate::state::{upsert_system_message, SidekickState, SidekickUpdate};

const WORKER_PROMPT: &str = "You are a helpful assistant that can use tools to complete tasks.
You keep working on a task until either you have a question or clarification for the user, or the success criteria is met.
This is the success criteria:
{{success_criteria}}
You should reply either with a question for the user about this assignment, or with your final response.
If you have a question for the user, you need to reply by clearly stating your question. An example might be:

Question: please clarify whether you want a summary or a detailed answer

If you've finished, reply with the final answer, and don't ask a question; simply reply with the answer.
";

const FEEDBACK_PROMPT: &str = "
Previously you thought you completed the assignment, but your reply was rejected because the success criteria was not met.
Here is the feedback on why this was rejected:
{{feedback}}
With this feedback, please continue the assignment, ensuring that you meet the success criteria or have a question for the user.";

/// Produces the next assistant turn.
///
/// The system instruction is rebuilt from the current criterion and
/// feedback on every call. The node returns the model reply plus the new
/// instruction; the state reducer keeps the single system entry in sync.
pub struct WorkerNode {
    llm: Arc<dyn ToolCallingLlm>,
    tools: Vec<ToolSpec>,
    model: String,
    prompt: PromptTemplate,
    feedback_prompt: PromptTemplate,
}

impl WorkerNode {
    pub fn new(llm: Arc<dyn ToolCallingLlm>, tools: Vec<ToolSpec>) -> Self {
        Self {
            llm,
            tools,
            model: String::new(),
            prompt: PromptTemplate::new(WORKER_PROMPT),
            feedback_prompt: PromptTemplate::new(FEEDBACK_PROMPT),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Renders the worker instruction for `state`.
    pub fn system_prompt(&self, state: &SidekickState) -> Result<String, SidekickError> {
        let mut vars = HashMap::new();
        vars.insert(
            "success_criteria".to_string(),
            Value::String(state.success_criteria.clone()),
        );
        let mut prompt = self.prompt.render(&vars)?;
        if let Some(feedback) = state.feedback_on_work.as_deref().filter(|f| !f.is_empty()) {
            vars.insert("feedback".to_string(), Value::String(feedback.to_string()));
            prompt.push_str(&self.feedback_prompt.render(&vars)?);
        }
        Ok(prompt)
    }
}

#[async_trait::async_trait]
impl GraphNode<SidekickState> for WorkerNode {
    async fn invoke_with_context(
        &self,
        input: GraphState<SidekickState>,
        context: &GraphContext,
    ) -> Result<StateUpdate<SidekickState>, SidekickError> {
        let state = input.data;
        let system_prompt = self.system_prompt(&state)?;
        let mut messages = state.messages;
        upsert_system_message(&mut messages, system_prompt.clone());

        tracing::debug!(
            step = context.step,
            messages = messages.len(),
            tools = self.tools.len(),
            "worker invoking model"
        );
        let response = self
            .llm
            .invoke(LlmRequest {
                model: self.model.clone(),
                messages,
                tools: self.tools.clone(),
                tool_choice: None,
            })
            .await?;

        let reply = Message::from(response);
        if reply.has_tool_calls() {
            tracing::debug!(calls = reply.tool_calls.len(), "worker requested tools");
        }
        Ok(StateUpdate::new(SidekickUpdate {
            messages: vec![reply],
            system_prompt: Some(system_prompt),
            ..Default::default()
        }))
    }
}
