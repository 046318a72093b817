use std::collections::HashMap;
use std::sync::Arc;

use schemars::schema_for;
use sidekick_core::{
    GraphState, LlmRequest, Message, Role, SidekickError, StateUpdate, StructuredOutputParser,
    ToolCallingLlm, ToolChoice, ToolSpec, Value,
};
use sidekick_graph::{GraphContext, GraphNode};
use sidekick_prompt::PromptTemplate;

use crate::state::{EvaluatorOutput, SidekickState, SidekickUpdate};

/// Name of the tool the judging model is asked to call with its verdict.
pub const SUBMIT_EVALUATION: &str = "submit_evaluation";

const EVALUATOR_SYSTEM: &str = "You are an evaluator that determines if a task has been completed successfully by an Assistant.
Assess the Assistant's last response based on the given criteria. Respond with your feedback, and with your decision on whether the success criteria has been met,
and whether more input is needed from the user.";

const EVALUATOR_USER: &str = "You are evaluating a conversation between the User and Assistant. You decide what action to take based on the last response from the Assistant.

The entire conversation with the assistant, with the user's original request and all replies, is:
{{conversation}}

The success criteria for this assignment is:
{{success_criteria}}

And the final response from the Assistant that you are evaluating is:
{{last_response}}

Respond with your feedback, and decide if the success criteria is met by this response.
Also, decide if more user input is required, either because the assistant has a question, needs clarification, or seems to be stuck and unable to answer without help.
";

const PRIOR_FEEDBACK: &str = "
Also, note that in a prior attempt from the Assistant, you provided this feedback: {{feedback}}
If you're seeing the Assistant repeating the same mistakes, then consider responding that user input is required.";

/// Everything a judge sees when grading the worker's latest turn.
#[derive(Clone, Debug, PartialEq)]
pub struct JudgeRequest {
    pub messages: Vec<Message>,
    pub success_criteria: String,
    pub prior_feedback: Option<String>,
}

impl JudgeRequest {
    /// Content of the most recent message, which is the turn under review.
    pub fn last_response(&self) -> &str {
        self.messages
            .last()
            .map(|message| message.content.as_str())
            .unwrap_or_default()
    }
}

/// Produces a complete [`EvaluatorOutput`] or fails; never a partial one.
#[async_trait::async_trait]
pub trait Judge: Send + Sync {
    async fn judge(&self, request: JudgeRequest) -> Result<EvaluatorOutput, SidekickError>;
}

/// Renders user and assistant turns as plain text for the judging prompt.
///
/// Assistant turns that only requested tools show as `[Tools use]`. System
/// and tool entries are left out.
pub fn format_conversation(messages: &[Message]) -> String {
    let mut conversation = String::from("Conversation history:\n\n");
    for message in messages {
        match message.role {
            Role::User => {
                conversation.push_str(&format!("User: {}\n", message.content));
            }
            Role::Assistant => {
                let text = if message.content.is_empty() {
                    "[Tools use]"
                } else {
                    message.content.as_str()
                };
                conversation.push_str(&format!("Assistant: {text}\n"));
            }
            Role::System | Role::Tool => {}
        }
    }
    conversation
}

/// [`Judge`] backed by a tool-calling model.
///
/// The model is offered a single `submit_evaluation` tool whose parameters
/// mirror [`EvaluatorOutput`], and the request forces a call to it. The
/// call's arguments (or, from providers that ignore the forcing, a JSON
/// reply) are parsed into the verdict.
pub struct LlmJudge {
    llm: Arc<dyn ToolCallingLlm>,
    model: String,
    system: String,
    user: PromptTemplate,
    prior_feedback: PromptTemplate,
    parser: StructuredOutputParser<EvaluatorOutput>,
}

impl LlmJudge {
    pub fn new(llm: Arc<dyn ToolCallingLlm>) -> Self {
        Self {
            llm,
            model: String::new(),
            system: EVALUATOR_SYSTEM.to_string(),
            user: PromptTemplate::new(EVALUATOR_USER),
            prior_feedback: PromptTemplate::new(PRIOR_FEEDBACK),
            parser: StructuredOutputParser::for_tool(SUBMIT_EVALUATION),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Tool spec describing the verdict shape.
    pub fn evaluation_tool() -> Result<ToolSpec, SidekickError> {
        let mut parameters = serde_json::to_value(schema_for!(EvaluatorOutput))?;
        if let Value::Object(map) = &mut parameters {
            map.remove("$schema");
            map.remove("title");
        }
        Ok(ToolSpec {
            name: SUBMIT_EVALUATION.to_string(),
            description: "Submit the verdict on the assistant's last response".to_string(),
            parameters,
        })
    }

    /// Builds the system and user messages sent to the judging model.
    pub fn prompt(&self, request: &JudgeRequest) -> Result<Vec<Message>, SidekickError> {
        let mut vars = HashMap::new();
        vars.insert(
            "conversation".to_string(),
            Value::String(format_conversation(&request.messages)),
        );
        vars.insert(
            "success_criteria".to_string(),
            Value::String(request.success_criteria.clone()),
        );
        vars.insert(
            "last_response".to_string(),
            Value::String(request.last_response().to_string()),
        );
        let mut user = self.user.render(&vars)?;
        if let Some(feedback) = request.prior_feedback.as_deref().filter(|f| !f.is_empty()) {
            vars.insert("feedback".to_string(), Value::String(feedback.to_string()));
            user.push_str(&self.prior_feedback.render(&vars)?);
        }
        Ok(vec![Message::system(self.system.clone()), Message::user(user)])
    }
}

#[async_trait::async_trait]
impl Judge for LlmJudge {
    async fn judge(&self, request: JudgeRequest) -> Result<EvaluatorOutput, SidekickError> {
        let response = self
            .llm
            .invoke(LlmRequest {
                model: self.model.clone(),
                messages: self.prompt(&request)?,
                tools: vec![Self::evaluation_tool()?],
                tool_choice: Some(ToolChoice::function(SUBMIT_EVALUATION)),
            })
            .await?;
        self.parser.parse(&response)
    }
}

/// Grades the worker's latest turn and records the verdict.
///
/// Appends one assistant message holding the feedback and replaces the
/// feedback and both flags. A judge failure fails the step with nothing
/// applied.
pub struct EvaluatorNode {
    judge: Arc<dyn Judge>,
}

impl EvaluatorNode {
    pub fn new(judge: Arc<dyn Judge>) -> Self {
        Self { judge }
    }
}

#[async_trait::async_trait]
impl GraphNode<SidekickState> for EvaluatorNode {
    async fn invoke_with_context(
        &self,
        input: GraphState<SidekickState>,
        context: &GraphContext,
    ) -> Result<StateUpdate<SidekickState>, SidekickError> {
        let state = input.data;
        let verdict = self
            .judge
            .judge(JudgeRequest {
                messages: state.messages,
                success_criteria: state.success_criteria,
                prior_feedback: state.feedback_on_work,
            })
            .await?;

        tracing::info!(
            step = context.step,
            success_criteria_met = verdict.success_criteria_met,
            user_input_needed = verdict.user_input_needed,
            "evaluator verdict"
        );
        Ok(StateUpdate::new(SidekickUpdate {
            messages: vec![Message::assistant(verdict.feedback.clone())],
            feedback_on_work: Some(Some(verdict.feedback)),
            success_criteria_met: Some(verdict.success_criteria_met),
            user_input_needed: Some(verdict.user_input_needed),
            ..Default::default()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_skips_system_and_tool_entries() {
        let mut tool_turn = Message::assistant("");
        tool_turn.tool_calls.push(sidekick_core::ToolCall {
            id: "c1".to_string(),
            name: "search".to_string(),
            args: serde_json::json!({}),
        });
        let rendered = format_conversation(&[
            Message::system("instructions"),
            Message::user("Find the price of product X"),
            tool_turn,
            Message::tool_result("c1", "$10"),
            Message::assistant("It costs $10"),
        ]);
        assert_eq!(
            rendered,
            "Conversation history:\n\nUser: Find the price of product X\nAssistant: [Tools use]\nAssistant: It costs $10\n"
        );
    }

    #[test]
    fn evaluation_tool_lists_all_fields() {
        let spec = LlmJudge::evaluation_tool().unwrap();
        assert_eq!(spec.name, SUBMIT_EVALUATION);
        assert!(spec.parameters.get("$schema").is_none());
        let required = spec.parameters["required"].as_array().unwrap();
        for field in ["feedback", "success_criteria_met", "user_input_needed"] {
            assert!(required.iter().any(|v| v == field), "{field} not required");
            assert!(spec.parameters["properties"].get(field).is_some());
        }
    }
}
