use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sidekick_core::{Message, Role, StateSchema, ToolCall};
use sidekick_graph::{AppendVec, HasToolCalls, Override};

/// Conversation state threaded through every step of a run.
///
/// `messages` only grows, except that it always holds exactly one system
/// entry at index 0 once the worker has run. The scalar fields are replaced
/// wholesale by updates; the two flags are only ever set by the evaluator.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SidekickState {
    pub messages: Vec<Message>,
    pub success_criteria: String,
    pub feedback_on_work: Option<String>,
    pub success_criteria_met: bool,
    pub user_input_needed: bool,
}

impl SidekickState {
    pub fn new(message: impl Into<String>, success_criteria: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::user(message)],
            success_criteria: success_criteria.into(),
            ..Default::default()
        }
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn system_messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.role == Role::System)
    }

    /// Converts the whole state into an update that rebuilds it from empty.
    pub fn into_update(self) -> SidekickUpdate {
        SidekickUpdate {
            messages: self.messages,
            system_prompt: None,
            success_criteria: Some(self.success_criteria),
            feedback_on_work: Some(self.feedback_on_work),
            success_criteria_met: Some(self.success_criteria_met),
            user_input_needed: Some(self.user_input_needed),
        }
    }
}

/// Delta returned by a step.
///
/// `messages` are appended; every `Some` scalar replaces the current value.
/// `feedback_on_work: Some(None)` clears the feedback. `system_prompt`
/// rewrites the single system entry in place.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SidekickUpdate {
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub success_criteria: Option<String>,
    #[serde(default)]
    pub feedback_on_work: Option<Option<String>>,
    #[serde(default)]
    pub success_criteria_met: Option<bool>,
    #[serde(default)]
    pub user_input_needed: Option<bool>,
}

impl SidekickUpdate {
    /// Input for one conversation turn: the new user message, the
    /// criterion, cleared feedback and lowered flags.
    pub fn turn(message: impl Into<String>, success_criteria: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::user(message)],
            system_prompt: None,
            success_criteria: Some(success_criteria.into()),
            feedback_on_work: Some(None),
            success_criteria_met: Some(false),
            user_input_needed: Some(false),
        }
    }
}

impl StateSchema for SidekickState {
    type Update = SidekickUpdate;

    fn apply(current: &Self, update: SidekickUpdate) -> Self {
        let mut messages = AppendVec::merge(&current.messages, update.messages);
        if let Some(prompt) = update.system_prompt {
            upsert_system_message(&mut messages, prompt);
        }
        Self {
            messages,
            success_criteria: Override::merge(&current.success_criteria, update.success_criteria),
            feedback_on_work: Override::merge(&current.feedback_on_work, update.feedback_on_work),
            success_criteria_met: Override::merge(
                &current.success_criteria_met,
                update.success_criteria_met,
            ),
            user_input_needed: Override::merge(
                &current.user_input_needed,
                update.user_input_needed,
            ),
        }
    }
}

impl HasToolCalls for SidekickState {
    fn tool_calls(&self) -> &[ToolCall] {
        match self.messages.last() {
            Some(message) if message.role == Role::Assistant => &message.tool_calls,
            _ => &[],
        }
    }

    fn tool_results(results: Vec<Message>) -> SidekickUpdate {
        SidekickUpdate {
            messages: results,
            ..Default::default()
        }
    }
}

/// Leaves exactly one system entry, at index 0, holding `content`.
///
/// A system entry already at the head is rewritten in place; any other
/// system entries are dropped.
pub fn upsert_system_message(messages: &mut Vec<Message>, content: String) {
    let head_is_system = messages
        .first()
        .is_some_and(|message| message.role == Role::System);
    if head_is_system {
        messages[0].content = content;
        let mut index = 0;
        messages.retain(|message| {
            index += 1;
            index == 1 || message.role != Role::System
        });
    } else {
        messages.retain(|message| message.role != Role::System);
        messages.insert(0, Message::system(content));
    }
}

/// Structured verdict produced by the evaluator.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct EvaluatorOutput {
    /// Feedback on the assistant's response
    pub feedback: String,
    /// Whether the success criteria have been met
    pub success_criteria_met: bool,
    /// True if more input is needed from the user, or clarifications, or the assistant is stuck
    pub user_input_needed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(messages: &[Message]) -> Vec<Role> {
        messages.iter().map(|m| m.role).collect()
    }

    #[test]
    fn upsert_prepends_when_absent() {
        let mut messages = vec![Message::user("hi")];
        upsert_system_message(&mut messages, "sys".to_string());
        assert_eq!(roles(&messages), [Role::System, Role::User]);
        assert_eq!(messages[0].content, "sys");
    }

    #[test]
    fn upsert_rewrites_head_in_place() {
        let mut messages = vec![Message::system("old"), Message::user("hi")];
        upsert_system_message(&mut messages, "new".to_string());
        assert_eq!(roles(&messages), [Role::System, Role::User]);
        assert_eq!(messages[0].content, "new");
    }

    #[test]
    fn upsert_collapses_stray_system_entries() {
        let mut messages = vec![
            Message::user("hi"),
            Message::system("a"),
            Message::assistant("ok"),
            Message::system("b"),
        ];
        upsert_system_message(&mut messages, "only".to_string());
        assert_eq!(roles(&messages), [Role::System, Role::User, Role::Assistant]);
        assert_eq!(messages[0].content, "only");

        let mut headed = vec![Message::system("a"), Message::user("hi"), Message::system("b")];
        upsert_system_message(&mut headed, "only".to_string());
        assert_eq!(roles(&headed), [Role::System, Role::User]);
    }

    #[test]
    fn tool_calls_only_come_from_a_trailing_assistant_message() {
        let mut state = SidekickState::new("task", "criteria");
        assert!(state.tool_calls().is_empty());
        state.messages.push(Message {
            role: Role::Assistant,
            content: String::new(),
            tool_call_id: None,
            tool_calls: vec![ToolCall {
                id: "c1".to_string(),
                name: "search".to_string(),
                args: serde_json::json!({}),
            }],
        });
        assert_eq!(state.tool_calls().len(), 1);
        state.messages.push(Message::tool_result("c1", "done"));
        assert!(state.tool_calls().is_empty());
    }
}
