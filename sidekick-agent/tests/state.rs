use sidekick_agent::{SidekickState, SidekickUpdate};
use sidekick_core::{Message, Role, StateSchema};

#[test]
fn new_state_starts_cleared() {
    let state = SidekickState::new("task", "criteria");
    assert_eq!(state.messages, vec![Message::user("task")]);
    assert_eq!(state.success_criteria, "criteria");
    assert_eq!(state.feedback_on_work, None);
    assert!(!state.success_criteria_met);
    assert!(!state.user_input_needed);
}

#[test]
fn messages_append_and_scalars_replace() {
    let state = SidekickState::new("task", "criteria");
    let next = SidekickState::apply(
        &state,
        SidekickUpdate {
            messages: vec![Message::assistant("answer")],
            feedback_on_work: Some(Some("needs units".to_string())),
            success_criteria_met: Some(false),
            user_input_needed: Some(true),
            ..Default::default()
        },
    );
    assert_eq!(next.messages.len(), 2);
    assert_eq!(next.messages[1].content, "answer");
    assert_eq!(next.success_criteria, "criteria");
    assert_eq!(next.feedback_on_work.as_deref(), Some("needs units"));
    assert!(next.user_input_needed);
}

#[test]
fn absent_fields_leave_state_untouched() {
    let mut state = SidekickState::new("task", "criteria");
    state.feedback_on_work = Some("keep".to_string());
    state.success_criteria_met = true;
    let next = SidekickState::apply(&state, SidekickUpdate::default());
    assert_eq!(next, state);
}

#[test]
fn turn_update_clears_feedback_and_flags() {
    let mut state = SidekickState::new("first", "old criteria");
    state.feedback_on_work = Some("stale".to_string());
    state.success_criteria_met = true;
    state.user_input_needed = true;

    let next = SidekickState::apply(&state, SidekickUpdate::turn("second", "new criteria"));
    assert_eq!(next.messages.last(), Some(&Message::user("second")));
    assert_eq!(next.success_criteria, "new criteria");
    assert_eq!(next.feedback_on_work, None);
    assert!(!next.success_criteria_met);
    assert!(!next.user_input_needed);
}

#[test]
fn system_prompt_is_kept_single_at_head() {
    let state = SidekickState::new("task", "criteria");
    let once = SidekickState::apply(
        &state,
        SidekickUpdate {
            messages: vec![Message::assistant("a")],
            system_prompt: Some("v1".to_string()),
            ..Default::default()
        },
    );
    let twice = SidekickState::apply(
        &once,
        SidekickUpdate {
            messages: vec![Message::assistant("b")],
            system_prompt: Some("v2".to_string()),
            ..Default::default()
        },
    );
    assert_eq!(twice.system_messages().count(), 1);
    assert_eq!(twice.messages[0].role, Role::System);
    assert_eq!(twice.messages[0].content, "v2");
    let contents: Vec<&str> = twice.messages[1..].iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, ["task", "a", "b"]);
}

#[test]
fn into_update_rebuilds_state_from_default() {
    let mut state = SidekickState::new("task", "criteria");
    state.messages.insert(0, Message::system("sys"));
    state.feedback_on_work = Some("fb".to_string());
    state.user_input_needed = true;
    let rebuilt = SidekickState::apply(&SidekickState::default(), state.clone().into_update());
    assert_eq!(rebuilt, state);
}

#[test]
fn update_serializes_with_optional_fields() {
    let update: SidekickUpdate = serde_json::from_str(r#"{"success_criteria_met": true}"#).unwrap();
    assert_eq!(update.success_criteria_met, Some(true));
    assert!(update.messages.is_empty());
    assert_eq!(update.feedback_on_work, None);
}
