#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde_json::json;
use sidekick_agent::{EvaluatorOutput, Judge, JudgeRequest};
use sidekick_core::{
    LlmRequest, LlmResponse, SidekickError, Tool, ToolCall, ToolCallingLlm, ToolError, Value,
};

/// Replays canned replies in order and records every request.
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<LlmResponse, SidekickError>>>,
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedLlm {
    pub fn new(replies: Vec<Result<LlmResponse, SidekickError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ToolCallingLlm for ScriptedLlm {
    async fn invoke(&self, request: LlmRequest) -> Result<LlmResponse, SidekickError> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SidekickError::LlmProvider("script exhausted".to_string())))
    }
}

pub fn answer(text: &str) -> Result<LlmResponse, SidekickError> {
    Ok(LlmResponse {
        content: text.to_string(),
        tool_calls: Vec::new(),
    })
}

pub fn call(id: &str, name: &str, args: Value) -> Result<LlmResponse, SidekickError> {
    Ok(LlmResponse {
        content: String::new(),
        tool_calls: vec![ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            args,
        }],
    })
}

/// Returns canned verdicts in order and records what it was asked.
#[derive(Default)]
pub struct ScriptedJudge {
    verdicts: Mutex<VecDeque<Result<EvaluatorOutput, SidekickError>>>,
    pub requests: Mutex<Vec<JudgeRequest>>,
}

impl ScriptedJudge {
    pub fn new(verdicts: Vec<Result<EvaluatorOutput, SidekickError>>) -> Arc<Self> {
        Arc::new(Self {
            verdicts: Mutex::new(verdicts.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<JudgeRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Judge for ScriptedJudge {
    async fn judge(&self, request: JudgeRequest) -> Result<EvaluatorOutput, SidekickError> {
        self.requests.lock().unwrap().push(request);
        self.verdicts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SidekickError::LlmProvider("no verdict left".to_string())))
    }
}

pub fn verdict(feedback: &str, met: bool, needs_input: bool) -> Result<EvaluatorOutput, SidekickError> {
    Ok(EvaluatorOutput {
        feedback: feedback.to_string(),
        success_criteria_met: met,
        user_input_needed: needs_input,
    })
}

/// Looks up a fixed price for a product.
pub struct PriceLookup;

#[async_trait::async_trait]
impl Tool for PriceLookup {
    fn name(&self) -> &str {
        "price_lookup"
    }

    fn description(&self) -> &str {
        "Look up the price of a product"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"product": {"type": "string"}},
            "required": ["product"]
        })
    }

    async fn invoke(&self, args: Value) -> Result<Value, ToolError> {
        let product = args
            .get("product")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("product is required".to_string()))?;
        Ok(Value::String(format!("{product} costs 19.99 USD")))
    }
}

pub fn tools() -> Vec<Arc<dyn Tool>> {
    vec![Arc::new(PriceLookup) as Arc<dyn Tool>]
}

/// Answers every request with the latest user message.
pub struct EchoLlm;

#[async_trait::async_trait]
impl ToolCallingLlm for EchoLlm {
    async fn invoke(&self, request: LlmRequest) -> Result<LlmResponse, SidekickError> {
        let last_user = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == sidekick_core::Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(LlmResponse {
            content: format!("echo: {last_user}"),
            tool_calls: Vec::new(),
        })
    }
}
