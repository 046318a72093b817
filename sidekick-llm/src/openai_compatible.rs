//! Generic OpenAI-compatible chat client
//!
//! Works with any provider exposing the `/chat/completions` endpoint in
//! OpenAI's format (OpenAI, Azure proxies, local gateways, ...).

use std::time::Duration;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use sidekick_core::{
    LlmRequest, LlmResponse, Message, Role, SidekickError, ToolCall, ToolCallingLlm, ToolChoice,
    ToolSpec,
};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Serialize, Debug)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Serialize, Debug)]
struct WireMessage {
    role: Role,
    content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Serialize, Deserialize, Debug)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Serialize, Debug)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction,
}

#[derive(Serialize, Debug)]
struct WireFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Deserialize, Debug)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize, Debug)]
struct OpenAiError {
    error: ErrorDetail,
}

#[derive(Deserialize, Debug)]
struct ErrorDetail {
    message: String,
}

fn function_type() -> String {
    "function".to_string()
}

fn to_wire_message(message: Message) -> Result<WireMessage, SidekickError> {
    let tool_calls = message
        .tool_calls
        .into_iter()
        .map(|call| -> Result<WireToolCall, SidekickError> {
            Ok(WireToolCall {
                id: call.id,
                kind: function_type(),
                function: WireFunctionCall {
                    name: call.name,
                    arguments: serde_json::to_string(&call.args)?,
                },
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    if message.role == Role::Tool && message.tool_call_id.is_none() {
        return Err(SidekickError::InvalidConfig(
            "tool message missing tool_call_id".to_string(),
        ));
    }
    let content = if message.role == Role::Assistant && message.content.is_empty() {
        None
    } else {
        Some(message.content)
    };
    Ok(WireMessage {
        role: message.role,
        content,
        tool_calls,
        tool_call_id: message.tool_call_id,
    })
}

fn to_wire_tool(spec: ToolSpec) -> WireTool {
    WireTool {
        kind: "function",
        function: WireFunction {
            name: spec.name,
            description: spec.description,
            parameters: spec.parameters,
        },
    }
}

fn to_wire_tool_choice(choice: ToolChoice) -> serde_json::Value {
    match choice {
        ToolChoice::Auto => serde_json::json!("auto"),
        ToolChoice::None => serde_json::json!("none"),
        ToolChoice::Required => serde_json::json!("required"),
        ToolChoice::Function { name } => serde_json::json!({
            "type": "function",
            "function": { "name": name }
        }),
    }
}

fn from_wire_tool_call(call: WireToolCall) -> Result<ToolCall, SidekickError> {
    let args = if call.function.arguments.trim().is_empty() {
        serde_json::Value::Object(Default::default())
    } else {
        serde_json::from_str(&call.function.arguments).map_err(|err| {
            SidekickError::ParseFailed {
                output: call.function.arguments.clone(),
                reason: err.to_string(),
            }
        })?
    };
    Ok(ToolCall {
        id: call.id,
        name: call.function.name,
        args,
    })
}

#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    http: Client,
    endpoint: String,
    api_key: Option<SecretString>,
    model: String,
    temperature: Option<f32>,
}

impl OpenAiCompatibleClient {
    pub fn builder() -> OpenAiCompatibleBuilder {
        OpenAiCompatibleBuilder::default()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl ToolCallingLlm for OpenAiCompatibleClient {
    async fn invoke(&self, request: LlmRequest) -> Result<LlmResponse, SidekickError> {
        let LlmRequest {
            model,
            messages,
            tools,
            tool_choice,
        } = request;
        let model = if model.is_empty() {
            self.model.clone()
        } else {
            model
        };
        let body = ChatCompletionRequest {
            model,
            messages: messages
                .into_iter()
                .map(to_wire_message)
                .collect::<Result<Vec<_>, _>>()?,
            tools: tools.into_iter().map(to_wire_tool).collect(),
            tool_choice: tool_choice.map(to_wire_tool_choice),
            temperature: self.temperature,
            stream: false,
        };

        let mut http_request = self.http.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            http_request = http_request.bearer_auth(key.expose_secret());
        }
        let response = http_request
            .send()
            .await
            .map_err(|err| SidekickError::LlmProvider(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OpenAiError>(&text)
                .map(|err| err.error.message)
                .unwrap_or(text);
            tracing::warn!(status = %status, "chat completion request failed");
            return Err(SidekickError::LlmProvider(format!("{status}: {message}")));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| SidekickError::LlmProvider(err.to_string()))?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| SidekickError::LlmProvider("no choices returned".to_string()))?;
        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(from_wire_tool_call)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LlmResponse {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
        })
    }
}

#[derive(Default)]
pub struct OpenAiCompatibleBuilder {
    base_url: Option<String>,
    api_key: Option<SecretString>,
    model: Option<String>,
    timeout: Option<Duration>,
    temperature: Option<f32>,
}

impl OpenAiCompatibleBuilder {
    /// Reads `OPENAI_API_KEY`, and optionally `OPENAI_BASE_URL` and
    /// `SIDEKICK_MODEL`.
    pub fn from_env() -> Result<Self, SidekickError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| SidekickError::InvalidConfig("OPENAI_API_KEY is not set".to_string()))?;
        let mut builder = Self::default().api_key(api_key);
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            builder = builder.base_url(base_url);
        }
        if let Ok(model) = std::env::var("SIDEKICK_MODEL") {
            builder = builder.model(model);
        }
        Ok(builder)
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(api_key.into()));
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn build(self) -> Result<OpenAiCompatibleClient, SidekickError> {
        let base = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base = Url::parse(&base)
            .map_err(|err| SidekickError::InvalidConfig(format!("invalid base url: {err}")))?;
        let endpoint = format!("{}/chat/completions", base.as_str().trim_end_matches('/'));

        let http = Client::builder()
            .timeout(self.timeout.unwrap_or(Duration::from_secs(120)))
            .build()
            .map_err(|err| SidekickError::LlmProvider(err.to_string()))?;

        Ok(OpenAiCompatibleClient {
            http,
            endpoint,
            api_key: self.api_key,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: self.temperature,
        })
    }
}
