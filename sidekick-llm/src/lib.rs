//! Adapters from [`sidekick_core::ToolCallingLlm`] to hosted chat models.

pub mod openai_compatible;

pub use openai_compatible::{OpenAiCompatibleBuilder, OpenAiCompatibleClient};
pub use sidekick_core::{LlmRequest, LlmResponse, Message, Role, ToolCall, ToolChoice, ToolSpec};
