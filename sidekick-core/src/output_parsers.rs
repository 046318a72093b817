use std::marker::PhantomData;

use serde::de::DeserializeOwned;

use crate::{LlmResponse, SidekickError};

/// Extracts a typed record from an [`LlmResponse`].
///
/// A matching tool call's arguments win; otherwise the content is parsed as
/// JSON, with markdown code fences stripped. An unbound parser matches the
/// first call, one built with [`for_tool`](Self::for_tool) only calls to
/// that tool.
#[derive(Clone, Debug, Default)]
pub struct StructuredOutputParser<T> {
    tool_name: Option<String>,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned> StructuredOutputParser<T> {
    pub fn new() -> Self {
        Self {
            tool_name: None,
            _marker: PhantomData,
        }
    }

    pub fn for_tool(name: impl Into<String>) -> Self {
        Self {
            tool_name: Some(name.into()),
            _marker: PhantomData,
        }
    }

    pub fn parse(&self, response: &LlmResponse) -> Result<T, SidekickError> {
        let call = match &self.tool_name {
            Some(name) => response.tool_calls.iter().find(|call| &call.name == name),
            None => response.tool_calls.first(),
        };
        if let Some(call) = call {
            return serde_json::from_value(call.args.clone()).map_err(|err| {
                SidekickError::ParseFailed {
                    output: call.args.to_string(),
                    reason: err.to_string(),
                }
            });
        }

        let cleaned = strip_code_fence(&response.content);
        serde_json::from_str(cleaned).map_err(|err| SidekickError::ParseFailed {
            output: response.content.clone(),
            reason: err.to_string(),
        })
    }
}

fn strip_code_fence(content: &str) -> &str {
    let content = content.trim();
    if let Some(rest) = content.strip_prefix("```json") {
        rest.trim_end_matches("```").trim()
    } else if let Some(rest) = content.strip_prefix("```") {
        rest.trim_end_matches("```").trim()
    } else {
        content
    }
}
