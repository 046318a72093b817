use std::collections::HashMap;
use std::sync::Arc;

use sidekick_core::{
    GraphState, Message, SidekickError, StateSchema, StateUpdate, Tool, ToolCall, ToolError,
    ToolSpec, Value,
};

use crate::graph::{GraphContext, GraphNode};
use crate::GraphError;

/// State that can expose pending tool calls and accept their results.
pub trait HasToolCalls: StateSchema {
    /// Calls requested by the most recent message, in request order.
    fn tool_calls(&self) -> &[ToolCall];

    /// Builds the update that appends the given tool-result messages.
    fn tool_results(results: Vec<Message>) -> Self::Update;
}

/// Executes every pending tool call and answers each with one tool message.
///
/// Unknown tools and tool failures become result text prefixed with
/// `[TOOL ERROR]` so the run continues and the next step can react.
pub struct ToolNode {
    tools: HashMap<String, Arc<dyn Tool>>,
    specs: Vec<ToolSpec>,
}

impl ToolNode {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Result<Self, GraphError> {
        let mut by_name = HashMap::new();
        for tool in tools {
            let name = tool.name().to_string();
            if by_name.contains_key(&name) {
                return Err(GraphError::DuplicateToolName(name));
            }
            by_name.insert(name, tool);
        }
        let mut specs: Vec<ToolSpec> = by_name.values().map(|tool| tool.spec()).collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Self {
            tools: by_name,
            specs,
        })
    }

    /// Specs of every registered tool, sorted by name.
    pub fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    async fn run_call(&self, call: &ToolCall, context: &GraphContext) -> String {
        let Some(tool) = self.tools.get(&call.name) else {
            tracing::warn!(tool = %call.name, "worker requested an unknown tool");
            return ToolError::Unknown.result_text(&call.name);
        };
        if let Some(observer) = &context.observer {
            observer
                .on_tool_call(&context.node_id, &call.name, &call.args)
                .await;
        }
        let content = match tool.invoke(call.args.clone()).await {
            Ok(Value::String(text)) => text,
            Ok(value) => value.to_string(),
            Err(err) => {
                tracing::warn!(tool = %call.name, error = %err, "tool failed");
                err.result_text(&call.name)
            }
        };
        if let Some(observer) = &context.observer {
            observer
                .on_tool_result(&context.node_id, &call.name, &content)
                .await;
        }
        content
    }
}

#[async_trait::async_trait]
impl<S> GraphNode<S> for ToolNode
where
    S: HasToolCalls,
{
    async fn invoke_with_context(
        &self,
        input: GraphState<S>,
        context: &GraphContext,
    ) -> Result<StateUpdate<S>, SidekickError> {
        let calls = input.data.tool_calls();
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            let content = self.run_call(call, context).await;
            results.push(Message::tool_result(call.id.clone(), content));
        }
        Ok(StateUpdate::new(S::tool_results(results)))
    }
}
