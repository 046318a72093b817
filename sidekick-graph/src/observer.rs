use crate::GraphError;
use sidekick_core::Value;

/// Hooks invoked by the runtime around each step.
///
/// Every method has an empty default so implementors pick what they need.
#[async_trait::async_trait]
pub trait Observer: Send + Sync {
    async fn on_node_start(&self, _node_id: &str, _input: &Value) {}
    async fn on_node_end(&self, _node_id: &str, _output: &Value, _duration_ms: u128) {}
    async fn on_route(&self, _from: &str, _to: &str) {}
    async fn on_checkpoint_saved(&self, _node_id: &str, _step: u64) {}
    async fn on_tool_call(&self, _node_id: &str, _tool_name: &str, _args: &Value) {}
    async fn on_tool_result(&self, _node_id: &str, _tool_name: &str, _result: &str) {}
    async fn on_error(&self, _node_id: &str, _error: &GraphError) {}
}
