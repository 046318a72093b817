use std::sync::Arc;

use sidekick_core::{Checkpointer, Tool, ToolCallingLlm};
use sidekick_graph::{
    ExecutableGraph, ExecutionConfig, GraphBuilder, GraphError, Observer, ToolNode, START,
};

use crate::config::SidekickConfig;
use crate::evaluator::{EvaluatorNode, Judge};
use crate::routing::{route_based_on_evaluation, worker_router, EVALUATOR, TOOLS, WORKER};
use crate::state::SidekickState;
use crate::worker::WorkerNode;

/// Wires worker, tools and evaluator into the Sidekick graph.
///
/// Cycle detection is off: worker/tools and worker/evaluator loops are the
/// normal shape of a run. `config.max_steps` bounds them instead.
pub fn build_sidekick_graph<C>(
    config: &SidekickConfig,
    llm: Arc<dyn ToolCallingLlm>,
    judge: Arc<dyn Judge>,
    tools: Vec<Arc<dyn Tool>>,
    checkpointer: C,
    observer: Option<Arc<dyn Observer>>,
) -> Result<ExecutableGraph<SidekickState>, GraphError>
where
    C: Checkpointer<SidekickState> + 'static,
{
    let tool_node = ToolNode::new(tools)?;
    let worker = WorkerNode::new(llm, tool_node.specs().to_vec()).with_model(&config.worker_model);

    let mut builder = GraphBuilder::<SidekickState>::new()
        .add_node(WORKER, worker)
        .add_node(TOOLS, tool_node)
        .add_node(EVALUATOR, EvaluatorNode::new(judge))
        .add_edge(START, WORKER)
        .add_conditional_edge(WORKER, |state| {
            worker_router(&state.data).node_name().to_string()
        })
        .add_edge(TOOLS, WORKER)
        .add_conditional_edge(EVALUATOR, |state| {
            route_based_on_evaluation(&state.data)
                .node_name()
                .to_string()
        })
        .with_config(ExecutionConfig::looping(config.max_steps))
        .with_checkpointer(checkpointer);
    if let Some(observer) = observer {
        builder = builder.with_observer(observer);
    }
    builder.build()
}
