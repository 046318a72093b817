use sidekick_graph::END;

use crate::state::SidekickState;

pub const WORKER: &str = "worker";
pub const TOOLS: &str = "tools";
pub const EVALUATOR: &str = "evaluator";

/// Positions of the Sidekick state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    Worker,
    ToolExec,
    Evaluator,
    Done,
}

impl Route {
    /// Graph node name for this position; `Done` maps to [`END`].
    pub fn node_name(self) -> &'static str {
        match self {
            Route::Worker => WORKER,
            Route::ToolExec => TOOLS,
            Route::Evaluator => EVALUATOR,
            Route::Done => END,
        }
    }
}

/// After the worker: tools when the latest message requests any, otherwise
/// the evaluator.
pub fn worker_router(state: &SidekickState) -> Route {
    match state.last_message() {
        Some(message) if message.has_tool_calls() => Route::ToolExec,
        _ => Route::Evaluator,
    }
}

/// After the evaluator: stop once the criterion is met or the user must
/// answer, otherwise hand the feedback back to the worker.
pub fn route_based_on_evaluation(state: &SidekickState) -> Route {
    if state.success_criteria_met || state.user_input_needed {
        Route::Done
    } else {
        Route::Worker
    }
}
