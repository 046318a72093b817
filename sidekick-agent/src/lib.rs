//! A worker/evaluator agent loop.
//!
//! The worker answers a task (calling tools as needed), the evaluator judges
//! the answer against a caller-supplied success criterion, and the loop
//! repeats with the evaluator's feedback until the criterion is met or the
//! user has to step in.
//!
//! ```text
//! START -> worker -> [tool calls?] -- yes --> tools -> worker
//!                        | no
//!                    evaluator -> [met or needs input?] -- yes --> END
//!                        | no
//!                      worker
//! ```

mod config;
mod evaluator;
mod graph;
mod routing;
mod sidekick;
mod state;
mod worker;

pub use config::SidekickConfig;
pub use evaluator::{
    format_conversation, EvaluatorNode, Judge, JudgeRequest, LlmJudge, SUBMIT_EVALUATION,
};
pub use graph::build_sidekick_graph;
pub use routing::{route_based_on_evaluation, worker_router, Route, EVALUATOR, TOOLS, WORKER};
pub use sidekick::{Sidekick, SidekickBuilder, SidekickReply};
pub use state::{upsert_system_message, EvaluatorOutput, SidekickState, SidekickUpdate};
pub use worker::WorkerNode;
