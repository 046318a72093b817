/// Knobs for a [`crate::Sidekick`].
///
/// An empty model name defers to the default model of the client.
#[derive(Clone, Debug)]
pub struct SidekickConfig {
    pub max_steps: usize,
    pub worker_model: String,
    pub evaluator_model: String,
}

impl Default for SidekickConfig {
    fn default() -> Self {
        Self {
            max_steps: 25,
            worker_model: String::new(),
            evaluator_model: String::new(),
        }
    }
}
