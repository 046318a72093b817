/// Safety limits applied to one graph run.
#[derive(Clone, Debug)]
pub struct ExecutionConfig {
    /// Node executions allowed per run; `None` removes the limit.
    pub max_steps: Option<usize>,
    /// Fails the run when a node is entered again within `cycle_window` steps.
    pub cycle_detection: bool,
    pub cycle_window: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_steps: Some(50),
            cycle_detection: true,
            cycle_window: 20,
        }
    }
}

impl ExecutionConfig {
    /// Step limit only, for graphs that revisit nodes on purpose.
    ///
    /// A worker that alternates with its tool executor, or is sent back by an
    /// evaluator, re-enters the same nodes every round; the step limit is
    /// what ends a run that never converges.
    pub fn looping(max_steps: usize) -> Self {
        Self {
            max_steps: Some(max_steps),
            cycle_detection: false,
            ..Self::default()
        }
    }

    /// Applies per-invocation overrides on top of these limits.
    pub fn merge(&self, overrides: &ExecutionOptions) -> Self {
        Self {
            max_steps: overrides.max_steps.or(self.max_steps),
            cycle_detection: overrides.cycle_detection.unwrap_or(self.cycle_detection),
            cycle_window: overrides.cycle_window.unwrap_or(self.cycle_window),
        }
    }
}

/// Per-invocation overrides for [`ExecutionConfig`]; `None` keeps the base.
#[derive(Clone, Debug, Default)]
pub struct ExecutionOptions {
    pub max_steps: Option<usize>,
    pub cycle_detection: Option<bool>,
    pub cycle_window: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_take_precedence() {
        let base = ExecutionConfig::default();
        let merged = base.merge(&ExecutionOptions {
            max_steps: Some(3),
            cycle_detection: Some(false),
            cycle_window: None,
        });
        assert_eq!(merged.max_steps, Some(3));
        assert!(!merged.cycle_detection);
        assert_eq!(merged.cycle_window, 20);
    }

    #[test]
    fn looping_keeps_only_the_step_limit() {
        let config = ExecutionConfig::looping(25);
        assert_eq!(config.max_steps, Some(25));
        assert!(!config.cycle_detection);

        let merged = config.merge(&ExecutionOptions::default());
        assert_eq!(merged.max_steps, Some(25));
        assert!(!merged.cycle_detection);
    }
}
