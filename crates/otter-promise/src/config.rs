//! Agent configuration

/// Configuration for an [`Agent`](crate::agent::Agent).
#[derive(Debug, Clone, Default)]
pub struct AgentConfig {
    /// Let `Await` reuse an awaited promise of the intrinsic constructor
    /// instead of wrapping it in a fresh capability.
    /// Default: false
    pub optimize_await: bool,

    /// Maximum number of jobs a single `run_jobs` call may execute.
    /// Default: None (drain until the queue is empty)
    pub max_jobs_per_drain: Option<usize>,
}

impl AgentConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the `Await` fast path.
    pub fn optimize_await(mut self, enabled: bool) -> Self {
        self.optimize_await = enabled;
        self
    }

    /// Bound the number of jobs per drain.
    pub fn max_jobs_per_drain(mut self, max: usize) -> Self {
        self.max_jobs_per_drain = Some(max);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AgentConfig::default();
        assert!(!config.optimize_await);
        assert!(config.max_jobs_per_drain.is_none());
    }

    #[test]
    fn test_builder_methods() {
        let config = AgentConfig::new().optimize_await(true).max_jobs_per_drain(8);
        assert!(config.optimize_await);
        assert_eq!(config.max_jobs_per_drain, Some(8));
    }
}
