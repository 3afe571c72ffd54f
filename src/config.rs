//! Loop configuration
//!
//! Budgets and retry policy for one agent run. Values come from the
//! environment (`.env` supported) with small safe defaults.

use std::env;
use std::time::Duration;
use tracing::warn;

/// Bounded exponential backoff for transient client failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per call (first try included)
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based), doubling each time.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Maximum reasoning steps before the run fails with BudgetExceeded
    pub max_steps: u32,
    /// Upper bound on any single reasoner/tool call
    pub step_timeout: Duration,
    /// Wall-clock budget for the whole run
    pub total_timeout: Duration,
    /// Consecutive recoverable errors tolerated before the run fails
    pub consecutive_error_limit: u32,
    pub retry: RetryPolicy,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: 8,
            step_timeout: Duration::from_secs(30),
            total_timeout: Duration::from_secs(120),
            consecutive_error_limit: 3,
            retry: RetryPolicy::default(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_steps = env_u64("AGENT_MAX_STEPS", defaults.max_steps as u64).max(1) as u32;

        Self {
            max_steps,
            step_timeout: Duration::from_secs(env_u64(
                "AGENT_STEP_TIMEOUT_SECS",
                defaults.step_timeout.as_secs(),
            )),
            total_timeout: Duration::from_secs(env_u64(
                "AGENT_TOTAL_TIMEOUT_SECS",
                defaults.total_timeout.as_secs(),
            )),
            consecutive_error_limit: env_u64(
                "AGENT_CONSECUTIVE_ERROR_LIMIT",
                defaults.consecutive_error_limit as u64,
            )
            .max(1) as u32,
            retry: defaults.retry,
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<u64>() {
            Ok(v) => v,
            Err(_) => {
                warn!(key, value = %raw, "Ignoring unparseable config value");
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.max_steps, 8);
        assert_eq!(config.consecutive_error_limit, 3);
        assert!(config.consecutive_error_limit < config.max_steps);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 4,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
        };

        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for(3), Duration::from_millis(500));
        assert_eq!(policy.delay_for(10), Duration::from_millis(500));
    }
}
