//! Run configuration loaded from `dripfeed.toml`.
//!
//! Fields absent from the file fall back to defaults matching the original
//! quota (2 calls per 1-second window, one worker). The `TDM_API_KEY`
//! environment variable takes precedence over the file for the API key, and
//! CLI flags take precedence over both.

use std::path::Path;
use std::time::Duration;

use anyhow::{Result, bail};
use serde::Deserialize;

use crate::pipeline::LimiterPolicy;

/// Overrides collected from the command line; `None` leaves the file/default
/// value in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct LimitOverrides {
    pub calls: Option<u32>,
    pub per_secs: Option<u64>,
    pub burst: Option<u32>,
    pub workers: Option<usize>,
    pub max_wait_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Client token for the download service.
    #[serde(default)]
    pub api_key: String,

    /// Maximum calls per rolling window.
    #[serde(default = "default_calls")]
    pub calls: u32,

    /// Window length in seconds.
    #[serde(default = "default_per_secs")]
    pub per_secs: u64,

    /// Maximum instantaneous permits; defaults to `calls` when absent.
    #[serde(default)]
    pub burst: Option<u32>,

    /// Size of the dispatch worker pool.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Upper bound in seconds on one permit wait; unbounded when absent.
    #[serde(default)]
    pub max_wait_secs: Option<u64>,
}

// The original service quota: 2 requests per second.
fn default_calls() -> u32 {
    2
}

fn default_per_secs() -> u64 {
    1
}

fn default_worker_count() -> usize {
    1
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            calls: default_calls(),
            per_secs: default_per_secs(),
            burst: None,
            worker_count: default_worker_count(),
            max_wait_secs: None,
        }
    }
}

impl RunConfig {
    /// Load configuration from `dripfeed.toml` in the current directory,
    /// falling back to defaults if the file does not exist.
    pub fn load() -> Result<Self> {
        let path = Path::new("dripfeed.toml");
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<RunConfig>(&contents)?
        } else {
            Self::default()
        };

        // Environment variable takes precedence over the file for the key.
        if let Ok(key) = std::env::var("TDM_API_KEY")
            && !key.is_empty()
        {
            config.api_key = key;
        }

        Ok(config)
    }

    /// Apply CLI flags on top of whatever the file and environment provided.
    pub fn apply_overrides(&mut self, overrides: LimitOverrides) {
        if let Some(calls) = overrides.calls {
            self.calls = calls;
        }
        if let Some(per_secs) = overrides.per_secs {
            self.per_secs = per_secs;
        }
        if let Some(burst) = overrides.burst {
            self.burst = Some(burst);
        }
        if let Some(workers) = overrides.workers {
            self.worker_count = workers;
        }
        if let Some(max_wait_secs) = overrides.max_wait_secs {
            self.max_wait_secs = Some(max_wait_secs);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.calls == 0 {
            bail!("calls must be at least 1");
        }
        if self.per_secs == 0 {
            bail!("per_secs must be at least 1");
        }
        if self.worker_count == 0 {
            bail!("worker_count must be at least 1");
        }
        if let Some(burst) = self.burst
            && !(1..=self.calls).contains(&burst)
        {
            bail!("burst must be between 1 and calls ({})", self.calls);
        }
        Ok(())
    }

    pub fn limiter_policy(&self) -> LimiterPolicy {
        let mut policy = LimiterPolicy::new(self.calls, Duration::from_secs(self.per_secs));
        if let Some(burst) = self.burst {
            policy = policy.with_burst(burst);
        }
        if let Some(max_wait_secs) = self.max_wait_secs {
            policy = policy.with_max_wait(Duration::from_secs(max_wait_secs));
        }
        policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = RunConfig::default();
        assert_eq!(config.calls, 2);
        assert_eq!(config.per_secs, 1);
        assert_eq!(config.worker_count, 1);
        assert!(config.burst.is_none());
        assert!(config.max_wait_secs.is_none());
        assert!(config.api_key.is_empty());
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            api_key = "tdm-test-123"
            calls = 3
            burst = 1
        "#;
        let config: RunConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api_key, "tdm-test-123");
        assert_eq!(config.calls, 3);
        assert_eq!(config.burst, Some(1));
        assert_eq!(config.per_secs, 1);
        assert_eq!(config.worker_count, 1);
    }

    #[test]
    fn overrides_win_over_file_values() {
        let mut config = RunConfig {
            calls: 3,
            worker_count: 2,
            ..Default::default()
        };
        config.apply_overrides(LimitOverrides {
            calls: Some(5),
            max_wait_secs: Some(30),
            ..Default::default()
        });
        assert_eq!(config.calls, 5);
        assert_eq!(config.worker_count, 2);
        assert_eq!(config.max_wait_secs, Some(30));
    }

    #[test]
    fn validation_rejects_degenerate_values() {
        let config = RunConfig {
            calls: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RunConfig {
            worker_count: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RunConfig {
            calls: 2,
            burst: Some(5),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        assert!(RunConfig::default().validate().is_ok());
    }

    #[test]
    fn limiter_policy_carries_all_fields() {
        let config = RunConfig {
            calls: 3,
            per_secs: 2,
            burst: Some(1),
            max_wait_secs: Some(10),
            ..Default::default()
        };
        let policy = config.limiter_policy();
        assert_eq!(policy.calls, 3);
        assert_eq!(policy.per, Duration::from_secs(2));
        assert_eq!(policy.burst, 1);
        assert_eq!(policy.max_wait, Some(Duration::from_secs(10)));
    }
}
