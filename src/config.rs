//! Configuration management for multirate limiters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{MultirateError, Result};
use crate::ratelimit::{RateLimiter, Window};

/// Configuration of one limiter: its windows by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Map of window name to window configuration
    #[serde(default)]
    pub windows: BTreeMap<String, WindowConfig>,
}

/// Configuration of a single window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Interval length in milliseconds
    pub interval_ms: u64,
    /// Permits granted per interval
    pub capacity: u32,
}

impl WindowConfig {
    /// Get the interval as a duration.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl LimiterConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading limiter configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| MultirateError::Config(format!("Failed to parse limiter config: {}", e)))
    }

    /// Build a limiter from this configuration.
    pub fn build(&self) -> Result<RateLimiter> {
        let mut windows = Vec::with_capacity(self.windows.len());

        for (name, window) in &self.windows {
            if window.capacity == 0 {
                return Err(MultirateError::Config(format!(
                    "window '{}' must have a capacity greater than zero",
                    name
                )));
            }
            windows.push((name.clone(), Window::new(window.interval(), window.capacity)));
        }

        RateLimiter::new(windows)
    }
}
