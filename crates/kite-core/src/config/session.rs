//! Session registry configuration.

use serde::{Deserialize, Serialize};

/// Session registry and sweep configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Interval of the background sweep that marks expired online-user rows
    /// offline, in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

fn default_sweep_interval() -> u64 {
    300
}
