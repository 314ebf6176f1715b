//! Relay configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Upper bound on one join attempt before it is reported failed.
    /// There is no automatic retry; a failed join is retried only on
    /// explicit caller action.
    pub join_timeout_secs: u64,
}

impl RelayConfig {
    pub fn join_timeout(&self) -> Duration {
        Duration::from_secs(self.join_timeout_secs)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            join_timeout_secs: 10,
        }
    }
}
