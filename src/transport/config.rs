use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the pull and push transports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Pull request deadline in seconds (default: 10)
    pub timeout_secs: u64,

    /// User agent sent with pull requests
    pub user_agent: String,

    /// First reconnect delay for the streaming channel in milliseconds (default: 1000)
    pub reconnect_base_delay_ms: u64,

    /// Upper bound for the reconnect delay in seconds (default: 60)
    pub max_reconnect_delay_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: concat!("notestream/", env!("CARGO_PKG_VERSION")).to_string(),
            reconnect_base_delay_ms: 1000,
            max_reconnect_delay_secs: 60,
        }
    }
}

impl TransportConfig {
    /// Get the pull request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn reconnect_base_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_base_delay_ms)
    }

    pub fn max_reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.max_reconnect_delay_secs)
    }
}
