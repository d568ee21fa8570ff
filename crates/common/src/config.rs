//! Common configuration types for API Gate components.

use serde::{Deserialize, Serialize};

/// Default log filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Observability configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    pub log_level: String,
    /// Enable JSON-formatted logs
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            json_logs: false,
        }
    }
}
