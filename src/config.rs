//! Tuning for the feed and chat views.

use std::time::Duration;

use serde::Deserialize;

/// View configuration.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// use snap_lifecycle::Config;
///
/// let config = Config::from_json(r#"{ "max_message_len": 280 }"#).unwrap();
/// assert_eq!(config.max_message_len, 280);
/// assert_eq!(config.unknown_sender_label, "Unknown sender");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Label rendered when a snap's sender profile cannot be resolved.
    pub unknown_sender_label: String,
    /// Upper bound for a chat message, in characters.
    pub max_message_len: usize,
    /// How long `wait_results` polls between checks, in milliseconds.
    pub result_poll_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            unknown_sender_label: "Unknown sender".to_string(),
            max_message_len: 1000,
            result_poll_ms: 5,
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_unknown_sender_label(mut self, label: impl Into<String>) -> Self {
        self.unknown_sender_label = label.into();
        self
    }

    pub fn with_max_message_len(mut self, max: usize) -> Self {
        self.max_message_len = max;
        self
    }

    pub fn result_poll_interval(&self) -> Duration {
        Duration::from_millis(self.result_poll_ms)
    }
}
