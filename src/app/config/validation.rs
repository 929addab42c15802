use super::{Config, ConfigError};
use crate::buffer::{DEFAULT_MAX_BODY_BYTES, DEFAULT_MAX_EVENTS_PER_BATCH};
use url::Url;

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.measurement_id.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "Measurement id must be set".to_string(),
            ));
        }

        if self.api_secret.trim().is_empty() {
            return Err(ConfigError::InvalidConfig("API secret must be set".to_string()));
        }

        Url::parse(&self.endpoint).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid endpoint URL '{}': {}", self.endpoint, e))
        })?;

        Url::parse(&self.debug_endpoint).map_err(|e| {
            ConfigError::InvalidUrl(format!(
                "Invalid debug endpoint URL '{}': {}",
                self.debug_endpoint, e
            ))
        })?;

        // The collector rejects requests with more events than this.
        if self.batch_size == 0 || self.batch_size > DEFAULT_MAX_EVENTS_PER_BATCH {
            return Err(ConfigError::InvalidConfig(format!(
                "Batch size must be between 1 and {DEFAULT_MAX_EVENTS_PER_BATCH}, got {}",
                self.batch_size
            )));
        }

        let max_body_kb = DEFAULT_MAX_BODY_BYTES / 1024;
        if self.max_body_kb == 0 || self.max_body_kb > max_body_kb {
            return Err(ConfigError::InvalidConfig(format!(
                "Maximum body size must be between 1 and {max_body_kb} kB, got {}",
                self.max_body_kb
            )));
        }

        if self.request_timeout_secs == 0 || self.connection_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "Timeouts must be greater than 0".to_string(),
            ));
        }

        self.parsed_user_properties()?;

        Ok(())
    }
}
