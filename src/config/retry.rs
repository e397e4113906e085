//! Retry configuration for upload verification.
//!
//! Provides a configurable automatic retry budget, allowing users to tune
//! retry behavior based on how quickly their server publishes files.

use std::time::Duration;

/// Maximum backoff between upload passes
const MAX_BACKOFF: Duration = Duration::from_secs(3600);

/// Configuration for upload retry behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Automatic upload passes after the first one
    pub file_uploads: u32,

    /// Delay before the first retry; doubles on every further retry
    pub initial_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            file_uploads: 5,
            initial_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryConfig {
    /// Parse retry count from environment variable with clamping to maximum
    ///
    /// # Arguments
    /// * `var_name` - Environment variable name (e.g., "RELEASE_RETRY_UPLOADS")
    /// * `default` - Default value if variable is not set or invalid
    /// * `max` - Maximum allowed value (values above this are clamped)
    fn parse_retry_env(var_name: &str, default: u32, max: u32) -> u32 {
        std::env::var(var_name)
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .map(|v| v.min(max)) // Clamp to max
            .unwrap_or(default)
    }

    /// Create config from environment variables with fallback to defaults
    pub fn from_env() -> Self {
        let backoff_ms = std::env::var("RELEASE_RETRY_BACKOFF_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1000);
        Self {
            file_uploads: Self::parse_retry_env("RELEASE_RETRY_UPLOADS", 5, 20),
            initial_backoff: Duration::from_millis(backoff_ms).min(MAX_BACKOFF),
        }
    }

    /// Delay after the given (1-based) failed pass: `initial * 2^(pass-1)`, capped
    pub fn backoff(&self, pass: u32) -> Duration {
        let factor = 2u32.saturating_pow(pass.saturating_sub(1));
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(MAX_BACKOFF)
            .min(MAX_BACKOFF)
    }

    /// Validate retry counts are reasonable
    pub fn validate(&self) -> Result<(), String> {
        if self.file_uploads > 20 {
            return Err(format!(
                "file_uploads retry count too high: {} (max: 20)",
                self.file_uploads
            ));
        }
        Ok(())
    }
}
