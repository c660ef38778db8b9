use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "SUBTRACK_";

/// `SUBTRACK_{key}` if set, else plain `{key}`.
fn env_var(key: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{key}"))
        .or_else(|_| std::env::var(key))
        .ok()
}

/// Main configuration for the schedule engine
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    pub logging: LoggingConfig,
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_json")]
    pub json: bool,
}

/// Thresholds used by status and health reporting.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleConfig {
    /// Days ahead of the renewal date that count as "renewing soon" (default: 7)
    #[serde(default = "default_renewal_lookahead_days")]
    pub renewal_lookahead_days: i64,
    /// Days ahead of the ending date that count as "ending soon" (default: 30)
    #[serde(default = "default_ending_soon_days")]
    pub ending_soon_days: i64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: default_json(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            renewal_lookahead_days: default_renewal_lookahead_days(),
            ending_soon_days: default_ending_soon_days(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_json() -> bool {
    false
}

fn default_renewal_lookahead_days() -> i64 {
    7
}

fn default_ending_soon_days() -> i64 {
    30
}

/// Builder for Config with environment variable support
#[must_use = "builder does nothing until you call build()"]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn with_json_logging(mut self, enabled: bool) -> Self {
        self.config.logging.json = enabled;
        self
    }

    pub fn with_renewal_lookahead_days(mut self, days: i64) -> Self {
        self.config.schedule.renewal_lookahead_days = days;
        self
    }

    pub fn with_ending_soon_days(mut self, days: i64) -> Self {
        self.config.schedule.ending_soon_days = days;
        self
    }

    /// Load configuration from environment variables with SUBTRACK_ prefix
    pub fn from_env(mut self) -> Self {
        if let Some(level) = env_var("LOG_LEVEL") {
            self.config.logging.level = level;
        }
        if let Some(json) = env_var("LOG_JSON") {
            self.config.logging.json = json.parse().unwrap_or(false);
        }
        if let Some(days) = env_var("RENEWAL_LOOKAHEAD_DAYS") {
            if let Ok(d) = days.parse() {
                self.config.schedule.renewal_lookahead_days = d;
            }
        }
        if let Some(days) = env_var("ENDING_SOON_DAYS") {
            if let Ok(d) = days.parse() {
                self.config.schedule.ending_soon_days = d;
            }
        }

        self
    }

    /// Build the configuration, validating all settings
    ///
    /// # Errors
    ///
    /// Returns an error if the log level is unknown or a day threshold is not positive.
    pub fn build(self) -> crate::error::Result<Config> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.config.logging.level.to_lowercase().as_str()) {
            return Err(crate::error::SubtrackError::bad_request(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.config.logging.level,
                valid_log_levels.join(", ")
            )));
        }

        if self.config.schedule.renewal_lookahead_days <= 0 {
            return Err(crate::error::SubtrackError::bad_request(
                "Renewal lookahead must be greater than 0 days",
            ));
        }

        if self.config.schedule.ending_soon_days <= 0 {
            return Err(crate::error::SubtrackError::bad_request(
                "Ending-soon window must be greater than 0 days",
            ));
        }

        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
