use std::time::Duration;

use common::utils::config::AppConfig;

#[derive(Debug, Clone)]
pub struct JobSettings {
    /// Retention window restarted by every record write.
    pub ttl: Duration,
    /// Upper bound on a single search call.
    pub search_timeout: Duration,
    /// Attempts for the terminal record write before giving up.
    pub terminal_write_attempts: usize,
}

impl JobSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            ttl: config.job_ttl(),
            search_timeout: config.search_timeout(),
            ..Self::default()
        }
    }
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(600),
            search_timeout: Duration::from_secs(300),
            terminal_write_attempts: 3,
        }
    }
}
