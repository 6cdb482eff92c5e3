//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;
use crate::session::CalendarSystem;

/// Assistant configuration.
#[derive(Debug, Clone)]
pub struct AssistConfig {
    /// Base URL of the LZNK zakat API.
    pub lznk_base_url: String,
    /// Endpoint the reminder opt-in record is POSTed to.
    pub reminder_api_url: String,
    /// Timeout applied to every outbound service call.
    pub request_timeout: Duration,
    /// Maximum number of year choices offered to the user.
    pub max_year_options: usize,
    /// Static Hijrah years offered when the calendar service is unavailable.
    pub fallback_years_hijrah: Vec<String>,
    /// Static Masihi years offered when the calendar service is unavailable.
    pub fallback_years_masihi: Vec<String>,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            lznk_base_url: "https://jom.zakatkedah.com.my".to_string(),
            reminder_api_url: "http://127.0.0.1:5000/api/save-reminder".to_string(),
            request_timeout: Duration::from_secs(10),
            max_year_options: 5,
            fallback_years_hijrah: ["1447", "1446", "1445", "1444"]
                .map(String::from)
                .to_vec(),
            fallback_years_masihi: ["2025", "2024", "2023", "2022"]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl AssistConfig {
    /// Build a config from defaults, overridden by `ZAKIA_*` environment
    /// variables where set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("ZAKIA_LZNK_URL") {
            config.lznk_base_url = url;
        }
        if let Ok(url) = std::env::var("ZAKIA_REMINDER_URL") {
            config.reminder_api_url = url;
        }
        if let Ok(raw) = std::env::var("ZAKIA_TIMEOUT_SECS") {
            let secs: u64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "ZAKIA_TIMEOUT_SECS".to_string(),
                message: format!("not a number: {raw}"),
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    /// The static fallback year list for a calendar system.
    pub fn fallback_years(&self, calendar: CalendarSystem) -> &[String] {
        match calendar {
            CalendarSystem::Hijrah => &self.fallback_years_hijrah,
            CalendarSystem::Masihi => &self.fallback_years_masihi,
        }
    }
}
