//! Year Resolution Sub-flow — candidate haul years with a static fallback.

use crate::config::AssistConfig;
use crate::services::CalendarService;
use crate::session::CalendarSystem;

/// Candidate years for the year-choice step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearOptions {
    /// Most recent first, capped to the configured maximum.
    pub years: Vec<String>,
    /// True when the static fallback list was substituted.
    pub fallback: bool,
}

/// Resolve the year choices for a calendar system.
///
/// A single failed attempt falls back immediately, with no retry — the
/// fallback list exists so the user is never blocked by a calendar outage.
pub async fn resolve_year_options(
    service: &dyn CalendarService,
    config: &AssistConfig,
    calendar: CalendarSystem,
) -> YearOptions {
    match service.list_years(calendar).await {
        Ok(mut years) if !years.is_empty() => {
            years.truncate(config.max_year_options);
            YearOptions {
                years,
                fallback: false,
            }
        }
        Ok(_) => {
            tracing::warn!(calendar = calendar.code(), "Calendar service returned no years");
            YearOptions {
                years: config.fallback_years(calendar).to_vec(),
                fallback: true,
            }
        }
        Err(e) => {
            tracing::warn!(calendar = calendar.code(), error = %e, "Calendar lookup failed");
            YearOptions {
                years: config.fallback_years(calendar).to_vec(),
                fallback: true,
            }
        }
    }
}
