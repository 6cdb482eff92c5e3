//! Boundary contracts for the external collaborators.
//!
//! The dialog core only sees these traits; the reqwest-backed clients in
//! [`lznk`] and [`reminder_api`] are the production implementations.

pub mod lznk;
pub mod reminder_api;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::ZakatQuery;
use crate::error::ServiceError;
use crate::session::CalendarSystem;

pub use lznk::LznkClient;
pub use reminder_api::HttpReminderStore;

/// Request sent to the computation service. Always anchored to a year and
/// calendar system; the rest is the variant-specific query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeRequest {
    pub year: String,
    pub calendar: CalendarSystem,
    #[serde(flatten)]
    pub query: ZakatQuery,
}

/// Result of a computation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeOutcome {
    /// Zakat due; zero when the nisab is not met.
    pub amount: Decimal,
    pub meets_nisab: bool,
    /// Canonical obligation label resolved by the service.
    pub resolved_type: String,
    /// Renderable result message (opaque to the orchestrator).
    pub message: String,
}

/// A reminder opt-in ready for persistence.
///
/// Field names match the `/api/save-reminder` contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderRecord {
    pub name: String,
    pub ic_number: String,
    pub phone: String,
    pub zakat_type: String,
    pub zakat_amount: Decimal,
    pub year: String,
    /// "H" or "M".
    pub year_type: String,
    pub submitted_at: DateTime<Utc>,
}

/// Candidate-year lookup for the year-choice step.
#[async_trait]
pub trait CalendarService: Send + Sync {
    /// List candidate haul years, most recent first.
    async fn list_years(&self, calendar: CalendarSystem) -> Result<Vec<String>, ServiceError>;
}

/// The zakat arithmetic, external to this core.
#[async_trait]
pub trait ComputationService: Send + Sync {
    async fn calculate(&self, request: &ComputeRequest) -> Result<ComputeOutcome, ServiceError>;

    /// Nisab figures for a year, rendered as a message (nisab-inquiry flow).
    async fn nisab_info(
        &self,
        year: &str,
        calendar: CalendarSystem,
    ) -> Result<String, ServiceError>;
}

/// Persistence for reminder opt-ins.
#[async_trait]
pub trait ReminderStore: Send + Sync {
    async fn save(&self, record: &ReminderRecord) -> Result<(), ServiceError>;
}
