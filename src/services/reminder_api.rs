//! HTTP client for the reminder persistence endpoint.

use async_trait::async_trait;
use serde_json::Value;

use crate::config::AssistConfig;
use crate::error::ServiceError;

use super::{ReminderRecord, ReminderStore};

/// POSTs reminder opt-ins to the backend's `/api/save-reminder` endpoint.
pub struct HttpReminderStore {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpReminderStore {
    pub fn new(config: &AssistConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ServiceError::RequestFailed {
                service: "reminder",
                reason: e.to_string(),
            })?;
        Ok(Self {
            endpoint: config.reminder_api_url.clone(),
            client,
        })
    }
}

#[async_trait]
impl ReminderStore for HttpReminderStore {
    async fn save(&self, record: &ReminderRecord) -> Result<(), ServiceError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(record)
            .send()
            .await
            .map_err(|e| ServiceError::RequestFailed {
                service: "reminder",
                reason: e.to_string(),
            })?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        let success = body
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        if status.is_success() && success {
            tracing::info!("Reminder saved");
            return Ok(());
        }

        let message = body
            .get("error")
            .or_else(|| body.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("Gagal menyimpan maklumat.")
            .to_string();
        tracing::warn!(%status, message, "Reminder save rejected");
        Err(ServiceError::Rejected {
            service: "reminder",
            message,
        })
    }
}
