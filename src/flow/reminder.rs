//! Reminder Sub-flow — collects contact details after a qualifying result.
//!
//! A self-contained nested machine: consent offer → name → IC number →
//! phone → submit. It consumes free text only while a field is awaited;
//! anything received outside that window falls through to other handling.

use std::sync::Arc;

use chrono::Utc;

use crate::services::{ReminderRecord, ReminderStore};
use crate::session::{ReminderContext, ReminderField, ReminderSession};
use crate::validate;

use super::event::{ChoiceOption, Reply, StepKey};
use super::CancelFlag;

const CANCEL_KEYWORD: &str = "batal";
const NOTICE_DECLINED: &str = "Baiklah. Terima kasih kerana menggunakan ZAKIA!";
const NOTICE_CANCELLED: &str = "Peringatan dibatalkan. Tiada maklumat disimpan.";
const NOTICE_SAVE_FAILED: &str =
    "Maaf, maklumat anda tidak dapat disimpan buat masa ini. Sila cuba sebentar lagi.";

/// The nested reminder opt-in machine. `session: None` is the idle state.
pub struct ReminderFlow {
    store: Arc<dyn ReminderStore>,
    cancel_flag: CancelFlag,
    session: Option<ReminderSession>,
}

impl ReminderFlow {
    pub fn new(store: Arc<dyn ReminderStore>, cancel_flag: CancelFlag) -> Self {
        Self {
            store,
            cancel_flag,
            session: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// True only while a field answer is expected. While false, free text is
    /// not consumed by this sub-flow.
    pub fn awaiting_input(&self) -> bool {
        matches!(&self.session, Some(s) if s.awaiting != ReminderField::None)
    }

    /// Take over after a qualifying result: store the context snapshot and
    /// present the consent offer.
    pub fn offer(&mut self, context: ReminderContext) -> Vec<Reply> {
        tracing::info!(
            obligation = context.obligation_type,
            amount = %context.amount,
            year = %context.year,
            "Offering zakat payment reminder"
        );
        self.session = Some(ReminderSession::new(context));
        vec![Reply::Choices {
            step: StepKey::ReminderConsent,
            title: "Mahukah anda menerima peringatan pembayaran zakat? Kami akan menyimpan \
                    maklumat hubungan anda."
                .to_string(),
            options: vec![
                ChoiceOption::new("ya", "Ya, ingatkan saya"),
                ChoiceOption::new("tidak", "Tidak perlu"),
            ],
        }]
    }

    /// Handle the consent choice. A duplicate click after acceptance, a
    /// click with no offer showing, or an unrecognized value is inert.
    pub fn handle_consent(&mut self, value: &str) -> Vec<Reply> {
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };
        if session.awaiting != ReminderField::None {
            return Vec::new();
        }
        match value {
            "ya" => {
                session.awaiting = ReminderField::Name;
                vec![prompt(ReminderField::Name, None)]
            }
            "tidak" => {
                tracing::info!("Reminder declined");
                self.session = None;
                vec![Reply::Notice(NOTICE_DECLINED.to_string())]
            }
            _ => Vec::new(),
        }
    }

    /// Handle free text for the currently awaited field.
    pub async fn handle_text(&mut self, text: &str) -> Vec<Reply> {
        if !self.awaiting_input() {
            return Vec::new();
        }
        if text.trim().eq_ignore_ascii_case(CANCEL_KEYWORD) {
            return self.cancel();
        }
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };
        match session.awaiting {
            ReminderField::Name => match validate::full_name(text) {
                Ok(name) => {
                    session.name = Some(name);
                    session.awaiting = ReminderField::IcNumber;
                    vec![prompt(ReminderField::IcNumber, None)]
                }
                Err(invalid) => vec![prompt(ReminderField::Name, Some(invalid.to_string()))],
            },
            ReminderField::IcNumber => match validate::ic_number(text) {
                Ok(ic) => {
                    session.ic_number = Some(ic);
                    session.awaiting = ReminderField::Phone;
                    vec![prompt(ReminderField::Phone, None)]
                }
                Err(invalid) => vec![prompt(ReminderField::IcNumber, Some(invalid.to_string()))],
            },
            ReminderField::Phone => match validate::phone(text) {
                Ok(phone) => {
                    session.phone = Some(phone);
                    self.submit().await
                }
                Err(invalid) => vec![prompt(ReminderField::Phone, Some(invalid.to_string()))],
            },
            // unreachable behind the awaiting_input() guard
            ReminderField::None => Vec::new(),
        }
    }

    /// Abort to idle, discarding all partially collected fields.
    pub fn cancel(&mut self) -> Vec<Reply> {
        if self.session.take().is_some() {
            tracing::info!("Reminder flow cancelled");
            vec![Reply::Notice(NOTICE_CANCELLED.to_string())]
        } else {
            Vec::new()
        }
    }

    /// Discard the session with no notice (a new calculator flow supersedes
    /// a pending offer).
    pub fn reset(&mut self) {
        self.session = None;
    }

    async fn submit(&mut self) -> Vec<Reply> {
        let Some(session) = self.session.take() else {
            return Vec::new();
        };
        let context = session.context().clone();
        let (Some(name), Some(ic_number), Some(phone)) =
            (session.name, session.ic_number, session.phone)
        else {
            tracing::error!("Reminder submit reached with missing fields");
            return vec![Reply::Notice(NOTICE_SAVE_FAILED.to_string())];
        };
        let record = ReminderRecord {
            name,
            ic_number,
            phone,
            zakat_type: context.obligation_type.to_string(),
            zakat_amount: context.amount,
            year: context.year,
            year_type: context.calendar.code().to_string(),
            submitted_at: Utc::now(),
        };

        tracing::info!(zakat_type = %record.zakat_type, "Submitting reminder opt-in");
        let result = self.store.save(&record).await;
        if self.cancel_flag.take() {
            // cancelled while the save was in flight; the result is discarded
            return vec![Reply::Notice(NOTICE_CANCELLED.to_string())];
        }
        match result {
            Ok(()) => {
                let first_name = record
                    .name
                    .split_whitespace()
                    .next()
                    .unwrap_or(record.name.as_str());
                vec![Reply::Result(format!(
                    "Terima kasih, {first_name}! Maklumat anda telah disimpan dan peringatan \
                     pembayaran zakat akan dihantar kepada anda."
                ))]
            }
            Err(e) => {
                tracing::warn!(error = %e, "Reminder save failed");
                vec![Reply::Notice(NOTICE_SAVE_FAILED.to_string())]
            }
        }
    }
}

fn prompt(field: ReminderField, error: Option<String>) -> Reply {
    let text = match field {
        ReminderField::Name => "Sila masukkan nama penuh anda:",
        ReminderField::IcNumber => "Sila masukkan nombor kad pengenalan anda (12 digit):",
        ReminderField::Phone => "Sila masukkan nombor telefon anda (cth: 0123456789):",
        ReminderField::None => "",
    };
    Reply::Prompt {
        step: StepKey::ReminderField(field),
        text: text.to_string(),
        error,
    }
}
