//! Flow Orchestrator — the top-level calculator state machine.
//!
//! Owns the active [`Session`], walks the catalog's step list, delegates
//! field checks to the validator, dispatches the assembled payload, and
//! interprets the result. A qualifying result ends with a one-way handoff to
//! the reminder sub-flow.
//!
//! Every step's input is accepted only while its state is the current state:
//! stale or duplicate discrete events are inert by construction, with no
//! ambient enable/disable bookkeeping.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::catalog::{self, FieldRule, FieldStep, FlowVariant};
use crate::config::AssistConfig;
use crate::error::ServiceError;
use crate::services::{CalendarService, ComputationService, ComputeRequest};
use crate::session::{CalendarSystem, FlowState, ReminderContext, Session};
use crate::validate;

use super::event::{ChoiceOption, Reply, StepKey};
use super::years;
use super::CancelFlag;

const NOTICE_USE_BUTTONS: &str = "Sila gunakan butang pilihan yang disediakan.";
const NOTICE_CANCELLED: &str = "Pengiraan dibatalkan. Taip 'menu' untuk mula semula.";
const NOTICE_YEARS_FALLBACK: &str =
    "Senarai tahun tidak dapat dimuat buat masa ini; tahun kebelakangan dipaparkan.";
const NOTICE_COMPUTE_FAILED: &str =
    "Maaf, pengiraan tidak dapat dilakukan buat masa ini. Sila cuba sebentar lagi.";

/// Result of handling one event in the primary flow.
#[derive(Debug, Default)]
pub struct StepResult {
    pub replies: Vec<Reply>,
    /// Set when a qualifying result hands the interaction to the reminder
    /// sub-flow.
    pub handoff: Option<ReminderContext>,
    pub consumed: bool,
}

impl StepResult {
    fn consumed(replies: Vec<Reply>) -> Self {
        Self {
            replies,
            handoff: None,
            consumed: true,
        }
    }

    fn inert() -> Self {
        Self {
            replies: Vec::new(),
            handoff: None,
            consumed: true,
        }
    }

    fn ignored() -> Self {
        Self::default()
    }
}

/// The top-level state machine. `session: None` is the idle state.
pub struct FlowOrchestrator {
    calendar_service: Arc<dyn CalendarService>,
    calculator: Arc<dyn ComputationService>,
    config: AssistConfig,
    cancel_flag: CancelFlag,
    session: Option<Session>,
}

impl FlowOrchestrator {
    pub fn new(
        calendar_service: Arc<dyn CalendarService>,
        calculator: Arc<dyn ComputationService>,
        config: AssistConfig,
        cancel_flag: CancelFlag,
    ) -> Self {
        Self {
            calendar_service,
            calculator,
            config,
            cancel_flag,
            session: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// (Re)initialize the session and ask for the calendar system. Every
    /// variant starts with the shared calendar/year prefix.
    pub fn start(&mut self, variant: FlowVariant) -> Vec<Reply> {
        let session = Session::new(variant);
        tracing::info!(session = %session.id, %variant, "Starting calculator flow");
        self.session = Some(session);
        vec![Reply::Choices {
            step: StepKey::CalendarSystem,
            title: "Pilih jenis tahun pengiraan:".to_string(),
            options: vec![
                ChoiceOption::new("hijrah", "Tahun Hijrah"),
                ChoiceOption::new("masihi", "Tahun Masihi"),
            ],
        }]
    }

    /// Tear down the session. No side effects from a cancelled flow are ever
    /// submitted to the computation service.
    pub fn cancel(&mut self) -> Vec<Reply> {
        match self.session.take() {
            Some(session) => {
                tracing::info!(session = %session.id, "Calculator flow cancelled");
                vec![Reply::Notice(NOTICE_CANCELLED.to_string())]
            }
            None => Vec::new(),
        }
    }

    /// Handle a discrete choice. Choices for a step other than the current
    /// one (duplicate clicks, stale events) are inert.
    pub async fn handle_choice(&mut self, step: StepKey, value: &str) -> StepResult {
        let Some(state) = self.session.as_ref().map(|s| s.state.clone()) else {
            return StepResult::inert();
        };
        match (state, step) {
            (FlowState::AwaitingCalendarSystem, StepKey::CalendarSystem) => {
                self.choose_calendar(value).await
            }
            (FlowState::AwaitingYear { options }, StepKey::Year) => {
                self.choose_year(&options, value).await
            }
            _ => StepResult::inert(),
        }
    }

    /// Handle free text. Only meaningful while a field is awaited; during a
    /// choice window it yields a corrective notice, and with no session it
    /// falls through untouched.
    pub async fn handle_text(&mut self, text: &str) -> StepResult {
        let Some(state) = self.session.as_ref().map(|s| s.state.clone()) else {
            return StepResult::ignored();
        };
        match state {
            FlowState::AwaitingCalendarSystem | FlowState::AwaitingYear { .. } => {
                StepResult::consumed(vec![Reply::Notice(NOTICE_USE_BUTTONS.to_string())])
            }
            FlowState::AwaitingField { index } => self.accept_field(index, text).await,
        }
    }

    async fn choose_calendar(&mut self, value: &str) -> StepResult {
        let Some(calendar) = CalendarSystem::from_choice(value) else {
            return StepResult::inert();
        };
        if let Some(session) = self.session.as_mut() {
            session.calendar = Some(calendar);
        }

        let resolved =
            years::resolve_year_options(self.calendar_service.as_ref(), &self.config, calendar)
                .await;
        if let Some(result) = self.take_cancel() {
            return result;
        }
        let Some(session) = self.session.as_mut() else {
            return StepResult::inert();
        };
        session.state = FlowState::AwaitingYear {
            options: resolved.years.clone(),
        };

        let mut replies = Vec::new();
        if resolved.fallback {
            replies.push(Reply::Notice(NOTICE_YEARS_FALLBACK.to_string()));
        }
        replies.push(Reply::Choices {
            step: StepKey::Year,
            title: "Pilih tahun haul:".to_string(),
            options: resolved
                .years
                .iter()
                .map(|y| ChoiceOption::new(y.clone(), y.clone()))
                .collect(),
        });
        StepResult::consumed(replies)
    }

    async fn choose_year(&mut self, options: &[String], value: &str) -> StepResult {
        if !options.iter().any(|y| y == value) {
            return StepResult::inert();
        }
        let Some(session) = self.session.as_mut() else {
            return StepResult::inert();
        };
        session.year = Some(value.to_string());
        let variant = session.variant;

        if variant == FlowVariant::NisabInquiry {
            return self.inquiry_compute().await;
        }

        session.state = FlowState::AwaitingField { index: 0 };
        match variant.steps().first() {
            Some(step) => StepResult::consumed(vec![prompt_for(step, None)]),
            None => StepResult::inert(),
        }
    }

    /// The nisab inquiry computes straight after the year choice, with only
    /// `{year, calendar}`, then returns to idle.
    async fn inquiry_compute(&mut self) -> StepResult {
        let Some((year, calendar)) = self
            .session
            .as_ref()
            .and_then(|s| Some((s.year.clone()?, s.calendar?)))
        else {
            return StepResult::inert();
        };

        let result = self.calculator.nisab_info(&year, calendar).await;
        if let Some(cancelled) = self.take_cancel() {
            return cancelled;
        }
        self.session = None;
        match result {
            Ok(message) => StepResult::consumed(vec![Reply::Result(message)]),
            Err(e) => {
                tracing::warn!(error = %e, "Nisab inquiry failed");
                StepResult::consumed(vec![Reply::Notice(failure_notice(e))])
            }
        }
    }

    async fn accept_field(&mut self, index: usize, text: &str) -> StepResult {
        let Some(session) = self.session.as_mut() else {
            return StepResult::ignored();
        };
        let steps = session.variant.steps();
        let Some(step) = steps.get(index) else {
            return StepResult::inert();
        };

        let parsed = match step.rule {
            FieldRule::Amount => validate::amount(text),
            FieldRule::AmountOrZero => validate::amount_or_zero(text),
        };
        let value = match parsed {
            Ok(value) => value,
            Err(invalid) => {
                // rejection: same prompt, no advance, no mutation
                return StepResult::consumed(vec![prompt_for(step, Some(invalid.to_string()))]);
            }
        };

        if !session.put_field(step.field, value) {
            tracing::warn!(session = %session.id, field = ?step.field, "Duplicate field answer ignored");
            return StepResult::inert();
        }
        tracing::debug!(session = %session.id, field = ?step.field, "Field accepted");

        if index + 1 < steps.len() {
            session.state = FlowState::AwaitingField { index: index + 1 };
            StepResult::consumed(vec![prompt_for(&steps[index + 1], None)])
        } else {
            self.compute().await
        }
    }

    /// Assemble the payload, dispatch it, and interpret the outcome. The flow
    /// ends here either way — the session never survives a computation.
    async fn compute(&mut self) -> StepResult {
        let Some(session) = self.session.as_ref() else {
            return StepResult::ignored();
        };
        let Some((year, calendar)) = session.year.clone().zip(session.calendar) else {
            return StepResult::inert();
        };
        let Some(query) = catalog::assemble_query(session.variant, session.fields()) else {
            tracing::error!(session = %session.id, "Payload assembly failed");
            self.session = None;
            return StepResult::consumed(vec![Reply::Notice(NOTICE_COMPUTE_FAILED.to_string())]);
        };
        let variant = session.variant;
        let session_id = session.id;
        let request = ComputeRequest {
            year,
            calendar,
            query,
        };

        tracing::info!(session = %session_id, %variant, "Dispatching computation");
        let result = self.calculator.calculate(&request).await;
        if let Some(cancelled) = self.take_cancel() {
            // the call completed after a cancellation; its result is discarded
            return cancelled;
        }
        self.session = None;

        match result {
            Ok(outcome) => {
                let qualifies = outcome.meets_nisab && outcome.amount > Decimal::ZERO;
                let handoff = qualifies.then(|| {
                    tracing::info!(
                        session = %session_id,
                        amount = %outcome.amount,
                        "Qualifying result; offering reminder"
                    );
                    ReminderContext {
                        obligation_type: variant.obligation_label(),
                        amount: outcome.amount,
                        year: request.year.clone(),
                        calendar,
                    }
                });
                StepResult {
                    replies: vec![Reply::Result(outcome.message)],
                    handoff,
                    consumed: true,
                }
            }
            Err(e) => {
                tracing::warn!(session = %session_id, error = %e, "Computation failed");
                StepResult::consumed(vec![Reply::Notice(failure_notice(e))])
            }
        }
    }

    /// Cooperative cancellation, checked at transition boundaries. When a
    /// cancel arrived while a call was in flight, the session is torn down
    /// and the caller discards the call's result.
    fn take_cancel(&mut self) -> Option<StepResult> {
        if self.cancel_flag.take() {
            Some(StepResult::consumed(self.cancel()))
        } else {
            None
        }
    }
}

fn prompt_for(step: &FieldStep, error: Option<String>) -> Reply {
    Reply::Prompt {
        step: StepKey::Field(step.field),
        text: step.prompt.to_string(),
        error,
    }
}

/// Surface the service's own message where it has one, else the generic
/// notice.
fn failure_notice(error: ServiceError) -> String {
    match error {
        ServiceError::Rejected { message, .. } => message,
        _ => NOTICE_COMPUTE_FAILED.to_string(),
    }
}
