//! Conversation flow orchestration.
//!
//! [`FlowEngine`] routes presentation-layer events between the primary
//! calculator machine ([`FlowOrchestrator`]) and the nested reminder machine
//! ([`ReminderFlow`]), and carries the one-way handoff between them.

pub mod event;
pub mod orchestrator;
pub mod reminder;
pub mod years;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::catalog::FlowVariant;
use crate::config::AssistConfig;
use crate::services::{CalendarService, ComputationService, ReminderStore};

pub use event::{ChatEvent, ChoiceOption, IntentSignal, Reply, StepKey, Turn};
pub use orchestrator::FlowOrchestrator;
pub use reminder::ReminderFlow;
pub use years::{resolve_year_options, YearOptions};

/// Cooperative cancellation flag.
///
/// The presentation layer may trip it out-of-band; the owning machine checks
/// it only at transition boundaries, discarding the result of any call that
/// completed after the trip.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trip(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Consume the flag; returns true at most once per trip.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

/// Event router over the two state machines. Exactly one conversation; events
/// are applied strictly in the order they arrive (`&mut self` serializes
/// them).
pub struct FlowEngine {
    orchestrator: FlowOrchestrator,
    reminder: ReminderFlow,
    cancel_flag: CancelFlag,
}

impl FlowEngine {
    pub fn new(
        calendar: Arc<dyn CalendarService>,
        calculator: Arc<dyn ComputationService>,
        store: Arc<dyn ReminderStore>,
        config: AssistConfig,
    ) -> Self {
        let cancel_flag = CancelFlag::new();
        Self {
            orchestrator: FlowOrchestrator::new(
                calendar,
                calculator,
                config,
                cancel_flag.clone(),
            ),
            reminder: ReminderFlow::new(store, cancel_flag.clone()),
            cancel_flag,
        }
    }

    /// Handle for tripping cancellation out-of-band (e.g. from a Ctrl-C
    /// handler while a service call is in flight).
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel_flag.clone()
    }

    /// Apply one event and collect the replies to render.
    pub async fn handle(&mut self, event: ChatEvent) -> Turn {
        match event {
            ChatEvent::Intent(IntentSignal::ShowMenu) => Turn::consumed(vec![menu()]),
            ChatEvent::Intent(IntentSignal::StartFlow(variant)) => self.start_flow(variant),
            ChatEvent::Intent(IntentSignal::Cancel) | ChatEvent::Cancel => self.cancel(),
            ChatEvent::Choice { step, value } => self.route_choice(step, &value).await,
            ChatEvent::Text(text) => self.route_text(&text).await,
        }
    }

    fn start_flow(&mut self, variant: FlowVariant) -> Turn {
        // a fresh flow supersedes a pending reminder offer
        self.reminder.reset();
        Turn::consumed(self.orchestrator.start(variant))
    }

    fn cancel(&mut self) -> Turn {
        if self.reminder.is_active() {
            Turn::consumed(self.reminder.cancel())
        } else if self.orchestrator.is_active() {
            Turn::consumed(self.orchestrator.cancel())
        } else {
            Turn::inert()
        }
    }

    async fn route_choice(&mut self, step: StepKey, value: &str) -> Turn {
        match step {
            StepKey::Menu => match FlowVariant::from_menu_value(value) {
                Some(variant) => self.start_flow(variant),
                None => Turn::inert(),
            },
            StepKey::ReminderConsent => Turn::consumed(self.reminder.handle_consent(value)),
            _ => {
                let result = self.orchestrator.handle_choice(step, value).await;
                self.finish(result)
            }
        }
    }

    async fn route_text(&mut self, text: &str) -> Turn {
        if self.reminder.awaiting_input() {
            return Turn::consumed(self.reminder.handle_text(text).await);
        }
        let result = self.orchestrator.handle_text(text).await;
        self.finish(result)
    }

    /// Apply a primary-flow result, performing the reminder handoff when the
    /// outcome qualifies.
    fn finish(&mut self, result: orchestrator::StepResult) -> Turn {
        let mut replies = result.replies;
        if let Some(context) = result.handoff {
            replies.extend(self.reminder.offer(context));
        }
        Turn {
            replies,
            consumed: result.consumed,
        }
    }
}

/// The calculator menu. A presentation request only — no session side
/// effects.
fn menu() -> Reply {
    Reply::Choices {
        step: StepKey::Menu,
        title: "Pengiraan zakat yang tersedia:".to_string(),
        options: FlowVariant::ALL
            .iter()
            .map(|v| ChoiceOption::new(v.menu_value(), v.menu_label()))
            .collect(),
    }
}
