//! Events and replies exchanged with the presentation layer.
//!
//! The core emits opaque content ([`Reply`]) and receives discrete events
//! ([`ChatEvent`]); it never inspects rendering details.

use crate::catalog::{FieldName, FlowVariant};
use crate::session::ReminderField;

/// External intent signal — the only way a calculator session is created.
/// Free-text intent classification lives outside this core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentSignal {
    StartFlow(FlowVariant),
    ShowMenu,
    Cancel,
}

/// A discrete event from the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Intent(IntentSignal),
    /// A choice was selected for a step.
    Choice { step: StepKey, value: String },
    /// Free text was submitted.
    Text(String),
    Cancel,
}

/// Identifies which step a prompt, choice list, or selection belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKey {
    Menu,
    CalendarSystem,
    Year,
    Field(FieldName),
    ReminderConsent,
    ReminderField(ReminderField),
}

/// A selectable option presented as a button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOption {
    pub value: String,
    pub label: String,
}

impl ChoiceOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Content emitted to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Ask for free text for `step`. `error` carries the validation notice
    /// when re-prompting after a rejected answer.
    Prompt {
        step: StepKey,
        text: String,
        error: Option<String>,
    },
    /// Present discrete choices for `step`.
    Choices {
        step: StepKey,
        title: String,
        options: Vec<ChoiceOption>,
    },
    /// A short informational or corrective notice.
    Notice(String),
    /// A computation or submission result.
    Result(String),
}

/// Outcome of handling one event.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Turn {
    pub replies: Vec<Reply>,
    /// False when the event was not consumed and may fall through to other
    /// handling (e.g. FAQ matching outside this core).
    pub consumed: bool,
}

impl Turn {
    pub fn consumed(replies: Vec<Reply>) -> Self {
        Self {
            replies,
            consumed: true,
        }
    }

    /// Consumed, but produced nothing — a stale or duplicate event.
    pub fn inert() -> Self {
        Self {
            replies: Vec::new(),
            consumed: true,
        }
    }

    /// Not consumed; falls through to other handling.
    pub fn ignored() -> Self {
        Self::default()
    }
}
