//! Session state for the two dialog machines.
//!
//! A [`Session`] is owned exclusively by the orchestrator and a
//! [`ReminderSession`] by the reminder sub-flow; nothing else writes to them.
//! Handoff between the two is a one-way transfer of a [`ReminderContext`]
//! snapshot.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{FieldName, FlowVariant};

/// Hijrah (lunar) or Masihi (solar) year numbering, chosen before any year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarSystem {
    Hijrah,
    Masihi,
}

impl CalendarSystem {
    /// Wire code used by the LZNK API.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Hijrah => "H",
            Self::Masihi => "M",
        }
    }

    /// Label shown in result messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Hijrah => "Hijrah",
            Self::Masihi => "Masihi",
        }
    }

    /// Parse a discrete choice value.
    pub fn from_choice(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hijrah" | "h" => Some(Self::Hijrah),
            "masihi" | "m" => Some(Self::Masihi),
            _ => None,
        }
    }
}

impl std::fmt::Display for CalendarSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Where the primary flow currently is.
///
/// `computing` is transient inside the event handler and `idle`/`cancelled`
/// are the absence of a session, so neither appears here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    AwaitingCalendarSystem,
    /// The offered year list is retained so a choice outside it is inert.
    AwaitingYear { options: Vec<String> },
    /// Cursor into the variant's field-step list.
    AwaitingField { index: usize },
}

/// One active calculator conversation.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub variant: FlowVariant,
    pub state: FlowState,
    pub calendar: Option<CalendarSystem>,
    pub year: Option<String>,
    fields: BTreeMap<FieldName, Decimal>,
}

impl Session {
    pub fn new(variant: FlowVariant) -> Self {
        Self {
            id: Uuid::new_v4(),
            variant,
            state: FlowState::AwaitingCalendarSystem,
            calendar: None,
            year: None,
            fields: BTreeMap::new(),
        }
    }

    /// Store a field value. Each field is written exactly once, at the step
    /// bearing its name; returns false if the key was already present.
    pub fn put_field(&mut self, name: FieldName, value: Decimal) -> bool {
        use std::collections::btree_map::Entry;
        match self.fields.entry(name) {
            Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub fn fields(&self) -> &BTreeMap<FieldName, Decimal> {
        &self.fields
    }
}

/// Which single reminder field is being collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderField {
    /// The consent offer is showing; no free text is consumed yet.
    None,
    Name,
    IcNumber,
    Phone,
}

impl ReminderField {
    /// The fixed collection order: name → IC → phone.
    pub fn next(&self) -> Option<ReminderField> {
        match self {
            Self::None => Some(Self::Name),
            Self::Name => Some(Self::IcNumber),
            Self::IcNumber => Some(Self::Phone),
            Self::Phone => None,
        }
    }
}

/// Snapshot handed from the orchestrator to the reminder sub-flow.
/// Immutable after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderContext {
    /// Canonical obligation label, e.g. "pendapatan".
    pub obligation_type: &'static str,
    pub amount: Decimal,
    pub year: String,
    pub calendar: CalendarSystem,
}

/// The nested reminder opt-in conversation.
#[derive(Debug, Clone)]
pub struct ReminderSession {
    pub awaiting: ReminderField,
    pub name: Option<String>,
    pub ic_number: Option<String>,
    pub phone: Option<String>,
    context: ReminderContext,
}

impl ReminderSession {
    pub fn new(context: ReminderContext) -> Self {
        Self {
            awaiting: ReminderField::None,
            name: None,
            ic_number: None,
            phone: None,
            context,
        }
    }

    /// The parent-flow snapshot. Read-only by construction.
    pub fn context(&self) -> &ReminderContext {
        &self.context
    }
}
