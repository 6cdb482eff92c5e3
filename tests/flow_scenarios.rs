//! End-to-end dialog scenarios over the flow engine.
//!
//! Each test drives a [`FlowEngine`] wired to stub collaborators and asserts
//! on the replies and on what reached (or never reached) the services.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use zakia::catalog::FlowVariant;
use zakia::config::AssistConfig;
use zakia::error::ServiceError;
use zakia::flow::{ChatEvent, FlowEngine, IntentSignal, Reply, StepKey};
use zakia::services::{
    CalendarService, ComputationService, ComputeOutcome, ComputeRequest, ReminderRecord,
    ReminderStore,
};
use zakia::session::CalendarSystem;

// ── stub collaborators ──────────────────────────────────────────────

struct FixedCalendar {
    years: Vec<String>,
    fail: bool,
}

impl FixedCalendar {
    fn ok() -> Self {
        Self {
            years: vec!["2025".to_string(), "2024".to_string(), "2023".to_string()],
            fail: false,
        }
    }

    fn unreachable() -> Self {
        Self {
            years: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl CalendarService for FixedCalendar {
    async fn list_years(&self, _calendar: CalendarSystem) -> Result<Vec<String>, ServiceError> {
        if self.fail {
            return Err(ServiceError::RequestFailed {
                service: "lznk",
                reason: "connection refused".to_string(),
            });
        }
        Ok(self.years.clone())
    }
}

/// Computation stub returning a fixed outcome, recording every request.
struct ScriptedCalculator {
    outcome: ComputeOutcome,
    fail: bool,
    requests: Mutex<Vec<ComputeRequest>>,
}

impl ScriptedCalculator {
    fn returning(outcome: ComputeOutcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            fail: false,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            outcome: outcome(Decimal::ZERO, false),
            fail: true,
            requests: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ComputationService for ScriptedCalculator {
    async fn calculate(&self, request: &ComputeRequest) -> Result<ComputeOutcome, ServiceError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(ServiceError::Rejected {
                service: "lznk",
                message: "Tahun tidak sah.".to_string(),
            });
        }
        Ok(self.outcome.clone())
    }

    async fn nisab_info(
        &self,
        year: &str,
        _calendar: CalendarSystem,
    ) -> Result<String, ServiceError> {
        if self.fail {
            return Err(ServiceError::RequestFailed {
                service: "lznk",
                reason: "timeout".to_string(),
            });
        }
        Ok(format!("Nisab bagi tahun {year}: RM 22,000.00"))
    }
}

struct RecordingStore {
    fail: bool,
    saved: Mutex<Vec<ReminderRecord>>,
}

impl RecordingStore {
    fn ok() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            saved: Mutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            saved: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ReminderStore for RecordingStore {
    async fn save(&self, record: &ReminderRecord) -> Result<(), ServiceError> {
        if self.fail {
            return Err(ServiceError::RequestFailed {
                service: "reminder",
                reason: "500 Internal Server Error".to_string(),
            });
        }
        self.saved.lock().unwrap().push(record.clone());
        Ok(())
    }
}

// ── harness ─────────────────────────────────────────────────────────

fn outcome(amount: Decimal, meets_nisab: bool) -> ComputeOutcome {
    ComputeOutcome {
        amount,
        meets_nisab,
        resolved_type: "pendapatan".to_string(),
        message: "💰 Jumlah zakat anda: RM 3,000.00".to_string(),
    }
}

fn engine_with(
    calendar: FixedCalendar,
    calc: Arc<ScriptedCalculator>,
    store: Arc<RecordingStore>,
) -> FlowEngine {
    FlowEngine::new(Arc::new(calendar), calc, store, AssistConfig::default())
}

fn choice(step: StepKey, value: &str) -> ChatEvent {
    ChatEvent::Choice {
        step,
        value: value.to_string(),
    }
}

fn text(s: &str) -> ChatEvent {
    ChatEvent::Text(s.to_string())
}

fn start(variant: FlowVariant) -> ChatEvent {
    ChatEvent::Intent(IntentSignal::StartFlow(variant))
}

/// Walk the shared calendar/year prefix (Masihi, 2024).
async fn pick_year(engine: &mut FlowEngine) {
    let turn = engine
        .handle(choice(StepKey::CalendarSystem, "masihi"))
        .await;
    assert!(
        matches!(turn.replies.last(), Some(Reply::Choices { step: StepKey::Year, .. })),
        "expected year choices, got {:?}",
        turn.replies
    );
    engine.handle(choice(StepKey::Year, "2024")).await;
}

fn has_consent_offer(replies: &[Reply]) -> bool {
    replies.iter().any(|r| {
        matches!(
            r,
            Reply::Choices {
                step: StepKey::ReminderConsent,
                ..
            }
        )
    })
}

fn notices(replies: &[Reply]) -> Vec<&str> {
    replies
        .iter()
        .filter_map(|r| match r {
            Reply::Notice(text) => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

// ── scenarios ───────────────────────────────────────────────────────

#[tokio::test]
async fn menu_lists_every_calculator() {
    let mut engine = engine_with(
        FixedCalendar::ok(),
        ScriptedCalculator::returning(outcome(dec!(3000), true)),
        RecordingStore::ok(),
    );
    let turn = engine
        .handle(ChatEvent::Intent(IntentSignal::ShowMenu))
        .await;
    assert!(turn.consumed);
    match &turn.replies[..] {
        [Reply::Choices {
            step: StepKey::Menu,
            options,
            ..
        }] => {
            assert_eq!(options.len(), 8);
            assert!(options.iter().any(|o| o.value == "nisab"));
        }
        other => panic!("unexpected replies: {other:?}"),
    }
}

#[tokio::test]
async fn qualifying_result_runs_full_reminder_path() {
    let calc = ScriptedCalculator::returning(outcome(dec!(3000), true));
    let store = RecordingStore::ok();
    let mut engine = engine_with(FixedCalendar::ok(), calc, store.clone());

    engine.handle(start(FlowVariant::IncomeGross)).await;
    pick_year(&mut engine).await;
    let turn = engine.handle(text("50000")).await;
    assert!(matches!(turn.replies.first(), Some(Reply::Result(_))));
    assert!(has_consent_offer(&turn.replies));

    let turn = engine.handle(choice(StepKey::ReminderConsent, "ya")).await;
    assert!(matches!(
        turn.replies[..],
        [Reply::Prompt {
            step: StepKey::ReminderField(_),
            error: None,
            ..
        }]
    ));

    engine.handle(text("Ali bin Abu")).await;
    engine.handle(text("950101-01-5678")).await;
    let turn = engine.handle(text("+60123456789")).await;
    match &turn.replies[..] {
        [Reply::Result(message)] => assert!(message.contains("Ali")),
        other => panic!("unexpected replies: {other:?}"),
    }

    let saved = store.saved.lock().unwrap();
    assert_eq!(saved.len(), 1);
    let record = &saved[0];
    assert_eq!(record.name, "Ali bin Abu");
    assert_eq!(record.ic_number, "950101015678");
    assert_eq!(record.phone, "0123456789");
    assert_eq!(record.zakat_type, "pendapatan");
    assert_eq!(record.zakat_amount, dec!(3000));
    assert_eq!(record.year, "2024");
    assert_eq!(record.year_type, "M");
}

#[tokio::test]
async fn below_nisab_result_skips_reminder_offer() {
    let calc = ScriptedCalculator::returning(outcome(Decimal::ZERO, false));
    let store = RecordingStore::ok();
    let mut engine = engine_with(FixedCalendar::ok(), calc, store.clone());

    engine.handle(start(FlowVariant::Savings)).await;
    pick_year(&mut engine).await;
    let turn = engine.handle(text("500")).await;
    assert!(matches!(turn.replies.first(), Some(Reply::Result(_))));
    assert!(!has_consent_offer(&turn.replies));

    // flow is idle again; stray text falls through
    let turn = engine.handle(text("terima kasih")).await;
    assert!(!turn.consumed);
    assert!(store.saved.lock().unwrap().is_empty());
}

#[tokio::test]
async fn zero_amount_never_triggers_handoff() {
    // meets_nisab true but nothing due
    let calc = ScriptedCalculator::returning(outcome(Decimal::ZERO, true));
    let mut engine = engine_with(FixedCalendar::ok(), calc, RecordingStore::ok());

    engine.handle(start(FlowVariant::Savings)).await;
    pick_year(&mut engine).await;
    let turn = engine.handle(text("22000")).await;
    assert!(!has_consent_offer(&turn.replies));
}

#[tokio::test]
async fn equities_blank_debt_is_sent_as_zero() {
    let calc = ScriptedCalculator::returning(outcome(dec!(1250), true));
    let mut engine = engine_with(FixedCalendar::ok(), calc.clone(), RecordingStore::ok());

    engine.handle(start(FlowVariant::Equities)).await;
    pick_year(&mut engine).await;
    engine.handle(text("50000")).await;
    engine.handle(text("")).await;

    let requests = calc.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let json = serde_json::to_value(&requests[0]).unwrap();
    assert_eq!(json["type"], "saham");
    assert_eq!(json["amount"], "50000");
    assert_eq!(json["debt"], "0");
}

#[tokio::test]
async fn invalid_amount_reprompts_without_advancing() {
    let calc = ScriptedCalculator::returning(outcome(dec!(3000), true));
    let mut engine = engine_with(FixedCalendar::ok(), calc.clone(), RecordingStore::ok());

    engine.handle(start(FlowVariant::IncomeNet)).await;
    pick_year(&mut engine).await;

    let turn = engine.handle(text("lima ribu")).await;
    match &turn.replies[..] {
        [Reply::Prompt { error, .. }] => assert!(error.is_some()),
        other => panic!("unexpected replies: {other:?}"),
    }
    assert!(calc.requests.lock().unwrap().is_empty());

    // a valid answer now advances to the second field
    let turn = engine.handle(text("60000")).await;
    assert!(matches!(
        turn.replies[..],
        [Reply::Prompt { error: None, .. }]
    ));
}

#[tokio::test]
async fn stale_and_duplicate_choices_are_inert() {
    let calc = ScriptedCalculator::returning(outcome(dec!(3000), true));
    let mut engine = engine_with(FixedCalendar::ok(), calc, RecordingStore::ok());

    engine.handle(start(FlowVariant::IncomeGross)).await;
    engine
        .handle(choice(StepKey::CalendarSystem, "masihi"))
        .await;

    // a second click on the already-answered calendar step changes nothing
    let turn = engine
        .handle(choice(StepKey::CalendarSystem, "hijrah"))
        .await;
    assert!(turn.consumed);
    assert!(turn.replies.is_empty());

    // a year outside the offered list is equally inert
    let turn = engine.handle(choice(StepKey::Year, "1999")).await;
    assert!(turn.replies.is_empty());

    // the offered year still works afterwards
    let turn = engine.handle(choice(StepKey::Year, "2024")).await;
    assert!(matches!(
        turn.replies[..],
        [Reply::Prompt { error: None, .. }]
    ));
}

#[tokio::test]
async fn text_during_choice_window_yields_button_notice() {
    let calc = ScriptedCalculator::returning(outcome(dec!(3000), true));
    let mut engine = engine_with(FixedCalendar::ok(), calc, RecordingStore::ok());

    engine.handle(start(FlowVariant::Savings)).await;
    let turn = engine.handle(text("masihi")).await;
    assert!(turn.consumed);
    assert_eq!(
        notices(&turn.replies),
        ["Sila gunakan butang pilihan yang disediakan."]
    );

    // the choice window is intact
    let turn = engine
        .handle(choice(StepKey::CalendarSystem, "masihi"))
        .await;
    assert!(matches!(
        turn.replies.last(),
        Some(Reply::Choices {
            step: StepKey::Year,
            ..
        })
    ));
}

#[tokio::test]
async fn calendar_failure_falls_back_to_static_years() {
    let calc = ScriptedCalculator::returning(outcome(dec!(3000), true));
    let mut engine = engine_with(FixedCalendar::unreachable(), calc, RecordingStore::ok());

    engine.handle(start(FlowVariant::IncomeGross)).await;
    let turn = engine
        .handle(choice(StepKey::CalendarSystem, "hijrah"))
        .await;
    match &turn.replies[..] {
        [Reply::Notice(_), Reply::Choices {
            step: StepKey::Year,
            options,
            ..
        }] => {
            let years: Vec<&str> = options.iter().map(|o| o.value.as_str()).collect();
            assert_eq!(years, ["1447", "1446", "1445", "1444"]);
        }
        other => panic!("unexpected replies: {other:?}"),
    }

    // the flow continues normally on a fallback year
    let turn = engine.handle(choice(StepKey::Year, "1447")).await;
    assert!(matches!(
        turn.replies[..],
        [Reply::Prompt { error: None, .. }]
    ));
}

#[tokio::test]
async fn cancel_discards_session_and_restart_is_clean() {
    let calc = ScriptedCalculator::returning(outcome(dec!(3000), true));
    let mut engine = engine_with(FixedCalendar::ok(), calc.clone(), RecordingStore::ok());

    engine.handle(start(FlowVariant::ProvidentFund)).await;
    pick_year(&mut engine).await;
    engine.handle(text("30000")).await;

    let turn = engine.handle(ChatEvent::Cancel).await;
    assert_eq!(notices(&turn.replies).len(), 1);
    assert!(calc.requests.lock().unwrap().is_empty());

    // idle now: text falls through, a second cancel is inert
    assert!(!engine.handle(text("10000")).await.consumed);
    assert!(engine.handle(ChatEvent::Cancel).await.replies.is_empty());

    // a fresh start is unaffected by the discarded fields
    let turn = engine.handle(start(FlowVariant::ProvidentFund)).await;
    assert!(matches!(
        turn.replies[..],
        [Reply::Choices {
            step: StepKey::CalendarSystem,
            ..
        }]
    ));
}

#[tokio::test]
async fn cancel_during_computation_discards_result() {
    let calc = ScriptedCalculator::returning(outcome(dec!(3000), true));
    let mut engine = engine_with(FixedCalendar::ok(), calc, RecordingStore::ok());

    engine.handle(start(FlowVariant::IncomeGross)).await;
    pick_year(&mut engine).await;

    // cancellation arrives while the computation call is in flight
    engine.cancel_flag().trip();
    let turn = engine.handle(text("50000")).await;
    assert!(!turn
        .replies
        .iter()
        .any(|r| matches!(r, Reply::Result(_))));
    assert!(!has_consent_offer(&turn.replies));
    assert_eq!(notices(&turn.replies).len(), 1);
}

#[tokio::test]
async fn computation_failure_surfaces_service_message() {
    let calc = ScriptedCalculator::failing();
    let store = RecordingStore::ok();
    let mut engine = engine_with(FixedCalendar::ok(), calc, store.clone());

    engine.handle(start(FlowVariant::IncomeGross)).await;
    pick_year(&mut engine).await;
    let turn = engine.handle(text("50000")).await;
    assert_eq!(notices(&turn.replies), ["Tahun tidak sah."]);
    assert!(!has_consent_offer(&turn.replies));

    // back to idle, nothing saved
    assert!(!engine.handle(text("50000")).await.consumed);
    assert!(store.saved.lock().unwrap().is_empty());
}

#[tokio::test]
async fn text_during_consent_offer_falls_through() {
    let calc = ScriptedCalculator::returning(outcome(dec!(3000), true));
    let store = RecordingStore::ok();
    let mut engine = engine_with(FixedCalendar::ok(), calc, store.clone());

    engine.handle(start(FlowVariant::IncomeGross)).await;
    pick_year(&mut engine).await;
    let turn = engine.handle(text("50000")).await;
    assert!(has_consent_offer(&turn.replies));

    // a question while the offer is showing is not this flow's to answer
    let turn = engine.handle(text("apa itu nisab?")).await;
    assert!(!turn.consumed);
    assert!(turn.replies.is_empty());

    // the offer is still answerable afterwards
    let turn = engine.handle(choice(StepKey::ReminderConsent, "ya")).await;
    assert!(matches!(
        turn.replies[..],
        [Reply::Prompt {
            step: StepKey::ReminderField(_),
            error: None,
            ..
        }]
    ));
}

#[tokio::test]
async fn unrecognized_consent_value_is_inert() {
    let calc = ScriptedCalculator::returning(outcome(dec!(3000), true));
    let store = RecordingStore::ok();
    let mut engine = engine_with(FixedCalendar::ok(), calc, store.clone());

    engine.handle(start(FlowVariant::IncomeGross)).await;
    pick_year(&mut engine).await;
    engine.handle(text("50000")).await;

    // a value outside the offered pair neither accepts nor declines
    let turn = engine
        .handle(choice(StepKey::ReminderConsent, "mungkin"))
        .await;
    assert!(turn.consumed);
    assert!(turn.replies.is_empty());

    // the offer survives and still accepts
    let turn = engine.handle(choice(StepKey::ReminderConsent, "ya")).await;
    assert!(matches!(
        turn.replies[..],
        [Reply::Prompt {
            step: StepKey::ReminderField(_),
            error: None,
            ..
        }]
    ));
}

#[tokio::test]
async fn declined_consent_ends_quietly() {
    let calc = ScriptedCalculator::returning(outcome(dec!(3000), true));
    let store = RecordingStore::ok();
    let mut engine = engine_with(FixedCalendar::ok(), calc, store.clone());

    engine.handle(start(FlowVariant::IncomeGross)).await;
    pick_year(&mut engine).await;
    engine.handle(text("50000")).await;

    let turn = engine
        .handle(choice(StepKey::ReminderConsent, "tidak"))
        .await;
    assert_eq!(notices(&turn.replies).len(), 1);
    assert!(store.saved.lock().unwrap().is_empty());
    assert!(!engine.handle(text("hello")).await.consumed);
}

#[tokio::test]
async fn reminder_fields_are_validated_in_order() {
    let calc = ScriptedCalculator::returning(outcome(dec!(3000), true));
    let store = RecordingStore::ok();
    let mut engine = engine_with(FixedCalendar::ok(), calc, store.clone());

    engine.handle(start(FlowVariant::IncomeGross)).await;
    pick_year(&mut engine).await;
    engine.handle(text("50000")).await;
    engine.handle(choice(StepKey::ReminderConsent, "ya")).await;

    // one-letter name rejected, stays on the name field
    let turn = engine.handle(text("A")).await;
    match &turn.replies[..] {
        [Reply::Prompt { error, .. }] => assert!(error.is_some()),
        other => panic!("unexpected replies: {other:?}"),
    }

    engine.handle(text("Siti Aminah")).await;

    // eleven digits is not an IC number
    let turn = engine.handle(text("95010101567")).await;
    match &turn.replies[..] {
        [Reply::Prompt { error, .. }] => assert!(error.is_some()),
        other => panic!("unexpected replies: {other:?}"),
    }

    engine.handle(text("950101015678")).await;
    let turn = engine.handle(text("012-345 6789")).await;
    assert!(matches!(turn.replies[..], [Reply::Result(_)]));
    assert_eq!(store.saved.lock().unwrap()[0].phone, "0123456789");
}

#[tokio::test]
async fn batal_keyword_aborts_reminder_collection() {
    let calc = ScriptedCalculator::returning(outcome(dec!(3000), true));
    let store = RecordingStore::ok();
    let mut engine = engine_with(FixedCalendar::ok(), calc, store.clone());

    engine.handle(start(FlowVariant::IncomeGross)).await;
    pick_year(&mut engine).await;
    engine.handle(text("50000")).await;
    engine.handle(choice(StepKey::ReminderConsent, "ya")).await;
    engine.handle(text("Ali bin Abu")).await;

    let turn = engine.handle(text("batal")).await;
    assert_eq!(notices(&turn.replies).len(), 1);
    assert!(store.saved.lock().unwrap().is_empty());
    assert!(!engine.handle(text("950101015678")).await.consumed);
}

#[tokio::test]
async fn store_failure_reports_and_discards_session() {
    let calc = ScriptedCalculator::returning(outcome(dec!(3000), true));
    let mut engine = engine_with(FixedCalendar::ok(), calc, RecordingStore::failing());

    engine.handle(start(FlowVariant::IncomeGross)).await;
    pick_year(&mut engine).await;
    engine.handle(text("50000")).await;
    engine.handle(choice(StepKey::ReminderConsent, "ya")).await;
    engine.handle(text("Ali bin Abu")).await;
    engine.handle(text("950101015678")).await;

    let turn = engine.handle(text("0123456789")).await;
    assert_eq!(notices(&turn.replies).len(), 1);
    assert!(!turn.replies.iter().any(|r| matches!(r, Reply::Result(_))));

    // the sub-flow did not stay half-open
    assert!(!engine.handle(text("0123456789")).await.consumed);
}

#[tokio::test]
async fn nisab_inquiry_completes_right_after_year() {
    let calc = ScriptedCalculator::returning(outcome(Decimal::ZERO, false));
    let mut engine = engine_with(FixedCalendar::ok(), calc, RecordingStore::ok());

    engine.handle(start(FlowVariant::NisabInquiry)).await;
    let turn = engine
        .handle(choice(StepKey::CalendarSystem, "hijrah"))
        .await;
    assert!(matches!(
        turn.replies.last(),
        Some(Reply::Choices {
            step: StepKey::Year,
            ..
        })
    ));

    let turn = engine.handle(choice(StepKey::Year, "2024")).await;
    match &turn.replies[..] {
        [Reply::Result(message)] => assert!(message.contains("2024")),
        other => panic!("unexpected replies: {other:?}"),
    }
    assert!(!engine.handle(text("hello")).await.consumed);
}

#[tokio::test]
async fn new_flow_supersedes_pending_consent_offer() {
    let calc = ScriptedCalculator::returning(outcome(dec!(3000), true));
    let store = RecordingStore::ok();
    let mut engine = engine_with(FixedCalendar::ok(), calc, store.clone());

    engine.handle(start(FlowVariant::IncomeGross)).await;
    pick_year(&mut engine).await;
    let turn = engine.handle(text("50000")).await;
    assert!(has_consent_offer(&turn.replies));

    // starting another calculator abandons the offer
    engine.handle(start(FlowVariant::Savings)).await;
    let turn = engine.handle(choice(StepKey::ReminderConsent, "ya")).await;
    assert!(turn.replies.is_empty());
    assert!(store.saved.lock().unwrap().is_empty());
}
