//! LZNK zakat API client — year lists and nisab-based computation.
//!
//! Talks to the public LZNK calculator endpoints. The API occasionally
//! returns HTML-wrapped or plain-text bodies, so parsing is defensive: JSON
//! first, then a salvage pass over the raw text. Nisab lookups degrade to
//! marked default figures rather than failing, so a transient outage never
//! blocks a calculation.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use crate::catalog::ZakatQuery;
use crate::config::AssistConfig;
use crate::error::ServiceError;
use crate::session::CalendarSystem;

use super::{CalendarService, ComputationService, ComputeOutcome, ComputeRequest};

const USER_AGENT: &str = "ZAKIA-Calculator/1.0";
const DEFAULT_NISAB: Decimal = dec!(22000);
const DEFAULT_RATE_PERCENT: Decimal = dec!(2.5);
/// Nisab for silver is a weight, not a ringgit value.
const SILVER_NISAB_GRAMS: Decimal = dec!(595);

/// Nisab figures for one haul year.
#[derive(Debug, Clone, PartialEq)]
pub struct NisabRates {
    pub income: Decimal,
    pub savings: Decimal,
    /// Zakat rate as a fraction, e.g. 0.025.
    pub rate: Decimal,
    /// True when defaults were substituted for an unreachable or malformed
    /// response.
    pub fallback: bool,
}

impl NisabRates {
    fn defaults() -> Self {
        Self {
            income: DEFAULT_NISAB,
            savings: DEFAULT_NISAB,
            rate: DEFAULT_RATE_PERCENT / dec!(100),
            fallback: true,
        }
    }
}

/// Client for the LZNK calculator endpoints. Implements both the calendar
/// lookup and the computation boundary.
pub struct LznkClient {
    base_url: String,
    client: reqwest::Client,
}

impl LznkClient {
    pub fn new(config: &AssistConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ServiceError::RequestFailed {
                service: "lznk",
                reason: e.to_string(),
            })?;
        Ok(Self {
            base_url: config.lznk_base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// Fetch nisab data for a year. A single attempt; any failure yields the
    /// marked default figures.
    async fn fetch_nisab(&self, year: &str) -> NisabRates {
        let response = self
            .client
            .get(self.api_url("koding/kalkulator.php"))
            .query(&[("mode", "semakHaul"), ("haul", year)])
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await;

        let body = match response {
            Ok(resp) if resp.status().is_success() => resp.text().await.ok(),
            Ok(resp) => {
                tracing::warn!(year, status = %resp.status(), "Nisab lookup returned an error status");
                None
            }
            Err(e) => {
                tracing::warn!(year, error = %e, "Nisab lookup failed");
                None
            }
        };

        match body.as_deref().and_then(parse_nisab_body) {
            Some(rates) => rates,
            None => {
                tracing::warn!(year, "Using default nisab figures");
                NisabRates::defaults()
            }
        }
    }
}

#[async_trait]
impl CalendarService for LznkClient {
    async fn list_years(&self, calendar: CalendarSystem) -> Result<Vec<String>, ServiceError> {
        let response = self
            .client
            .get(self.api_url("kirazakat/listjenistahun.php"))
            .query(&[
                ("jenistahun", calendar.code()),
                ("options", "listjenistahun"),
            ])
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(|e| ServiceError::RequestFailed {
                service: "calendar",
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(ServiceError::RequestFailed {
                service: "calendar",
                reason: format!("HTTP {}", response.status()),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ServiceError::InvalidResponse {
                service: "calendar",
                reason: e.to_string(),
            })?;
        Ok(parse_year_list(&body))
    }
}

#[async_trait]
impl ComputationService for LznkClient {
    async fn calculate(&self, request: &ComputeRequest) -> Result<ComputeOutcome, ServiceError> {
        let rates = self.fetch_nisab(&request.year).await;
        Ok(evaluate(request, &rates))
    }

    async fn nisab_info(
        &self,
        year: &str,
        calendar: CalendarSystem,
    ) -> Result<String, ServiceError> {
        let rates = self.fetch_nisab(year).await;
        Ok(format_nisab_info(year, calendar, &rates))
    }
}

// ── Response parsing ────────────────────────────────────────────────

fn year_rx() -> &'static Regex {
    static RX: OnceLock<Regex> = OnceLock::new();
    RX.get_or_init(|| Regex::new(r"\d{3,4}").expect("static regex"))
}

fn json_block_rx() -> &'static Regex {
    static RX: OnceLock<Regex> = OnceLock::new();
    RX.get_or_init(|| Regex::new(r"(?s)\{.*\}|\[.*\]").expect("static regex"))
}

/// Parse a year-list body: JSON array of strings/numbers, or a salvage pass
/// extracting 3-4 digit years from plain text.
fn parse_year_list(body: &str) -> Vec<String> {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(items) = value.as_array() {
            let years: Vec<String> = items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.trim().to_string()),
                    Value::Number(n) => Some(n.to_string()),
                    Value::Object(obj) => obj
                        .get("tahun")
                        .map(|t| t.as_str().map(str::to_string).unwrap_or_else(|| t.to_string())),
                    _ => None,
                })
                .collect();
            if !years.is_empty() {
                return years;
            }
        }
    }
    year_rx()
        .find_iter(body)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Parse a nisab body: direct JSON, or the first JSON block embedded in
/// HTML/plain text. A list takes its first element.
fn parse_nisab_body(body: &str) -> Option<NisabRates> {
    let value: Value = serde_json::from_str(body).ok().or_else(|| {
        let block = json_block_rx().find(body)?;
        serde_json::from_str(block.as_str()).ok()
    })?;

    let data = match value {
        Value::Array(items) => items.into_iter().find(|v| v.is_object())?,
        v @ Value::Object(_) => v,
        _ => return None,
    };

    let income = decimal_field(&data, "nisab_pendapatan")?;
    let savings = decimal_field(&data, "nisab_simpanan").unwrap_or(income);
    let rate_percent = decimal_field(&data, "kadar_zakat").unwrap_or(DEFAULT_RATE_PERCENT);
    Some(NisabRates {
        income,
        savings,
        rate: rate_percent / dec!(100),
        fallback: false,
    })
}

fn decimal_field(data: &Value, key: &str) -> Option<Decimal> {
    match data.get(key)? {
        Value::Number(n) => n.to_string().parse().ok(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ── Computation ─────────────────────────────────────────────────────

/// Apply the variant's arithmetic against the year's nisab figures.
fn evaluate(request: &ComputeRequest, rates: &NisabRates) -> ComputeOutcome {
    let (label, subject, base, nisab) = match &request.query {
        ZakatQuery::Pendapatan { amount, expenses } => (
            "pendapatan",
            "Pendapatan bersih anda",
            (*amount - *expenses).max(Decimal::ZERO),
            rates.income,
        ),
        ZakatQuery::Simpanan { amount } => ("simpanan", "Simpanan anda", *amount, rates.savings),
        ZakatQuery::Padi { amount } => ("padi", "Hasil padi anda", *amount, rates.income),
        ZakatQuery::Saham { amount, debt } => (
            "saham",
            "Nilai saham bersih anda",
            (*amount - *debt).max(Decimal::ZERO),
            rates.income,
        ),
        ZakatQuery::Perak {
            weight_grams,
            price_per_gram,
        } => (
            "perak",
            "Nilai perak anda",
            *weight_grams * *price_per_gram,
            SILVER_NISAB_GRAMS * *price_per_gram,
        ),
        ZakatQuery::Kwsp {
            account1,
            account2,
            withdrawal,
        } => (
            "kwsp",
            "Simpanan KWSP anda",
            (*account1 + *account2 - *withdrawal).max(Decimal::ZERO),
            rates.savings,
        ),
        ZakatQuery::NisabInfo => ("nisab", "Jumlah anda", Decimal::ZERO, rates.income),
    };

    let meets_nisab = base > Decimal::ZERO && base >= nisab;
    let amount = if meets_nisab {
        (base * rates.rate).round_dp(2)
    } else {
        Decimal::ZERO
    };

    let year = &request.year;
    let calendar = request.calendar.label();
    let rate_percent = (rates.rate * dec!(100)).normalize();
    let mut message = if meets_nisab {
        format!(
            "✅ **{subject} mencapai nisab**\n\n\
             💰 **Jumlah Zakat: RM{}**\n\n\
             📊 **Butiran Pengiraan:**\n\
             • Jumlah dikira: RM{}\n\
             • Nisab ({year} {calendar}): RM{}\n\
             • Kadar zakat: {rate_percent}%",
            fmt_rm(amount),
            fmt_rm(base),
            fmt_rm(nisab),
        )
    } else {
        format!(
            "ℹ️ **{subject} belum mencapai nisab**\n\n\
             Tiada zakat perlu dibayar pada masa ini.\n\n\
             📊 **Butiran:**\n\
             • Jumlah dikira: RM{}\n\
             • Nisab ({year} {calendar}): RM{}\n\
             • Kekurangan: RM{}",
            fmt_rm(base),
            fmt_rm(nisab),
            fmt_rm((nisab - base).max(Decimal::ZERO)),
        )
    };
    if rates.fallback {
        message.push_str("\n\nℹ️ Nilai nisab lalai digunakan (rangkaian gagal).");
    }

    ComputeOutcome {
        amount,
        meets_nisab,
        resolved_type: label.to_string(),
        message,
    }
}

fn format_nisab_info(year: &str, calendar: CalendarSystem, rates: &NisabRates) -> String {
    let rate_percent = (rates.rate * dec!(100)).normalize();
    let mut message = format!(
        "📊 **Maklumat Nisab Tahun {year} ({})**\n\n\
         **Nisab Pendapatan/Simpanan:**\n\
         • RM{} setahun\n\n\
         **Kadar Zakat:**\n\
         • {rate_percent}%",
        calendar.label(),
        fmt_rm(rates.income),
    );
    if rates.fallback {
        message.push_str("\n\nℹ️ Nilai nisab lalai digunakan (rangkaian gagal).");
    }
    message
}

/// Format a ringgit amount with two decimals and thousands separators.
fn fmt_rm(value: Decimal) -> String {
    let rendered = format!("{:.2}", value.round_dp(2));
    let (int_part, frac_part) = rendered.split_once('.').unwrap_or((rendered.as_str(), "00"));
    let negative = int_part.starts_with('-');
    let digits = int_part.trim_start_matches('-');
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!(
        "{}{grouped}.{frac_part}",
        if negative { "-" } else { "" }
    )
}
