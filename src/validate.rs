//! Pure input validation rules for free-text answers.
//!
//! Malformed input is a normal, expected outcome: each rule returns either
//! the normalized value or an [`Invalid`] carrying the Malay notice shown
//! alongside the re-prompt. Rules never touch session state.

use std::str::FromStr;

use rust_decimal::Decimal;

/// A rejected answer, carrying the user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct Invalid(pub &'static str);

const MSG_AMOUNT: &str = "Sila masukkan nilai yang sah (nombor sahaja).";
const MSG_NEGATIVE: &str = "Nilai tidak boleh negatif.";
const MSG_NAME: &str = "Nama tidak sah atau terlalu pendek.";
const MSG_IC: &str = "Nombor IC mesti 12 digit tanpa tanda sempang.";
const MSG_PHONE: &str = "Nombor telefon tidak sah.";

/// Strip currency markers, thousands separators, and whitespace.
fn strip_amount(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect();
    let upper = cleaned.to_ascii_uppercase();
    if let Some(rest) = upper.strip_prefix("RM") {
        // preserve the original casing of the numeric part (digits only anyway)
        cleaned[cleaned.len() - rest.len()..].to_string()
    } else {
        cleaned
    }
}

/// Parse a currency amount. Rejects unparseable or negative input.
pub fn amount(raw: &str) -> Result<Decimal, Invalid> {
    let cleaned = strip_amount(raw);
    if cleaned.is_empty() {
        return Err(Invalid(MSG_AMOUNT));
    }
    let value = Decimal::from_str(&cleaned).map_err(|_| Invalid(MSG_AMOUNT))?;
    if value.is_sign_negative() {
        return Err(Invalid(MSG_NEGATIVE));
    }
    Ok(value)
}

/// Currency amount where blank input means "none" and yields zero.
///
/// Used for optional fields such as outstanding equity debt or a KWSP
/// withdrawal already made.
pub fn amount_or_zero(raw: &str) -> Result<Decimal, Invalid> {
    if strip_amount(raw).is_empty() {
        return Ok(Decimal::ZERO);
    }
    amount(raw)
}

/// Full name: trimmed, at least 3 characters.
pub fn full_name(raw: &str) -> Result<String, Invalid> {
    let name = raw.trim();
    if name.chars().count() < 3 {
        return Err(Invalid(MSG_NAME));
    }
    Ok(name.to_string())
}

/// Malaysian identity-card number: exactly 12 digits after stripping
/// hyphens and spaces.
pub fn ic_number(raw: &str) -> Result<String, Invalid> {
    let digits: String = raw.chars().filter(|c| *c != '-' && *c != ' ').collect();
    if digits.len() == 12 && digits.chars().all(|c| c.is_ascii_digit()) {
        Ok(digits)
    } else {
        Err(Invalid(MSG_IC))
    }
}

/// Malaysian phone number, normalized to the local leading-zero form.
///
/// `+60…` and `60…` country prefixes are rewritten to `0…`; the result must
/// be a leading zero followed by 9-10 digits.
pub fn phone(raw: &str) -> Result<String, Invalid> {
    let mut number: String = raw
        .chars()
        .filter(|c| *c != ' ' && *c != '-')
        .collect();
    if let Some(rest) = number.strip_prefix('+') {
        number = rest.to_string();
    }
    if number.starts_with("60") && number.len() >= 11 {
        number = format!("0{}", &number[2..]);
    }
    let valid = number.starts_with('0')
        && (10..=11).contains(&number.len())
        && number.chars().all(|c| c.is_ascii_digit());
    if valid { Ok(number) } else { Err(Invalid(MSG_PHONE)) }
}
