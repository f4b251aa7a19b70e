//! Numeric coercion and fixed-point formatting for planned amounts.
//!
//! The coercion helpers never fail: bad input becomes zero or `None`.
//! Range and overflow checks live at the bottom and return [`AppError`].

use std::str::FromStr;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{AppError, AppResult};

/// Largest absolute planned amount accepted on write.
pub const MAX_PLANNED_AMOUNT: i64 = 1_000_000_000_000;

/// Round to cents, half away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Coerce a loosely typed value (number, numeric string, null) into a decimal.
pub fn to_number(value: &Value) -> Decimal {
    match value {
        Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
                .or_else(|| n.as_f64().and_then(Decimal::from_f64))
                .unwrap_or(Decimal::ZERO)
        }
        Value::String(s) => parse_amount(s),
        _ => Decimal::ZERO,
    }
}

/// Parse a plain decimal string (`"12.5"`, `" -3 "`); anything else is zero.
pub fn parse_amount(text: &str) -> Decimal {
    let trimmed = text.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .unwrap_or(Decimal::ZERO)
}

/// Coerce an `f64` from an untyped source, mapping NaN and infinities to zero.
pub fn normalize_planned_amount(value: f64) -> Decimal {
    if !value.is_finite() {
        return Decimal::ZERO;
    }
    Decimal::from_f64(value).map(round_money).unwrap_or(Decimal::ZERO)
}

/// Persisted form: two decimals, no currency symbol.
pub fn to_money_string(value: Decimal) -> String {
    format!("{:.2}", round_money(value))
}

pub fn to_optional_money_string(value: Option<Decimal>) -> Option<String> {
    value.map(to_money_string)
}

/// Trim a note; blank notes are stored as NULL.
pub fn normalize_note(note: Option<&str>) -> Option<String> {
    note.map(str::trim)
        .filter(|n| !n.is_empty())
        .map(ToString::to_string)
}

/// Amounts written with `.` as thousands and `,` as decimal separator.
///
/// Dots are stripped before the comma becomes the decimal point, so `1.234,56`
/// reads as `1234.56`. Returns `None` when the result is not a number.
pub fn parse_locale_amount(text: &str) -> Option<Decimal> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| *c != '.' && !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}

/// Inverse of [`parse_locale_amount`]: comma decimal separator, no grouping.
pub fn to_locale_string(value: Decimal) -> String {
    to_money_string(value).replace('.', ",")
}

/// Serde helper for request fields that may be a number, a numeric string or null.
pub fn deserialize_money<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(to_number(&value))
}

/// Round to cents and reject amounts beyond [`MAX_PLANNED_AMOUNT`].
pub fn bounded_amount(value: Decimal) -> AppResult<Decimal> {
    let rounded = round_money(value);
    if rounded.abs() > Decimal::from(MAX_PLANNED_AMOUNT) {
        return Err(AppError::Validation(format!(
            "Amount {} is outside the accepted range of +/-{}",
            rounded, MAX_PLANNED_AMOUNT
        )));
    }
    Ok(rounded)
}

pub(crate) fn overflow(operation: &str) -> AppError {
    AppError::Internal(format!("Amount overflow in {}", operation))
}

/// Sum that reports overflow as an error instead of panicking.
pub fn checked_sum<I>(values: I, operation: &str) -> AppResult<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values.into_iter().try_fold(Decimal::ZERO, |acc, value| {
        acc.checked_add(value).ok_or_else(|| overflow(operation))
    })
}
