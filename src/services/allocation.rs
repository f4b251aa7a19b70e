//! Split an amount into cent-exact parts.
//!
//! Uses the largest remainder method: every part is rounded down to the cent,
//! then the leftover cents go to the parts with the largest fractional
//! remainders (earlier parts win ties). The parts always sum to the rounded total.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::{AppError, AppResult};
use crate::money::{checked_sum, overflow, round_money};

/// `total` split evenly across `count` parts.
pub fn allocate_equal(total: Decimal, count: usize) -> AppResult<Vec<Decimal>> {
    allocate_weighted(total, &vec![Decimal::ONE; count])
}

/// `total` split in proportion to `weights`.
///
/// Negative weights count as zero. When no weight is positive the split is even.
pub fn allocate_proportional(total: Decimal, weights: &[Decimal]) -> AppResult<Vec<Decimal>> {
    let clamped: Vec<Decimal> = weights.iter().map(|w| (*w).max(Decimal::ZERO)).collect();
    if clamped.iter().all(|w| w.is_zero()) {
        return allocate_equal(total, weights.len());
    }
    allocate_weighted(total, &clamped)
}

fn total_in_cents(total: Decimal) -> AppResult<i64> {
    round_money(total)
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.to_i64())
        .ok_or_else(|| AppError::Validation(format!("Amount {} is too large to split", total)))
}

fn allocate_weighted(total: Decimal, weights: &[Decimal]) -> AppResult<Vec<Decimal>> {
    if weights.is_empty() {
        return Ok(Vec::new());
    }

    let total_cents = total_in_cents(total)?;
    let negative = total_cents < 0;
    let total_abs = Decimal::from(total_cents.unsigned_abs());
    let weight_sum = checked_sum(weights.iter().copied(), "allocation weights")?;

    let mut parts: Vec<Decimal> = Vec::with_capacity(weights.len());
    let mut fractions: Vec<(usize, Decimal)> = Vec::with_capacity(weights.len());
    for (idx, weight) in weights.iter().enumerate() {
        // Share first: the ratio stays within 0..=1, so the product cannot overflow.
        let exact = weight
            .checked_div(weight_sum)
            .and_then(|share| total_abs.checked_mul(share))
            .ok_or_else(|| overflow("allocation"))?;
        let base = exact.floor();
        parts.push(base);
        fractions.push((idx, exact - base));
    }

    let allocated = checked_sum(parts.iter().copied(), "allocation")?;
    let leftover = (total_abs - allocated).to_usize().unwrap_or(0);

    fractions.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    for (idx, _) in fractions.into_iter().take(leftover) {
        parts[idx] += Decimal::ONE;
    }

    Ok(parts
        .into_iter()
        .map(|cents| {
            let value = cents / Decimal::ONE_HUNDRED;
            round_money(if negative { -value } else { value })
        })
        .collect())
}
