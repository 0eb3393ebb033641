//! Proportional scaling of raw votes to a session budget.
//!
//! Voters may type any non-negative numbers; only their proportions matter.
//! With `sum` the total of the raw values:
//!
//! - `sum == 0` means the voter withdrew every vote
//! - otherwise each item gets `floor(raw / (sum / budget))`
//!
//! The quotient is evaluated as `floor(raw * budget / sum)` in decimal
//! arithmetic, dividing first only when the product would overflow. Flooring each item independently can leave up to
//! `item_count - 1` votes of the budget unallocated.

use crate::error::{Error, Result};
use crate::models::Allocation;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::num::NonZeroU32;

/// Validated raw votes of one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawVotes {
    values: BTreeMap<String, Decimal>,
}

impl RawVotes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parsed value. A repeated key replaces the earlier value.
    pub fn insert(&mut self, item_key: impl Into<String>, value: Decimal) -> Result<()> {
        if value < Decimal::ZERO {
            return Err(invalid_value());
        }
        self.values.insert(item_key.into(), value);
        Ok(())
    }

    /// Parse and add a value as typed by the voter.
    pub fn insert_raw(&mut self, item_key: impl Into<String>, raw: &str) -> Result<()> {
        self.insert(item_key, parse_raw_value(raw)?)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Total of all values.
    pub fn sum(&self) -> Result<Decimal> {
        self.values
            .values()
            .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
            .ok_or_else(out_of_range)
    }
}

/// Result of scaling a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scaled {
    /// Every raw value was zero: remove all of the voter's records.
    Withdrawal,
    /// Budget-normalized votes to store.
    Allocation(Allocation),
}

/// Digits in the largest representable decimal.
const DECIMAL_DIGITS: i64 = 29;

/// Lexical shape of a typed number: optional sign, digits with at most one
/// point, optional exponent.
struct NumberShape<'a> {
    negative: bool,
    unsigned: &'a str,
    mantissa: &'a str,
    exponent: Option<i64>,
}

impl<'a> NumberShape<'a> {
    fn parse(text: &'a str) -> Option<Self> {
        let (negative, unsigned) = match text.as_bytes().first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            _ => (false, text),
        };
        let (mantissa, exponent) = match unsigned.find(|c: char| c == 'e' || c == 'E') {
            Some(pos) => (&unsigned[..pos], Some(unsigned[pos + 1..].parse::<i64>().ok()?)),
            None => (unsigned, None),
        };

        let digits = mantissa.chars().filter(char::is_ascii_digit).count();
        let points = mantissa.chars().filter(|c| *c == '.').count();
        if digits == 0 || points > 1 || digits + points != mantissa.len() {
            return None;
        }

        Some(Self {
            negative,
            unsigned,
            mantissa,
            exponent,
        })
    }

    fn is_zero(&self) -> bool {
        !self.mantissa.contains(|c: char| ('1'..='9').contains(&c))
    }

    /// Count of integer digits of the value, negative for small fractions.
    fn magnitude(&self) -> i64 {
        let point = self.mantissa.find('.').unwrap_or(self.mantissa.len());
        let first = self
            .mantissa
            .find(|c: char| ('1'..='9').contains(&c))
            .unwrap_or(point);
        let digits = if first < point {
            (point - first) as i64
        } else {
            point as i64 - first as i64 + 1
        };
        digits.saturating_add(self.exponent.unwrap_or(0))
    }
}

/// Parse one raw vote.
///
/// Blank input counts as zero. Plain decimals and scientific notation are
/// accepted; anything negative or non-numeric is rejected. A positive value
/// that cannot be represented without losing its digits is rejected rather
/// than rounded, so it never reads as zero.
pub fn parse_raw_value(raw: &str) -> Result<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Decimal::ZERO);
    }

    let shape = NumberShape::parse(trimmed).ok_or_else(invalid_value)?;
    if shape.is_zero() {
        return Ok(Decimal::ZERO);
    }
    if shape.negative {
        return Err(invalid_value());
    }

    let parsed = match shape.exponent {
        None => Decimal::from_str_exact(shape.unsigned),
        Some(_) => Decimal::from_scientific(shape.unsigned),
    };
    match parsed {
        Ok(value) if !value.is_zero() => Ok(value),
        _ if shape.magnitude() >= DECIMAL_DIGITS => Err(out_of_range()),
        _ => Err(too_precise()),
    }
}

/// Scale raw votes so that together they approximate `budget`.
pub fn scale(raw: &RawVotes, budget: NonZeroU32) -> Result<Scaled> {
    let sum = raw.sum()?;
    if sum.is_zero() {
        return Ok(Scaled::Withdrawal);
    }

    let budget = Decimal::from(budget.get());
    let mut allocation = Allocation::new();
    for (item_key, value) in &raw.values {
        let scaled = value
            .checked_mul(budget)
            .and_then(|v| v.checked_div(sum))
            // Near the top of the decimal range the product overflows
            .or_else(|| value.checked_div(sum).and_then(|share| share.checked_mul(budget)))
            .ok_or_else(out_of_range)?;
        let votes = scaled.floor().to_u64().ok_or_else(out_of_range)?;
        allocation.insert(item_key.clone(), votes);
    }

    Ok(Scaled::Allocation(allocation))
}

fn invalid_value() -> Error {
    Error::Validation("Each vote should be a number that is zero or greater".to_string())
}

fn out_of_range() -> Error {
    Error::Validation("Vote values are too large".to_string())
}

fn too_precise() -> Error {
    Error::Validation("Vote values have too many decimal places".to_string())
}
