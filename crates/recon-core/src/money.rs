//! # Money Module
//!
//! Provides the `Money` type for unit prices on stock movements.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    Prices live in the smallest currency unit from the moment they      │
//! │    are parsed. The stock log only ever sees whole minor units.         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use recon_core::money::Money;
//!
//! let price = Money::from_cents(1099);
//! assert_eq!(price.to_string(), "10.99");
//!
//! // Decimal input is rounded once, at the boundary
//! let parsed = Money::parse_decimal("10.995").unwrap();
//! assert_eq!(parsed.cents(), 1100);
//! ```
//!
//! Money is currency-neutral: no symbol or locale is attached here.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{LedgerError, LedgerResult};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: the ledger never produces negative prices, but
///   upstream price feeds may; callers check with [`Money::is_positive`]
/// - **Single field tuple struct**: zero-cost abstraction over i64
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use recon_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns zero.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is strictly positive.
    ///
    /// The stock log rejects anything else, so every price that reaches it
    /// has passed this check.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Returns `Some(self)` when strictly positive.
    #[inline]
    pub fn positive(self) -> Option<Self> {
        if self.is_positive() {
            Some(self)
        } else {
            None
        }
    }

    /// Parses a decimal major-unit string ("12.5", "0.999") into minor units,
    /// rounding half away from zero to two decimal places.
    ///
    /// ## Rounding
    /// ```text
    /// "10.994" → 1099
    /// "10.995" → 1100
    /// "-1.005" → -101
    /// ```
    pub fn parse_decimal(input: &str) -> LedgerResult<Self> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(LedgerError::missing("unit_price"));
        }

        let invalid = || LedgerError::invalid_input("unit_price", format!("'{}' is not a decimal amount", raw));

        let (negative, digits) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let whole_value: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };

        // First two fractional digits are kept, the third decides rounding.
        let mut frac_digits = frac.chars().filter_map(|c| c.to_digit(10)).map(i64::from);
        let tenths = frac_digits.next().unwrap_or(0);
        let hundredths = frac_digits.next().unwrap_or(0);
        let round_up = frac_digits.next().map(|d| d >= 5).unwrap_or(false);

        let mut cents = whole_value
            .checked_mul(100)
            .and_then(|v| v.checked_add(tenths * 10 + hundredths))
            .ok_or_else(invalid)?;
        if round_up {
            cents += 1;
        }

        Ok(Money(if negative { -cents } else { cents }))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows the amount with two decimal places and no currency symbol.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
