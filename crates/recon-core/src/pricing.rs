//! # Unit-Price Defaulting
//!
//! Every stock movement needs a strictly positive unit price. Actions may
//! omit one, so the ledger falls back through known prices.
//!
//! ## Resolution Order
//! ```text
//! explicit action price  (> 0) ──┐
//! record's last price    (> 0) ──┤
//! SKU catalog price      (> 0) ──┼──► first match wins
//! nominal placeholder          ──┘    (never zero)
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::money::Money;

/// Placeholder used when no positive price is known: one minor unit.
pub const DEFAULT_PLACEHOLDER_PRICE: Money = Money::from_cents(1);

/// Where a resolved price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    Explicit,
    Record,
    Catalog,
    Placeholder,
}

/// A unit price guaranteed to be positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPrice {
    pub price: Money,
    pub source: PriceSource,
}

/// Fallback policy for unit prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricePolicy {
    placeholder: Money,
}

impl PricePolicy {
    /// Creates a policy with the given placeholder.
    ///
    /// The placeholder itself must be positive or the policy could hand the
    /// stock log a zero price.
    pub fn new(placeholder: Money) -> LedgerResult<Self> {
        if !placeholder.is_positive() {
            return Err(LedgerError::invalid_input(
                "placeholder_unit_price",
                "must be greater than zero",
            ));
        }
        Ok(PricePolicy { placeholder })
    }

    /// Returns the placeholder price.
    pub fn placeholder(&self) -> Money {
        self.placeholder
    }

    /// Picks the first strictly positive price.
    pub fn resolve(
        &self,
        explicit: Option<Money>,
        record_price: Money,
        catalog_price: Option<Money>,
    ) -> ResolvedPrice {
        if let Some(price) = explicit.and_then(Money::positive) {
            return ResolvedPrice {
                price,
                source: PriceSource::Explicit,
            };
        }
        if let Some(price) = record_price.positive() {
            return ResolvedPrice {
                price,
                source: PriceSource::Record,
            };
        }
        if let Some(price) = catalog_price.and_then(Money::positive) {
            return ResolvedPrice {
                price,
                source: PriceSource::Catalog,
            };
        }
        ResolvedPrice {
            price: self.placeholder,
            source: PriceSource::Placeholder,
        }
    }
}

impl Default for PricePolicy {
    fn default() -> Self {
        PricePolicy {
            placeholder: DEFAULT_PLACEHOLDER_PRICE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_price_wins() {
        let policy = PricePolicy::default();
        let resolved = policy.resolve(
            Some(Money::from_cents(900)),
            Money::from_cents(500),
            Some(Money::from_cents(700)),
        );
        assert_eq!(resolved.price.cents(), 900);
        assert_eq!(resolved.source, PriceSource::Explicit);
    }

    #[test]
    fn test_non_positive_prices_fall_through() {
        let policy = PricePolicy::default();

        let resolved = policy.resolve(Some(Money::zero()), Money::from_cents(500), None);
        assert_eq!(resolved.source, PriceSource::Record);

        let resolved = policy.resolve(None, Money::zero(), Some(Money::from_cents(700)));
        assert_eq!(resolved.price.cents(), 700);
        assert_eq!(resolved.source, PriceSource::Catalog);

        let resolved = policy.resolve(
            Some(Money::from_cents(-5)),
            Money::zero(),
            Some(Money::zero()),
        );
        assert_eq!(resolved.price, DEFAULT_PLACEHOLDER_PRICE);
        assert_eq!(resolved.source, PriceSource::Placeholder);
    }

    #[test]
    fn test_placeholder_must_be_positive() {
        assert!(PricePolicy::new(Money::zero()).is_err());
        assert_eq!(
            PricePolicy::new(Money::from_cents(10)).unwrap().placeholder().cents(),
            10
        );
    }
}
