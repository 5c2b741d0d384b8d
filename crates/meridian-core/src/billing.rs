//! # Billing Math
//!
//! Pure computation behind the billing engine: line charges and invoice
//! totals. Nothing in this module touches storage; the engine calls
//! these functions inside its transactions so both sides of every
//! mutation use identical arithmetic.
//!
//! ## Charge Formula
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  For a line with unit price P, quantity Q and tax rate T (bps):        │
//! │                                                                         │
//! │    subtotal = P × Q                                                     │
//! │    tax      = round(P × Q × T / 10000)     (single rounding step)       │
//! │    total    = subtotal + tax                                            │
//! │                                                                         │
//! │  Invoice totals are the exact sums of their lines' contributions,      │
//! │  maintained incrementally:                                              │
//! │                                                                         │
//! │    add line     → totals += contribution                                │
//! │    remove line  → totals -= contribution                                │
//! │    change qty   → totals -= old; recompute; totals += new               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{LineItem, TaxRate};

// =============================================================================
// Line Charges
// =============================================================================

/// The monetary outcome of pricing one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineCharges {
    /// Pre-tax amount: `unit_price * quantity`.
    pub subtotal: Money,
    /// Tax on the full line amount.
    pub tax: Money,
    /// `subtotal + tax`.
    pub total: Money,
}

/// Prices a line: `unit_price * quantity` plus tax at `rate`.
///
/// Tax is computed once, from the full line amount. The same function is
/// used when a line is first scanned and when its quantity is updated
/// (at the frozen unit price and rate), so a quantity round-trip always
/// restores the original charges exactly.
pub fn line_charges(unit_price: Money, quantity: i64, rate: TaxRate) -> LineCharges {
    let subtotal = unit_price.multiply_quantity(quantity);
    let tax = subtotal.calculate_tax(rate);
    LineCharges {
        subtotal,
        tax,
        total: subtotal + tax,
    }
}

// =============================================================================
// Invoice Totals
// =============================================================================

/// Aggregate invoice totals, maintained incrementally per mutation.
///
/// ## Invariant
/// `total == subtotal + tax` holds by construction: `total` is never
/// assigned independently of the other two fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceTotals {
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
}

impl InvoiceTotals {
    /// Zero totals for a freshly created invoice.
    pub const fn zero() -> Self {
        InvoiceTotals {
            subtotal_cents: 0,
            tax_cents: 0,
            total_cents: 0,
        }
    }

    /// Adds a line's contribution.
    pub fn add(&mut self, charges: LineCharges) {
        self.subtotal_cents += charges.subtotal.cents();
        self.tax_cents += charges.tax.cents();
        self.total_cents += charges.total.cents();
    }

    /// Removes a line's contribution.
    pub fn remove(&mut self, charges: LineCharges) {
        self.subtotal_cents -= charges.subtotal.cents();
        self.tax_cents -= charges.tax.cents();
        self.total_cents -= charges.total.cents();
    }

    /// Recomputes totals from scratch over a set of lines.
    ///
    /// Used by tests to assert that the incrementally maintained totals
    /// never drift from the ground truth.
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a LineItem>) -> Self {
        let mut totals = InvoiceTotals::zero();
        for line in lines {
            totals.subtotal_cents += line.subtotal_cents();
            totals.tax_cents += line.tax_cents;
            totals.total_cents += line.subtotal_cents() + line.tax_cents;
        }
        totals
    }
}

/// The charges a stored line currently represents, reconstructed from
/// its frozen snapshot fields.
pub fn charges_of(line: &LineItem) -> LineCharges {
    LineCharges {
        subtotal: Money::from_cents(line.subtotal_cents()),
        tax: Money::from_cents(line.tax_cents),
        total: Money::from_cents(line.total_cents),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_charges_basic() {
        // price 100.00, qty 3, tax 10% → tax 30.00, total 330.00
        let charges = line_charges(Money::from_cents(10000), 3, TaxRate::from_bps(1000));
        assert_eq!(charges.subtotal.cents(), 30000);
        assert_eq!(charges.tax.cents(), 3000);
        assert_eq!(charges.total.cents(), 33000);
    }

    #[test]
    fn test_line_charges_quantity_update() {
        // Same unit price and rate, new quantity 5 → tax 50.00, total 550.00
        let charges = line_charges(Money::from_cents(10000), 5, TaxRate::from_bps(1000));
        assert_eq!(charges.subtotal.cents(), 50000);
        assert_eq!(charges.tax.cents(), 5000);
        assert_eq!(charges.total.cents(), 55000);
    }

    #[test]
    fn test_totals_add_remove_round_trip() {
        let charges = line_charges(Money::from_cents(1099), 4, TaxRate::from_bps(825));

        let mut totals = InvoiceTotals::zero();
        totals.add(charges);
        assert_eq!(
            totals.total_cents,
            totals.subtotal_cents + totals.tax_cents
        );

        totals.remove(charges);
        assert_eq!(totals, InvoiceTotals::zero());
    }

    #[test]
    fn test_totals_sum_invariant_over_many_lines() {
        let mut totals = InvoiceTotals::zero();
        let cases = [
            (10000_i64, 3_i64, 1000_u32),
            (1099, 1, 825),
            (50, 999, 0),
            (333, 7, 1750),
        ];

        for (price, qty, bps) in cases {
            totals.add(line_charges(
                Money::from_cents(price),
                qty,
                TaxRate::from_bps(bps),
            ));
        }

        assert_eq!(
            totals.total_cents,
            totals.subtotal_cents + totals.tax_cents
        );
    }

    #[test]
    fn test_zero_tax_line() {
        let charges = line_charges(Money::from_cents(500), 2, TaxRate::zero());
        assert_eq!(charges.tax.cents(), 0);
        assert_eq!(charges.total.cents(), 1000);
    }
}
