//! # Domain Types
//!
//! Core domain types used throughout Meridian POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    Invoice      │   │    Customer     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  barcode        │   │  invoice_number │   │  customer_type  │       │
//! │  │  quantity       │   │  status         │   │  (B2B / B2C)    │       │
//! │  │  b2b/b2c price  │   │  totals         │   │                 │       │
//! │  └─────────────────┘   └────────┬────────┘   └─────────────────┘       │
//! │                                 │ owns                                  │
//! │                        ┌────────┴────────┐                             │
//! │                        │    LineItem     │  snapshot of product        │
//! │                        │  price/tax/qty  │  at time of scan            │
//! │                        └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (barcode, invoice_number) - human-readable, branch-scoped

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1000 bps = 10.00% sales tax
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Product Status
// =============================================================================

/// Sale availability of a product.
///
/// Status is NOT independent state: it is derived from the on-hand
/// quantity (active iff quantity > 0) and recomputed by every write
/// that touches the quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    /// In stock and sellable.
    Active,
    /// Out of stock.
    Inactive,
}

impl ProductStatus {
    /// Derives the status for a given on-hand quantity.
    #[inline]
    pub const fn for_quantity(quantity: i64) -> Self {
        if quantity > 0 {
            ProductStatus::Active
        } else {
            ProductStatus::Inactive
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale within one branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Branch this product belongs to. All lookups are branch-scoped.
    pub branch_id: String,

    /// User who created the product.
    pub user_id: String,

    /// Barcode - business identifier, unique within the branch.
    pub barcode: String,

    /// Display name shown on invoices.
    pub name: String,

    /// Optional internal item code.
    pub item_code: Option<String>,

    /// Colour variant label.
    pub color: String,

    /// Size variant label (free-form: "M", "XL", "FREE", ...).
    pub size: String,

    /// Current on-hand quantity. Never negative.
    pub quantity: i64,

    /// Sale price in cents for B2B customers.
    pub b2b_price_cents: i64,

    /// Sale price in cents for B2C customers.
    pub b2c_price_cents: i64,

    /// Purchase (cost) price in cents.
    pub purchase_price_cents: i64,

    /// Sales tax rate in basis points (1000 = 10%).
    pub tax_rate_bps: u32,

    /// Derived availability (active iff quantity > 0).
    pub status: ProductStatus,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the sale price for the given customer tier.
    ///
    /// B2B customers get the trade price, everyone else the retail price.
    #[inline]
    pub fn price_for(&self, tier: CustomerType) -> Money {
        match tier {
            CustomerType::B2b => Money::from_cents(self.b2b_price_cents),
            CustomerType::B2c => Money::from_cents(self.b2c_price_cents),
        }
    }

    /// Returns the tax rate.
    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }

    /// Checks whether the requested quantity can be sold from stock.
    #[inline]
    pub fn has_stock(&self, quantity: i64) -> bool {
        self.quantity >= quantity
    }
}

// =============================================================================
// Customer
// =============================================================================

/// Price tier of a customer, drives unit-price selection on scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum CustomerType {
    /// Business customer - trade pricing.
    B2b,
    /// Retail customer - list pricing.
    B2c,
}

impl Default for CustomerType {
    fn default() -> Self {
        CustomerType::B2c
    }
}

/// A customer record. Read-only from the billing engine's perspective:
/// only `customer_type` matters for pricing, the rest is directory data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,
    pub branch_id: String,
    pub customer_type: CustomerType,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Invoice Status
// =============================================================================

/// The lifecycle status of an invoice.
///
/// The transition is one-way: Draft → Completed. A completed invoice is
/// frozen; no line-item mutation or deletion is permitted afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Invoice is being built (items being scanned).
    Draft,
    /// Invoice has been finalized and is immutable.
    Completed,
}

impl Default for InvoiceStatus {
    fn default() -> Self {
        InvoiceStatus::Draft
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// An in-progress or completed invoice.
///
/// ## Totals Invariant
/// After every mutation:
/// - `subtotal_cents == Σ line.unit_price_cents * line.quantity`
/// - `tax_cents      == Σ line.tax_cents`
/// - `total_cents    == subtotal_cents + tax_cents`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Invoice {
    pub id: String,
    pub branch_id: String,
    pub user_id: String,
    pub customer_id: String,
    /// Unique, time-derived business identifier with a random suffix.
    pub invoice_number: String,
    pub status: InvoiceStatus,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Invoice {
    /// Checks whether the invoice still accepts mutation.
    #[inline]
    pub fn is_draft(&self) -> bool {
        self.status == InvoiceStatus::Draft
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// A line item on an invoice.
/// Uses the snapshot pattern to freeze product data at time of scan.
///
/// ## Snapshot Pattern
/// Name, barcode, unit price and tax rate are copied from the product
/// when the line is added. A later catalog price change must NOT
/// retroactively alter an existing draft invoice's lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LineItem {
    pub id: String,
    pub invoice_id: String,
    /// 1-based append order. Rescanning the same barcode appends a new
    /// line rather than merging quantities; the lowest line_no is the
    /// one targeted by remove/update operations.
    pub line_no: i64,
    pub product_id: String,
    /// Product name at time of scan (frozen).
    pub name_snapshot: String,
    /// Barcode at time of scan (frozen).
    pub barcode_snapshot: String,
    /// Quantity sold. Always >= 1.
    pub quantity: i64,
    /// Tier-selected unit price in cents at time of scan (frozen).
    pub unit_price_cents: i64,
    /// Tax rate in basis points at time of scan (frozen).
    pub tax_rate_bps: u32,
    /// Tax for this line.
    pub tax_cents: i64,
    /// Line total including tax: `unit_price * quantity + tax`.
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl LineItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// The pre-tax amount this line contributes to the invoice subtotal.
    #[inline]
    pub fn subtotal_cents(&self) -> i64 {
        self.unit_price_cents * self.quantity
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_from_bps() {
        let rate = TaxRate::from_bps(1000);
        assert_eq!(rate.bps(), 1000);
        assert!((rate.percentage() - 10.0).abs() < 0.001);
    }

    #[test]
    fn test_tax_rate_from_percentage() {
        let rate = TaxRate::from_percentage(8.25);
        assert_eq!(rate.bps(), 825);
    }

    #[test]
    fn test_status_derived_from_quantity() {
        assert_eq!(ProductStatus::for_quantity(1), ProductStatus::Active);
        assert_eq!(ProductStatus::for_quantity(100), ProductStatus::Active);
        assert_eq!(ProductStatus::for_quantity(0), ProductStatus::Inactive);
    }

    #[test]
    fn test_invoice_status_default() {
        assert_eq!(InvoiceStatus::default(), InvoiceStatus::Draft);
    }

    #[test]
    fn test_price_tier_selection() {
        let now = Utc::now();
        let product = Product {
            id: "p1".to_string(),
            branch_id: "b1".to_string(),
            user_id: "u1".to_string(),
            barcode: "12345678".to_string(),
            name: "Shirt".to_string(),
            item_code: None,
            color: "Blue".to_string(),
            size: "M".to_string(),
            quantity: 10,
            b2b_price_cents: 8000,
            b2c_price_cents: 10000,
            purchase_price_cents: 6000,
            tax_rate_bps: 1000,
            status: ProductStatus::Active,
            created_at: now,
            updated_at: now,
        };

        assert_eq!(product.price_for(CustomerType::B2b).cents(), 8000);
        assert_eq!(product.price_for(CustomerType::B2c).cents(), 10000);
        assert!(product.has_stock(10));
        assert!(!product.has_stock(11));
    }
}
