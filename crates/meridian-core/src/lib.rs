//! # Meridian Core
//!
//! Pure domain logic for the Meridian POS billing and inventory engine.
//! This crate contains NO I/O — no database, no network, no filesystem.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Crate Dependency Graph                           │
//! │                                                                         │
//! │                      ┌──────────────────┐                               │
//! │                      │  meridian-engine │   operations + transactions   │
//! │                      └────────┬─────────┘                               │
//! │                               │                                         │
//! │                      ┌────────▼─────────┐                               │
//! │                      │   meridian-db    │   SQLite repositories         │
//! │                      └────────┬─────────┘                               │
//! │                               │                                         │
//! │                      ┌────────▼─────────┐                               │
//! │                      │  meridian-core   │   ◄── YOU ARE HERE            │
//! │                      │   (this crate)   │   types, money, billing math  │
//! │                      └──────────────────┘                               │
//! │                                                                         │
//! │  Rule: meridian-core depends on NOTHING in the workspace.               │
//! │  All domain types and arithmetic live here so that storage and          │
//! │  engine layers agree on one definition of "correct".                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Overview
//! | Module       | Purpose                                            |
//! |--------------|----------------------------------------------------|
//! | `types`      | Product, Customer, Invoice, LineItem, enums        |
//! | `money`      | Integer-cent `Money` with tax arithmetic           |
//! | `billing`    | Line charges and incremental invoice totals        |
//! | `validation` | Field and range validation for engine inputs       |
//! | `error`      | `ValidationError`                                  |

pub mod billing;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// Re-export commonly used types at crate root
pub use billing::{charges_of, line_charges, InvoiceTotals, LineCharges};
pub use error::{ValidationError, ValidationResult};
pub use money::Money;
pub use types::{
    Customer, CustomerType, Invoice, InvoiceStatus, LineItem, Product, ProductStatus, TaxRate,
};

// =============================================================================
// Domain Constants
// =============================================================================

/// Maximum number of lines a single invoice may hold.
pub const MAX_INVOICE_LINES: usize = 100;

/// Maximum quantity for a single invoice line.
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Stock level at or below which a product counts as low-stock.
pub const LOW_STOCK_THRESHOLD: i64 = 5;
