//! # Meridian Engine
//!
//! The billing / inventory consistency engine. This crate is the only
//! entry point for mutating operations: callers construct the services
//! over one [`Database`](meridian_db::Database) and invoke typed,
//! branch-scoped operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Crate Dependency Graph                           │
//! │                                                                         │
//! │                      ┌──────────────────┐                               │
//! │                      │  meridian-engine │   ◄── YOU ARE HERE            │
//! │                      │   (this crate)   │   operations + transactions   │
//! │                      └────────┬─────────┘                               │
//! │                               │                                         │
//! │                      ┌────────▼─────────┐                               │
//! │                      │   meridian-db    │   SQLite repositories         │
//! │                      └────────┬─────────┘                               │
//! │                               │                                         │
//! │                      ┌────────▼─────────┐                               │
//! │                      │  meridian-core   │   types, money, billing math  │
//! │                      └──────────────────┘                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## The Consistency Guarantee
//! Product stock and draft invoices are kept mutually consistent:
//! every unit on a draft line has already been removed from stock, and
//! every removed line puts its units back. Each mutating operation is
//! a single database transaction; on any error, nothing is applied.
//!
//! ## Services
//! | Service             | Purpose                                     |
//! |---------------------|---------------------------------------------|
//! | [`BillingEngine`]   | Draft invoices: scan, update, complete      |
//! | [`CatalogService`]  | Product CRUD, stock receipts, low stock     |
//! | [`CustomerDirectory`] | Customer records (B2B/B2C tiers)          |
//!
//! ## Usage
//! ```rust,ignore
//! use meridian_db::{Database, DbConfig};
//! use meridian_engine::{BillingEngine, RequestContext};
//!
//! let db = Database::new(DbConfig::new("./meridian.db")).await?;
//! let billing = BillingEngine::new(db.clone());
//! let ctx = RequestContext::new("branch-1", "user-7");
//!
//! let invoice = billing.create_invoice(&ctx, &customer_id).await?;
//! let invoice = billing
//!     .add_item_by_barcode(&ctx, &invoice.id, "8900000000001", 2)
//!     .await?;
//! billing.complete_invoice(&ctx, &invoice.id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod billing;
pub mod catalog;
pub mod context;
pub mod customers;
pub mod error;

// =============================================================================
// Re-exports
// =============================================================================

pub use billing::{BillingEngine, CustomerSummary, InvoiceDetail, InvoiceLine};
pub use catalog::{CatalogService, NewProduct};
pub use context::RequestContext;
pub use customers::{CustomerDirectory, NewCustomer};
pub use error::{EngineError, EngineResult, ErrorCode};

// Callers build updates from the repository's allow-listed struct.
pub use meridian_db::ProductUpdate;
