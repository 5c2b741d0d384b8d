//! # Repository Module
//!
//! Database repository implementations for Meridian POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  Engine operation                                                      │
//! │       │                                                                 │
//! │       │  db.products().get_by_barcode("branch-1", "890123")            │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  ProductRepository                                                     │
//! │  ├── get_by_barcode(&self, branch_id, barcode)      ← pool read        │
//! │  ├── insert(&self, product)                          ← pool write       │
//! │  └── adjust_stock(conn, branch_id, id, delta)        ← in-transaction   │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Write methods that must compose with other writes take a              │
//! │  `&mut SqliteConnection` so the engine can run them inside ONE         │
//! │  transaction per operation.                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`] - Catalog CRUD and guarded stock adjustment
//! - [`InvoiceRepository`] - Invoice and line-item operations
//! - [`CustomerRepository`] - Customer directory

pub mod customer;
pub mod invoice;
pub mod product;

pub use customer::CustomerRepository;
pub use invoice::InvoiceRepository;
pub use product::{ProductRepository, ProductUpdate, StockAdjustOutcome, StockSummary};
