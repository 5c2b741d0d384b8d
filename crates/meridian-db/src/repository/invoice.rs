//! # Invoice Repository
//!
//! Database operations for invoices and their line items.
//!
//! ## Invoice Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Invoice Lifecycle                                  │
//! │                                                                         │
//! │  1. CREATE DRAFT                                                       │
//! │     └── insert_invoice() → Invoice { status: Draft, totals: 0 }        │
//! │                                                                         │
//! │  2. MUTATE LINES (each step is ONE transaction with the stock write)   │
//! │     └── insert_item() + adjust_stock() + apply_totals_delta()          │
//! │     └── delete_item() + adjust_stock() + apply_totals_delta()          │
//! │     └── update_item_quantity() + adjust_stock() + apply_totals_delta() │
//! │                                                                         │
//! │  3. COMPLETE                                                           │
//! │     └── complete() → Invoice { status: Completed } (one-way)           │
//! │                                                                         │
//! │  Every status-sensitive UPDATE carries `AND status = 'draft'` so a     │
//! │  completed invoice is frozen at the database level, not just checked   │
//! │  in application code.                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use meridian_core::{Invoice, LineItem};

const INVOICE_COLUMNS: &str = r#"
    id, branch_id, user_id, customer_id, invoice_number, status,
    subtotal_cents, tax_cents, total_cents,
    created_at, updated_at, completed_at
"#;

const ITEM_COLUMNS: &str = r#"
    id, invoice_id, line_no, product_id, name_snapshot, barcode_snapshot,
    quantity, unit_price_cents, tax_rate_bps, tax_cents, total_cents, created_at
"#;

/// Repository for invoice database operations.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets an invoice by ID within a branch.
    pub async fn get_by_id(&self, branch_id: &str, id: &str) -> DbResult<Option<Invoice>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch(&mut conn, branch_id, id).await
    }

    /// In-transaction variant of [`get_by_id`](Self::get_by_id).
    pub async fn fetch(
        conn: &mut SqliteConnection,
        branch_id: &str,
        id: &str,
    ) -> DbResult<Option<Invoice>> {
        let sql = format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?1 AND branch_id = ?2"
        );
        let invoice = sqlx::query_as::<_, Invoice>(&sql)
            .bind(id)
            .bind(branch_id)
            .fetch_optional(conn)
            .await?;

        Ok(invoice)
    }

    /// Gets all line items for an invoice, in append order.
    pub async fn get_items(&self, invoice_id: &str) -> DbResult<Vec<LineItem>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_items(&mut conn, invoice_id).await
    }

    /// In-transaction variant of [`get_items`](Self::get_items).
    pub async fn fetch_items(
        conn: &mut SqliteConnection,
        invoice_id: &str,
    ) -> DbResult<Vec<LineItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM invoice_items WHERE invoice_id = ?1 ORDER BY line_no"
        );
        let items = sqlx::query_as::<_, LineItem>(&sql)
            .bind(invoice_id)
            .fetch_all(conn)
            .await?;

        Ok(items)
    }

    /// Lists recent invoices in a branch, newest first.
    pub async fn list_recent(&self, branch_id: &str, limit: u32) -> DbResult<Vec<Invoice>> {
        let sql = format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices \
             WHERE branch_id = ?1 ORDER BY created_at DESC LIMIT ?2"
        );
        let invoices = sqlx::query_as::<_, Invoice>(&sql)
            .bind(branch_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(invoices)
    }

    /// Counts lines currently on an invoice.
    pub async fn count_lines(conn: &mut SqliteConnection, invoice_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM invoice_items WHERE invoice_id = ?1")
                .bind(invoice_id)
                .fetch_one(conn)
                .await?;

        Ok(count)
    }

    /// Returns the next line number for an invoice (1-based, append order).
    ///
    /// Must be called inside the same transaction as the insert so two
    /// concurrent appends cannot claim the same line_no; if they do, the
    /// UNIQUE (invoice_id, line_no) index rejects the second insert.
    pub async fn next_line_no(conn: &mut SqliteConnection, invoice_id: &str) -> DbResult<i64> {
        let next: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(line_no), 0) + 1 FROM invoice_items WHERE invoice_id = ?1",
        )
        .bind(invoice_id)
        .fetch_one(conn)
        .await?;

        Ok(next)
    }

    /// Finds the earliest-scanned line for a product on an invoice.
    ///
    /// Rescanning a barcode appends duplicate lines instead of merging,
    /// so one product can appear on several lines. Operations that
    /// target "the line for product X" act on the lowest line_no.
    pub async fn find_first_line_for_product(
        conn: &mut SqliteConnection,
        invoice_id: &str,
        product_id: &str,
    ) -> DbResult<Option<LineItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM invoice_items \
             WHERE invoice_id = ?1 AND product_id = ?2 \
             ORDER BY line_no LIMIT 1"
        );
        let item = sqlx::query_as::<_, LineItem>(&sql)
            .bind(invoice_id)
            .bind(product_id)
            .fetch_optional(conn)
            .await?;

        Ok(item)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Inserts a new invoice row.
    pub async fn insert_invoice(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<()> {
        debug!(id = %invoice.id, invoice_number = %invoice.invoice_number, "Inserting invoice");

        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, branch_id, user_id, customer_id, invoice_number, status,
                subtotal_cents, tax_cents, total_cents,
                created_at, updated_at, completed_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9,
                ?10, ?11, ?12
            )
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.branch_id)
        .bind(&invoice.user_id)
        .bind(&invoice.customer_id)
        .bind(&invoice.invoice_number)
        .bind(invoice.status)
        .bind(invoice.subtotal_cents)
        .bind(invoice.tax_cents)
        .bind(invoice.total_cents)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .bind(invoice.completed_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Inserts a line item.
    ///
    /// ## Snapshot Pattern
    /// Product details (name, barcode, unit price, tax rate) were copied
    /// into the item when it was built. This preserves invoice history
    /// even if the product changes or is deleted later.
    pub async fn insert_item(conn: &mut SqliteConnection, item: &LineItem) -> DbResult<()> {
        debug!(invoice_id = %item.invoice_id, product_id = %item.product_id, line_no = %item.line_no, "Inserting invoice item");

        sqlx::query(
            r#"
            INSERT INTO invoice_items (
                id, invoice_id, line_no, product_id,
                name_snapshot, barcode_snapshot,
                quantity, unit_price_cents, tax_rate_bps, tax_cents, total_cents,
                created_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6,
                ?7, ?8, ?9, ?10, ?11,
                ?12
            )
            "#,
        )
        .bind(&item.id)
        .bind(&item.invoice_id)
        .bind(item.line_no)
        .bind(&item.product_id)
        .bind(&item.name_snapshot)
        .bind(&item.barcode_snapshot)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.tax_rate_bps)
        .bind(item.tax_cents)
        .bind(item.total_cents)
        .bind(item.created_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Deletes a single line item by ID.
    pub async fn delete_item(conn: &mut SqliteConnection, item_id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM invoice_items WHERE id = ?1")
            .bind(item_id)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice item", item_id));
        }

        Ok(())
    }

    /// Rewrites a line's quantity and its recomputed tax/total.
    ///
    /// Unit price and tax rate stay frozen at their scanned values; only
    /// the quantity-derived fields change.
    pub async fn update_item_quantity(
        conn: &mut SqliteConnection,
        item_id: &str,
        quantity: i64,
        tax_cents: i64,
        total_cents: i64,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE invoice_items SET
                quantity    = ?2,
                tax_cents   = ?3,
                total_cents = ?4
            WHERE id = ?1
            "#,
        )
        .bind(item_id)
        .bind(quantity)
        .bind(tax_cents)
        .bind(total_cents)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice item", item_id));
        }

        Ok(())
    }

    /// Applies a delta to the invoice's running totals.
    ///
    /// Guarded by `status = 'draft'`: if the invoice completed between
    /// the engine's read and this write, zero rows match and the whole
    /// transaction rolls back instead of mutating a frozen invoice.
    pub async fn apply_totals_delta(
        conn: &mut SqliteConnection,
        invoice_id: &str,
        subtotal_delta: i64,
        tax_delta: i64,
        total_delta: i64,
    ) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE invoices SET
                subtotal_cents = subtotal_cents + ?2,
                tax_cents      = tax_cents + ?3,
                total_cents    = total_cents + ?4,
                updated_at     = ?5
            WHERE id = ?1 AND status = 'draft'
            "#,
        )
        .bind(invoice_id)
        .bind(subtotal_delta)
        .bind(tax_delta)
        .bind(total_delta)
        .bind(now)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice (draft)", invoice_id));
        }

        Ok(())
    }

    /// Marks a draft invoice as completed.
    ///
    /// One-way transition. The `status = 'draft'` guard makes a repeat
    /// completion (or a race with one) match zero rows.
    pub async fn complete(
        conn: &mut SqliteConnection,
        branch_id: &str,
        invoice_id: &str,
    ) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE invoices SET
                status       = 'completed',
                completed_at = ?3,
                updated_at   = ?3
            WHERE id = ?1 AND branch_id = ?2 AND status = 'draft'
            "#,
        )
        .bind(invoice_id)
        .bind(branch_id)
        .bind(now)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice (draft)", invoice_id));
        }

        Ok(())
    }

    /// Deletes all line items for an invoice.
    pub async fn delete_all_items(conn: &mut SqliteConnection, invoice_id: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM invoice_items WHERE invoice_id = ?1")
            .bind(invoice_id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected())
    }

    /// Deletes a draft invoice row.
    ///
    /// Guarded by `status = 'draft'`: completed invoices are permanent
    /// records and can never be deleted.
    pub async fn delete_draft(
        conn: &mut SqliteConnection,
        branch_id: &str,
        invoice_id: &str,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "DELETE FROM invoices WHERE id = ?1 AND branch_id = ?2 AND status = 'draft'",
        )
        .bind(invoice_id)
        .bind(branch_id)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice (draft)", invoice_id));
        }

        Ok(())
    }
}

/// Generates an invoice number: `INV-{UTC timestamp}-{random suffix}`.
///
/// ## Why The Suffix?
/// A bare timestamp collides when two invoices are created in the same
/// second (or millisecond, under load). The random suffix plus the
/// UNIQUE index on invoice_number makes collisions practically
/// impossible, and detectable if they ever happen.
///
/// ## Example
/// `INV-20260825143059-a3f91c`
pub fn generate_invoice_number() -> String {
    let now = Utc::now();
    let suffix: String = Uuid::new_v4().simple().to_string()[..6].to_string();
    format!("INV-{}-{}", now.format("%Y%m%d%H%M%S"), suffix)
}

/// Generates a new invoice ID.
pub fn generate_invoice_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new invoice item ID.
pub fn generate_item_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
