//! # Product Repository
//!
//! Database operations for the branch-scoped product catalog.
//!
//! ## Stock Floor Enforcement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Guarded Stock Delta                                  │
//! │                                                                         │
//! │  ❌ WRONG: read-modify-write (races under concurrency)                 │
//! │     let p = get(id);              ← both writers read quantity = 1     │
//! │     set_quantity(p.quantity - 1)  ← both succeed, stock goes to -1     │
//! │                                                                         │
//! │  ✅ CORRECT: single guarded UPDATE                                     │
//! │     UPDATE products                                                     │
//! │     SET quantity = quantity + :delta,                                   │
//! │         status   = CASE WHEN quantity + :delta > 0                      │
//! │                    THEN 'active' ELSE 'inactive' END                    │
//! │     WHERE id = :id AND quantity + :delta >= 0                           │
//! │                                                                         │
//! │  The WHERE clause makes the floor check and the write one atomic        │
//! │  step. A losing writer matches zero rows and is told so; stock can      │
//! │  never go negative no matter how many writers race.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use meridian_core::{Product, ProductStatus};

/// Outcome of a guarded stock adjustment.
///
/// The adjustment statement cannot distinguish "no such product" from
/// "floor would be violated" on its own (both match zero rows), so the
/// repository re-reads on failure and reports which case applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockAdjustOutcome {
    /// Stock was adjusted; status was re-derived in the same statement.
    Adjusted,
    /// No product with this id exists in the branch.
    NotFound,
    /// The delta would push stock below zero. Carries the quantity that
    /// was available at the time of the check.
    Insufficient { available: i64 },
}

/// Allow-listed product field updates.
///
/// Only these fields can be changed through the catalog update path.
/// Stock is NOT here: it moves only through guarded adjustments, and
/// identity/audit fields (id, branch_id, user_id, timestamps, status)
/// are never caller-writable.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub barcode: Option<String>,
    pub name: Option<String>,
    pub item_code: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
    pub b2b_price_cents: Option<i64>,
    pub b2c_price_cents: Option<i64>,
    pub purchase_price_cents: Option<i64>,
    pub tax_rate_bps: Option<u32>,
}

impl ProductUpdate {
    /// Whether the update carries any field at all.
    pub fn is_empty(&self) -> bool {
        self.barcode.is_none()
            && self.name.is_none()
            && self.item_code.is_none()
            && self.color.is_none()
            && self.size.is_none()
            && self.b2b_price_cents.is_none()
            && self.b2c_price_cents.is_none()
            && self.purchase_price_cents.is_none()
            && self.tax_rate_bps.is_none()
    }
}

/// Per-branch stock aggregate returned by [`ProductRepository::stock_summary`].
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StockSummary {
    pub product_count: i64,
    pub total_units: i64,
    pub purchase_value_cents: i64,
    pub retail_value_cents: i64,
    pub out_of_stock_count: i64,
    pub low_stock_count: i64,
}

const PRODUCT_COLUMNS: &str = r#"
    id, branch_id, user_id, barcode, name, item_code, color, size,
    quantity, b2b_price_cents, b2c_price_cents, purchase_price_cents,
    tax_rate_bps, status, created_at, updated_at
"#;

/// Repository for product database operations.
///
/// Read methods run on the pool. Write methods that participate in
/// engine transactions are associated functions taking
/// `&mut SqliteConnection`, with thin pool wrappers where a standalone
/// call is useful.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a product by its ID within a branch.
    pub async fn get_by_id(&self, branch_id: &str, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_by_id(&mut conn, branch_id, id).await
    }

    /// In-transaction variant of [`get_by_id`](Self::get_by_id).
    pub async fn fetch_by_id(
        conn: &mut SqliteConnection,
        branch_id: &str,
        id: &str,
    ) -> DbResult<Option<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1 AND branch_id = ?2"
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(branch_id)
            .fetch_optional(conn)
            .await?;

        Ok(product)
    }

    /// Gets a product by barcode within a branch.
    ///
    /// Barcode is the business identifier scanned at the till; it is
    /// unique per branch, so this returns at most one row.
    pub async fn get_by_barcode(&self, branch_id: &str, barcode: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_by_barcode(&mut conn, branch_id, barcode).await
    }

    /// In-transaction variant of [`get_by_barcode`](Self::get_by_barcode).
    pub async fn fetch_by_barcode(
        conn: &mut SqliteConnection,
        branch_id: &str,
        barcode: &str,
    ) -> DbResult<Option<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE branch_id = ?1 AND barcode = ?2"
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(branch_id)
            .bind(barcode)
            .fetch_optional(conn)
            .await?;

        Ok(product)
    }

    /// Lists products in a branch, ordered by name.
    pub async fn list(&self, branch_id: &str, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE branch_id = ?1 ORDER BY name LIMIT ?2"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(branch_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Lists products in a branch with the given derived status.
    pub async fn list_by_status(
        &self,
        branch_id: &str,
        status: ProductStatus,
        limit: u32,
    ) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE branch_id = ?1 AND status = ?2 ORDER BY name LIMIT ?3"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(branch_id)
            .bind(status)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Lists products at or below the given stock threshold.
    ///
    /// Out-of-stock products (quantity 0) are included; callers wanting
    /// only "running low, still sellable" can filter by status.
    pub async fn low_stock(&self, branch_id: &str, threshold: i64) -> DbResult<Vec<Product>> {
        debug!(branch_id = %branch_id, threshold = %threshold, "Listing low-stock products");

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE branch_id = ?1 AND quantity <= ?2 \
             ORDER BY quantity, name"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(branch_id)
            .bind(threshold)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Aggregates the branch's stock position in one query.
    pub async fn stock_summary(&self, branch_id: &str, low_threshold: i64) -> DbResult<StockSummary> {
        let summary = sqlx::query_as::<_, StockSummary>(
            r#"
            SELECT
                COUNT(*)                                            AS product_count,
                COALESCE(SUM(quantity), 0)                          AS total_units,
                COALESCE(SUM(quantity * purchase_price_cents), 0)   AS purchase_value_cents,
                COALESCE(SUM(quantity * b2c_price_cents), 0)        AS retail_value_cents,
                COALESCE(SUM(CASE WHEN quantity = 0 THEN 1 ELSE 0 END), 0)  AS out_of_stock_count,
                COALESCE(SUM(CASE WHEN quantity > 0 AND quantity <= ?2 THEN 1 ELSE 0 END), 0)
                                                                    AS low_stock_count
            FROM products
            WHERE branch_id = ?1
            "#,
        )
        .bind(branch_id)
        .bind(low_threshold)
        .fetch_one(&self.pool)
        .await?;

        Ok(summary)
    }

    /// Counts products in a branch (for diagnostics).
    pub async fn count(&self, branch_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE branch_id = ?1")
            .bind(branch_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(())` - Inserted
    /// * `Err(DbError::UniqueViolation)` - Barcode or (name, color, size)
    ///   variant already exists in this branch
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(branch_id = %product.branch_id, barcode = %product.barcode, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, branch_id, user_id, barcode, name, item_code, color, size,
                quantity, b2b_price_cents, b2c_price_cents, purchase_price_cents,
                tax_rate_bps, status, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8,
                ?9, ?10, ?11, ?12,
                ?13, ?14, ?15, ?16
            )
            "#,
        )
        .bind(&product.id)
        .bind(&product.branch_id)
        .bind(&product.user_id)
        .bind(&product.barcode)
        .bind(&product.name)
        .bind(&product.item_code)
        .bind(&product.color)
        .bind(&product.size)
        .bind(product.quantity)
        .bind(product.b2b_price_cents)
        .bind(product.b2c_price_cents)
        .bind(product.purchase_price_cents)
        .bind(product.tax_rate_bps)
        .bind(product.status)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Applies an allow-listed field update.
    ///
    /// `None` fields are left unchanged (COALESCE). Stock and status are
    /// deliberately not reachable from here.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Product doesn't exist in this branch
    /// * `Err(DbError::UniqueViolation)` - New barcode/variant collides
    pub async fn update_fields(
        &self,
        branch_id: &str,
        id: &str,
        update: &ProductUpdate,
    ) -> DbResult<()> {
        debug!(id = %id, "Updating product fields");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products SET
                barcode              = COALESCE(?3, barcode),
                name                 = COALESCE(?4, name),
                item_code            = COALESCE(?5, item_code),
                color                = COALESCE(?6, color),
                size                 = COALESCE(?7, size),
                b2b_price_cents      = COALESCE(?8, b2b_price_cents),
                b2c_price_cents      = COALESCE(?9, b2c_price_cents),
                purchase_price_cents = COALESCE(?10, purchase_price_cents),
                tax_rate_bps         = COALESCE(?11, tax_rate_bps),
                updated_at           = ?12
            WHERE id = ?1 AND branch_id = ?2
            "#,
        )
        .bind(id)
        .bind(branch_id)
        .bind(&update.barcode)
        .bind(&update.name)
        .bind(&update.item_code)
        .bind(&update.color)
        .bind(&update.size)
        .bind(update.b2b_price_cents)
        .bind(update.b2c_price_cents)
        .bind(update.purchase_price_cents)
        .bind(update.tax_rate_bps)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Atomically adjusts stock by `delta` and re-derives status.
    ///
    /// The floor check (`quantity + delta >= 0`) lives in the WHERE
    /// clause of the same statement that applies the delta, so two
    /// concurrent sales of the last unit cannot both succeed: the
    /// second writer matches zero rows.
    pub async fn adjust_stock(
        conn: &mut SqliteConnection,
        branch_id: &str,
        id: &str,
        delta: i64,
    ) -> DbResult<StockAdjustOutcome> {
        debug!(id = %id, delta = %delta, "Adjusting stock");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET
                quantity   = quantity + ?3,
                status     = CASE WHEN quantity + ?3 > 0 THEN 'active' ELSE 'inactive' END,
                updated_at = ?4
            WHERE id = ?1 AND branch_id = ?2 AND quantity + ?3 >= 0
            "#,
        )
        .bind(id)
        .bind(branch_id)
        .bind(delta)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(StockAdjustOutcome::Adjusted);
        }

        // Zero rows: either the product is missing or the floor blocked
        // the write. Re-read inside the same transaction to tell which.
        let available: Option<i64> =
            sqlx::query_scalar("SELECT quantity FROM products WHERE id = ?1 AND branch_id = ?2")
                .bind(id)
                .bind(branch_id)
                .fetch_optional(conn)
                .await?;

        match available {
            Some(available) => Ok(StockAdjustOutcome::Insufficient { available }),
            None => Ok(StockAdjustOutcome::NotFound),
        }
    }

    /// Pool wrapper for a standalone stock adjustment.
    ///
    /// A single guarded UPDATE is already atomic, so direct stock
    /// receipts/reductions don't need an explicit transaction.
    pub async fn adjust_stock_standalone(
        &self,
        branch_id: &str,
        id: &str,
        delta: i64,
    ) -> DbResult<StockAdjustOutcome> {
        let mut conn = self.pool.acquire().await?;
        Self::adjust_stock(&mut conn, branch_id, id, delta).await
    }

    /// Deletes a product from the catalog.
    ///
    /// Historical invoice lines keep their snapshots; deletion only
    /// removes the catalog row.
    pub async fn delete(&self, branch_id: &str, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1 AND branch_id = ?2")
            .bind(id)
            .bind(branch_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn test_product(db: &Database, quantity: i64) -> Product {
        let now = Utc::now();
        let product = Product {
            id: generate_product_id(),
            branch_id: "branch-1".to_string(),
            user_id: "user-1".to_string(),
            barcode: format!("BC-{}", Uuid::new_v4().simple()),
            name: format!("Shirt {}", Uuid::new_v4().simple()),
            item_code: None,
            color: "Navy".to_string(),
            size: "M".to_string(),
            quantity,
            b2b_price_cents: 800,
            b2c_price_cents: 1000,
            purchase_price_cents: 500,
            tax_rate_bps: 0,
            status: ProductStatus::for_quantity(quantity),
            created_at: now,
            updated_at: now,
        };
        db.products().insert(&product).await.unwrap();
        product
    }

    #[tokio::test]
    async fn test_adjust_stock_outcomes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = test_product(&db, 3).await;
        let repo = db.products();

        // Within the floor.
        let outcome = repo
            .adjust_stock_standalone("branch-1", &product.id, -2)
            .await
            .unwrap();
        assert_eq!(outcome, StockAdjustOutcome::Adjusted);

        // Floor violation reports what was available.
        let outcome = repo
            .adjust_stock_standalone("branch-1", &product.id, -2)
            .await
            .unwrap();
        assert_eq!(outcome, StockAdjustOutcome::Insufficient { available: 1 });

        // Missing product (and wrong branch) is NotFound, not Insufficient.
        let outcome = repo
            .adjust_stock_standalone("branch-1", "no-such-id", -1)
            .await
            .unwrap();
        assert_eq!(outcome, StockAdjustOutcome::NotFound);

        let outcome = repo
            .adjust_stock_standalone("branch-2", &product.id, -1)
            .await
            .unwrap();
        assert_eq!(outcome, StockAdjustOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_adjust_stock_rederives_status() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = test_product(&db, 1).await;
        let repo = db.products();

        repo.adjust_stock_standalone("branch-1", &product.id, -1)
            .await
            .unwrap();
        let sold_out = repo.get_by_id("branch-1", &product.id).await.unwrap().unwrap();
        assert_eq!(sold_out.quantity, 0);
        assert_eq!(sold_out.status, ProductStatus::Inactive);

        repo.adjust_stock_standalone("branch-1", &product.id, 5)
            .await
            .unwrap();
        let restocked = repo.get_by_id("branch-1", &product.id).await.unwrap().unwrap();
        assert_eq!(restocked.quantity, 5);
        assert_eq!(restocked.status, ProductStatus::Active);
    }

    #[tokio::test]
    async fn test_update_fields_leaves_none_unchanged() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = test_product(&db, 4).await;
        let repo = db.products();

        repo.update_fields(
            "branch-1",
            &product.id,
            &ProductUpdate {
                b2c_price_cents: Some(1500),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let updated = repo.get_by_id("branch-1", &product.id).await.unwrap().unwrap();
        assert_eq!(updated.b2c_price_cents, 1500);
        assert_eq!(updated.b2b_price_cents, 800);
        assert_eq!(updated.quantity, 4);
        assert_eq!(updated.name, product.name);
    }

    #[tokio::test]
    async fn test_duplicate_barcode_is_unique_violation() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = test_product(&db, 1).await;

        let mut twin = product.clone();
        twin.id = generate_product_id();
        twin.name = format!("Shirt {}", Uuid::new_v4().simple());

        let err = db.products().insert(&twin).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }
}
