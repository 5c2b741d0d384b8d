//! # Customer Repository
//!
//! Database operations for the branch-scoped customer directory.
//!
//! Billing only reads customers: the customer's tier (B2B/B2C) selects
//! the unit price frozen into each scanned line. Directory maintenance
//! (create/list) is a thin layer on top.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use meridian_core::Customer;

const CUSTOMER_COLUMNS: &str = r#"
    id, branch_id, customer_type, name, email, phone, created_at, updated_at
"#;

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Gets a customer by ID within a branch.
    pub async fn get_by_id(&self, branch_id: &str, id: &str) -> DbResult<Option<Customer>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_by_id(&mut conn, branch_id, id).await
    }

    /// In-transaction variant of [`get_by_id`](Self::get_by_id).
    ///
    /// Invoice creation resolves the customer inside its transaction so
    /// the tier it freezes into the invoice is the one that existed when
    /// the invoice was committed.
    pub async fn fetch_by_id(
        conn: &mut SqliteConnection,
        branch_id: &str,
        id: &str,
    ) -> DbResult<Option<Customer>> {
        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1 AND branch_id = ?2"
        );
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(id)
            .bind(branch_id)
            .fetch_optional(conn)
            .await?;

        Ok(customer)
    }

    /// Lists customers in a branch, ordered by name.
    pub async fn list(&self, branch_id: &str, limit: u32) -> DbResult<Vec<Customer>> {
        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE branch_id = ?1 ORDER BY name LIMIT ?2"
        );
        let customers = sqlx::query_as::<_, Customer>(&sql)
            .bind(branch_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(customers)
    }

    /// Inserts a new customer.
    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        debug!(branch_id = %customer.branch_id, name = %customer.name, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, branch_id, customer_type, name, email, phone,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.branch_id)
        .bind(customer.customer_type)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Counts customers in a branch (for diagnostics).
    pub async fn count(&self, branch_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers WHERE branch_id = ?1")
            .bind(branch_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Deletes a customer that has no invoices.
    ///
    /// The invoices FK blocks deletion of a referenced customer; that
    /// surfaces as `DbError::ForeignKeyViolation`.
    pub async fn delete(&self, branch_id: &str, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM customers WHERE id = ?1 AND branch_id = ?2")
            .bind(id)
            .bind(branch_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        Ok(())
    }
}

/// Helper to generate a new customer ID.
pub fn generate_customer_id() -> String {
    Uuid::new_v4().to_string()
}
