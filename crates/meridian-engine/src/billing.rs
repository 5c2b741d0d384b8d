//! # Billing Engine
//!
//! Draft-invoice operations. This is the heart of the system: every
//! operation that touches both an invoice and product stock runs inside
//! ONE database transaction.
//!
//! ## Operation Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │               One Operation = One Transaction                           │
//! │                                                                         │
//! │  add_item_by_barcode(ctx, invoice, barcode, qty)                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate inputs (no I/O yet)                                          │
//! │       │                                                                 │
//! │       ▼  BEGIN ─────────────────────────────────────────────┐          │
//! │       │  1. fetch invoice, require status = draft           │          │
//! │       │  2. fetch product by barcode (branch-scoped)        │          │
//! │       │  3. fetch customer → pick B2B/B2C unit price        │          │
//! │       │  4. guarded stock UPDATE (floor check in WHERE)     │          │
//! │       │  5. insert line (frozen snapshot)                   │          │
//! │       │  6. totals += line contribution (status-guarded)    │          │
//! │       ▼  COMMIT ────────────────────────────────────────────┘          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Any step fails → ROLLBACK: stock, line and totals all revert.         │
//! │  There is no state where stock moved but the invoice didn't.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Duplicate Lines
//! Rescanning a barcode appends a NEW line; quantities are never merged.
//! Operations addressed by product act on the earliest such line
//! (lowest line_no).

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use meridian_core::{
    charges_of, line_charges, validation, Customer, CustomerType, Invoice, InvoiceStatus,
    LineItem, TaxRate,
};
use meridian_db::repository::invoice::{generate_invoice_id, generate_invoice_number, generate_item_id};
use meridian_db::{CustomerRepository, Database, InvoiceRepository, ProductRepository, StockAdjustOutcome};

use crate::context::RequestContext;
use crate::error::{EngineError, EngineResult};

// =============================================================================
// Response DTOs
// =============================================================================

/// The customer block embedded in an invoice response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    pub id: String,
    pub name: String,
    pub customer_type: CustomerType,
}

impl From<Customer> for CustomerSummary {
    fn from(c: Customer) -> Self {
        CustomerSummary {
            id: c.id,
            name: c.name,
            customer_type: c.customer_type,
        }
    }
}

/// One line of an invoice response, derived from the stored snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLine {
    pub line_no: i64,
    pub product_id: String,
    pub name: String,
    pub barcode: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub tax_rate_bps: u32,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
}

impl From<LineItem> for InvoiceLine {
    fn from(item: LineItem) -> Self {
        let subtotal_cents = item.subtotal_cents();
        InvoiceLine {
            line_no: item.line_no,
            product_id: item.product_id,
            name: item.name_snapshot,
            barcode: item.barcode_snapshot,
            quantity: item.quantity,
            unit_price_cents: item.unit_price_cents,
            tax_rate_bps: item.tax_rate_bps,
            subtotal_cents,
            tax_cents: item.tax_cents,
            total_cents: item.total_cents,
        }
    }
}

/// Full invoice view returned by every billing operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDetail {
    pub id: String,
    pub invoice_number: String,
    pub status: InvoiceStatus,
    pub customer: CustomerSummary,
    pub items: Vec<InvoiceLine>,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl InvoiceDetail {
    fn assemble(invoice: Invoice, customer: Customer, items: Vec<LineItem>) -> Self {
        InvoiceDetail {
            id: invoice.id,
            invoice_number: invoice.invoice_number,
            status: invoice.status,
            customer: customer.into(),
            items: items.into_iter().map(InvoiceLine::from).collect(),
            subtotal_cents: invoice.subtotal_cents,
            tax_cents: invoice.tax_cents,
            total_cents: invoice.total_cents,
            created_at: invoice.created_at,
            updated_at: invoice.updated_at,
            completed_at: invoice.completed_at,
        }
    }
}

// =============================================================================
// Billing Engine
// =============================================================================

/// Orchestrates draft-invoice operations against the database.
///
/// Cloneable and cheap to share: it holds only the pooled [`Database`]
/// handle.
#[derive(Debug, Clone)]
pub struct BillingEngine {
    db: Database,
}

impl BillingEngine {
    /// Creates a billing engine over an open database.
    pub fn new(db: Database) -> Self {
        BillingEngine { db }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Creates an empty draft invoice for a customer.
    ///
    /// The customer's tier (B2B/B2C) is not copied here: it is resolved
    /// per scan, but the customer must exist in the caller's branch.
    pub async fn create_invoice(
        &self,
        ctx: &RequestContext,
        customer_id: &str,
    ) -> EngineResult<InvoiceDetail> {
        ctx.validate()?;
        validation::validate_uuid("customer_id", customer_id)
            .map_err(|_| EngineError::invalid_reference("customer_id", customer_id))?;

        debug!(branch_id = %ctx.branch_id, customer_id = %customer_id, "create_invoice");

        let mut tx = self.db.begin().await?;

        let customer = CustomerRepository::fetch_by_id(&mut tx, &ctx.branch_id, customer_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Customer", customer_id))?;

        let now = Utc::now();
        let invoice = Invoice {
            id: generate_invoice_id(),
            branch_id: ctx.branch_id.clone(),
            user_id: ctx.user_id.clone(),
            customer_id: customer.id.clone(),
            invoice_number: generate_invoice_number(),
            status: InvoiceStatus::Draft,
            subtotal_cents: 0,
            tax_cents: 0,
            total_cents: 0,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };

        InvoiceRepository::insert_invoice(&mut tx, &invoice).await?;
        tx.commit().await.map_err(meridian_db::DbError::from)?;

        info!(
            invoice_id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            "Invoice created"
        );

        Ok(InvoiceDetail::assemble(invoice, customer, Vec::new()))
    }

    /// Scans a product onto a draft invoice.
    ///
    /// Appends a new line (even if the product is already on the
    /// invoice), decrements stock, and bumps the totals - all in one
    /// transaction.
    pub async fn add_item_by_barcode(
        &self,
        ctx: &RequestContext,
        invoice_id: &str,
        barcode: &str,
        quantity: i64,
    ) -> EngineResult<InvoiceDetail> {
        ctx.validate()?;
        validation::validate_uuid("invoice_id", invoice_id)
            .map_err(|_| EngineError::invalid_reference("invoice_id", invoice_id))?;
        validation::validate_barcode(barcode)?;
        validation::validate_quantity(quantity)?;

        debug!(
            branch_id = %ctx.branch_id,
            invoice_id = %invoice_id,
            barcode = %barcode,
            quantity = %quantity,
            "add_item_by_barcode"
        );

        let mut tx = self.db.begin().await?;

        let invoice = self.require_draft(&mut tx, ctx, invoice_id).await?;

        let line_count = InvoiceRepository::count_lines(&mut tx, &invoice.id).await?;
        validation::validate_invoice_size(line_count as usize)?;

        let product = ProductRepository::fetch_by_barcode(&mut tx, &ctx.branch_id, barcode)
            .await?
            .ok_or_else(|| EngineError::not_found("Product", barcode))?;

        let customer =
            CustomerRepository::fetch_by_id(&mut tx, &ctx.branch_id, &invoice.customer_id)
                .await?
                .ok_or_else(|| {
                    EngineError::Storage(format!(
                        "invoice {} references missing customer {}",
                        invoice.id, invoice.customer_id
                    ))
                })?;

        // Freeze pricing at scan time: tier-selected unit price plus the
        // product's current tax rate.
        let unit_price = product.price_for(customer.customer_type);
        let rate = product.tax_rate();
        let charges = line_charges(unit_price, quantity, rate);

        // Stock moves in the same transaction as the line insert.
        match ProductRepository::adjust_stock(&mut tx, &ctx.branch_id, &product.id, -quantity)
            .await?
        {
            StockAdjustOutcome::Adjusted => {}
            StockAdjustOutcome::Insufficient { available } => {
                return Err(EngineError::InsufficientStock {
                    name: product.name,
                    available,
                    requested: quantity,
                });
            }
            StockAdjustOutcome::NotFound => {
                return Err(EngineError::not_found("Product", &product.id));
            }
        }

        let line_no = InvoiceRepository::next_line_no(&mut tx, &invoice.id).await?;
        let item = LineItem {
            id: generate_item_id(),
            invoice_id: invoice.id.clone(),
            line_no,
            product_id: product.id.clone(),
            name_snapshot: product.name.clone(),
            barcode_snapshot: product.barcode.clone(),
            quantity,
            unit_price_cents: unit_price.cents(),
            tax_rate_bps: rate.bps(),
            tax_cents: charges.tax.cents(),
            total_cents: charges.total.cents(),
            created_at: Utc::now(),
        };

        InvoiceRepository::insert_item(&mut tx, &item).await?;
        InvoiceRepository::apply_totals_delta(
            &mut tx,
            &invoice.id,
            charges.subtotal.cents(),
            charges.tax.cents(),
            charges.total.cents(),
        )
        .await?;

        tx.commit().await.map_err(meridian_db::DbError::from)?;

        info!(
            invoice_id = %invoice.id,
            product_id = %item.product_id,
            line_no = %line_no,
            quantity = %quantity,
            "Item added to invoice"
        );

        self.load_detail(ctx, invoice_id).await
    }

    /// Changes the quantity of the earliest line carrying a product.
    ///
    /// Unit price and tax rate stay frozen at their scanned values; the
    /// stock and totals move by the quantity difference.
    pub async fn update_item_quantity(
        &self,
        ctx: &RequestContext,
        invoice_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> EngineResult<InvoiceDetail> {
        ctx.validate()?;
        validation::validate_uuid("invoice_id", invoice_id)
            .map_err(|_| EngineError::invalid_reference("invoice_id", invoice_id))?;
        validation::validate_uuid("product_id", product_id)
            .map_err(|_| EngineError::invalid_reference("product_id", product_id))?;
        validation::validate_quantity(quantity)?;

        debug!(
            invoice_id = %invoice_id,
            product_id = %product_id,
            quantity = %quantity,
            "update_item_quantity"
        );

        let mut tx = self.db.begin().await?;

        let invoice = self.require_draft(&mut tx, ctx, invoice_id).await?;

        let line = InvoiceRepository::find_first_line_for_product(&mut tx, &invoice.id, product_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Invoice line for product", product_id))?;

        // Positive when the line shrinks (stock comes back), negative
        // when it grows (stock is consumed).
        let stock_delta = line.quantity - quantity;

        match ProductRepository::adjust_stock(&mut tx, &ctx.branch_id, product_id, stock_delta)
            .await?
        {
            StockAdjustOutcome::Adjusted => {}
            StockAdjustOutcome::Insufficient { available } => {
                return Err(EngineError::InsufficientStock {
                    name: line.name_snapshot,
                    available,
                    requested: quantity - line.quantity,
                });
            }
            StockAdjustOutcome::NotFound => {
                return Err(EngineError::not_found("Product", product_id));
            }
        }

        let old_charges = charges_of(&line);
        let new_charges = line_charges(
            line.unit_price(),
            quantity,
            TaxRate::from_bps(line.tax_rate_bps),
        );

        InvoiceRepository::update_item_quantity(
            &mut tx,
            &line.id,
            quantity,
            new_charges.tax.cents(),
            new_charges.total.cents(),
        )
        .await?;

        InvoiceRepository::apply_totals_delta(
            &mut tx,
            &invoice.id,
            new_charges.subtotal.cents() - old_charges.subtotal.cents(),
            new_charges.tax.cents() - old_charges.tax.cents(),
            new_charges.total.cents() - old_charges.total.cents(),
        )
        .await?;

        tx.commit().await.map_err(meridian_db::DbError::from)?;

        info!(
            invoice_id = %invoice.id,
            product_id = %product_id,
            old_quantity = %line.quantity,
            new_quantity = %quantity,
            "Invoice line quantity updated"
        );

        self.load_detail(ctx, invoice_id).await
    }

    /// Removes the earliest line carrying a product and restores its
    /// stock.
    ///
    /// If the product was deleted from the catalog since it was scanned,
    /// the line is still removed and totals adjusted; there is simply no
    /// stock row left to restore into.
    pub async fn remove_item(
        &self,
        ctx: &RequestContext,
        invoice_id: &str,
        product_id: &str,
    ) -> EngineResult<InvoiceDetail> {
        ctx.validate()?;
        validation::validate_uuid("invoice_id", invoice_id)
            .map_err(|_| EngineError::invalid_reference("invoice_id", invoice_id))?;
        validation::validate_uuid("product_id", product_id)
            .map_err(|_| EngineError::invalid_reference("product_id", product_id))?;

        debug!(invoice_id = %invoice_id, product_id = %product_id, "remove_item");

        let mut tx = self.db.begin().await?;

        let invoice = self.require_draft(&mut tx, ctx, invoice_id).await?;

        let line = InvoiceRepository::find_first_line_for_product(&mut tx, &invoice.id, product_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Invoice line for product", product_id))?;

        match ProductRepository::adjust_stock(&mut tx, &ctx.branch_id, product_id, line.quantity)
            .await?
        {
            StockAdjustOutcome::Adjusted | StockAdjustOutcome::NotFound => {}
            StockAdjustOutcome::Insufficient { available } => {
                // Unreachable: a positive delta always satisfies the floor.
                return Err(EngineError::Storage(format!(
                    "stock restore rejected for {} (available {})",
                    product_id, available
                )));
            }
        }

        let charges = charges_of(&line);
        InvoiceRepository::delete_item(&mut tx, &line.id).await?;
        InvoiceRepository::apply_totals_delta(
            &mut tx,
            &invoice.id,
            -charges.subtotal.cents(),
            -charges.tax.cents(),
            -charges.total.cents(),
        )
        .await?;

        tx.commit().await.map_err(meridian_db::DbError::from)?;

        info!(
            invoice_id = %invoice.id,
            product_id = %product_id,
            line_no = %line.line_no,
            "Invoice line removed"
        );

        self.load_detail(ctx, invoice_id).await
    }

    /// Finalizes a draft invoice. One-way: a completed invoice never
    /// becomes a draft again and rejects all further mutation.
    pub async fn complete_invoice(
        &self,
        ctx: &RequestContext,
        invoice_id: &str,
    ) -> EngineResult<InvoiceDetail> {
        ctx.validate()?;
        validation::validate_uuid("invoice_id", invoice_id)
            .map_err(|_| EngineError::invalid_reference("invoice_id", invoice_id))?;

        debug!(invoice_id = %invoice_id, "complete_invoice");

        let mut tx = self.db.begin().await?;

        // Distinguish "missing" from "already completed" before the
        // guarded update.
        let invoice = InvoiceRepository::fetch(&mut tx, &ctx.branch_id, invoice_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Invoice", invoice_id))?;

        if !invoice.is_draft() {
            return Err(EngineError::invalid_state(format!(
                "Invoice {} is already completed",
                invoice.id
            )));
        }

        InvoiceRepository::complete(&mut tx, &ctx.branch_id, invoice_id).await?;
        tx.commit().await.map_err(meridian_db::DbError::from)?;

        info!(invoice_id = %invoice_id, "Invoice completed");

        self.load_detail(ctx, invoice_id).await
    }

    /// Deletes a draft invoice, restoring the stock of every line.
    ///
    /// If any line's product no longer exists, the whole deletion is
    /// rejected: partially restored stock would silently lose units.
    pub async fn delete_invoice(&self, ctx: &RequestContext, invoice_id: &str) -> EngineResult<()> {
        ctx.validate()?;
        validation::validate_uuid("invoice_id", invoice_id)
            .map_err(|_| EngineError::invalid_reference("invoice_id", invoice_id))?;

        debug!(invoice_id = %invoice_id, "delete_invoice");

        let mut tx = self.db.begin().await?;

        let invoice = self.require_draft(&mut tx, ctx, invoice_id).await?;
        let items = InvoiceRepository::fetch_items(&mut tx, &invoice.id).await?;

        for line in &items {
            match ProductRepository::adjust_stock(
                &mut tx,
                &ctx.branch_id,
                &line.product_id,
                line.quantity,
            )
            .await?
            {
                StockAdjustOutcome::Adjusted => {}
                StockAdjustOutcome::NotFound => {
                    return Err(EngineError::not_found("Product", &line.product_id));
                }
                StockAdjustOutcome::Insufficient { .. } => {
                    return Err(EngineError::Storage(format!(
                        "stock restore rejected for {}",
                        line.product_id
                    )));
                }
            }
        }

        InvoiceRepository::delete_all_items(&mut tx, &invoice.id).await?;
        InvoiceRepository::delete_draft(&mut tx, &ctx.branch_id, &invoice.id).await?;

        tx.commit().await.map_err(meridian_db::DbError::from)?;

        info!(invoice_id = %invoice_id, lines = items.len(), "Draft invoice deleted");

        Ok(())
    }

    /// Fetches one invoice with its lines and customer.
    pub async fn get_invoice(
        &self,
        ctx: &RequestContext,
        invoice_id: &str,
    ) -> EngineResult<InvoiceDetail> {
        ctx.validate()?;
        validation::validate_uuid("invoice_id", invoice_id)
            .map_err(|_| EngineError::invalid_reference("invoice_id", invoice_id))?;

        self.load_detail(ctx, invoice_id).await
    }

    /// Lists recent invoices in the branch, newest first.
    pub async fn list_invoices(
        &self,
        ctx: &RequestContext,
        limit: u32,
    ) -> EngineResult<Vec<Invoice>> {
        ctx.validate()?;
        Ok(self.db.invoices().list_recent(&ctx.branch_id, limit).await?)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Fetches an invoice inside a transaction and requires draft status.
    async fn require_draft(
        &self,
        tx: &mut sqlx::SqliteConnection,
        ctx: &RequestContext,
        invoice_id: &str,
    ) -> EngineResult<Invoice> {
        let invoice = InvoiceRepository::fetch(tx, &ctx.branch_id, invoice_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Invoice", invoice_id))?;

        if !invoice.is_draft() {
            return Err(EngineError::invalid_state(format!(
                "Invoice {} is completed and can no longer be modified",
                invoice.id
            )));
        }

        Ok(invoice)
    }

    /// Loads the full invoice view from the pool (outside transactions).
    async fn load_detail(
        &self,
        ctx: &RequestContext,
        invoice_id: &str,
    ) -> EngineResult<InvoiceDetail> {
        let invoice = self
            .db
            .invoices()
            .get_by_id(&ctx.branch_id, invoice_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Invoice", invoice_id))?;

        let customer = self
            .db
            .customers()
            .get_by_id(&ctx.branch_id, &invoice.customer_id)
            .await?
            .ok_or_else(|| {
                EngineError::Storage(format!(
                    "invoice {} references missing customer {}",
                    invoice.id, invoice.customer_id
                ))
            })?;

        let items = self.db.invoices().get_items(&invoice.id).await?;

        Ok(InvoiceDetail::assemble(invoice, customer, items))
    }
}
