//! # Catalog Service
//!
//! Product catalog maintenance: create/update/delete, direct stock
//! receipts and reductions, low-stock reporting.
//!
//! ## Status Is Derived, Never Set
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Callers never write product status. Every path that changes the       │
//! │  quantity re-derives it in the same statement:                          │
//! │                                                                         │
//! │    quantity > 0  → active                                               │
//! │    quantity = 0  → inactive                                             │
//! │                                                                         │
//! │  So "sellable" is always in sync with "in stock", including under      │
//! │  concurrent sales and restocks.                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info};

use meridian_core::{validation, Product, ProductStatus, LOW_STOCK_THRESHOLD};
use meridian_db::repository::product::generate_product_id;
use meridian_db::{Database, ProductUpdate, StockAdjustOutcome, StockSummary};

use crate::context::RequestContext;
use crate::error::{EngineError, EngineResult};

// =============================================================================
// Inputs
// =============================================================================

/// Payload for creating a catalog product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub barcode: String,
    pub name: String,
    #[serde(default)]
    pub item_code: Option<String>,
    pub color: String,
    pub size: String,
    /// Initial on-hand quantity; zero is allowed (product starts inactive).
    #[serde(default)]
    pub quantity: i64,
    pub b2b_price_cents: i64,
    pub b2c_price_cents: i64,
    pub purchase_price_cents: i64,
    #[serde(default)]
    pub tax_rate_bps: u32,
}

impl NewProduct {
    fn validate(&self) -> EngineResult<()> {
        validation::validate_barcode(&self.barcode)?;
        validation::validate_product_name(&self.name)?;
        validation::validate_variant_label("color", &self.color)?;
        validation::validate_variant_label("size", &self.size)?;
        validation::validate_stock_quantity(self.quantity)?;
        validation::validate_price_cents(self.b2b_price_cents)?;
        validation::validate_price_cents(self.b2c_price_cents)?;
        validation::validate_price_cents(self.purchase_price_cents)?;
        validation::validate_tax_rate_bps(self.tax_rate_bps)?;
        Ok(())
    }
}

// =============================================================================
// Catalog Service
// =============================================================================

/// Catalog operations for one database.
#[derive(Debug, Clone)]
pub struct CatalogService {
    db: Database,
}

impl CatalogService {
    /// Creates a catalog service over an open database.
    pub fn new(db: Database) -> Self {
        CatalogService { db }
    }

    /// Creates a product.
    ///
    /// ## Errors
    /// * `Duplicate` - barcode or (name, color, size) variant already
    ///   exists in this branch
    pub async fn create_product(
        &self,
        ctx: &RequestContext,
        input: NewProduct,
    ) -> EngineResult<Product> {
        ctx.validate()?;
        input.validate()?;

        debug!(branch_id = %ctx.branch_id, barcode = %input.barcode, "create_product");

        let now = Utc::now();
        let product = Product {
            id: generate_product_id(),
            branch_id: ctx.branch_id.clone(),
            user_id: ctx.user_id.clone(),
            barcode: input.barcode.trim().to_string(),
            name: input.name.trim().to_string(),
            item_code: input.item_code,
            color: input.color.trim().to_string(),
            size: input.size.trim().to_string(),
            quantity: input.quantity,
            b2b_price_cents: input.b2b_price_cents,
            b2c_price_cents: input.b2c_price_cents,
            purchase_price_cents: input.purchase_price_cents,
            tax_rate_bps: input.tax_rate_bps,
            status: ProductStatus::for_quantity(input.quantity),
            created_at: now,
            updated_at: now,
        };

        self.db.products().insert(&product).await?;

        info!(product_id = %product.id, barcode = %product.barcode, "Product created");

        Ok(product)
    }

    /// Applies an allow-listed field update to a product.
    ///
    /// Quantity and status are not updatable here: stock moves only
    /// through [`add_stock`](Self::add_stock) /
    /// [`reduce_stock`](Self::reduce_stock) and billing.
    pub async fn update_product(
        &self,
        ctx: &RequestContext,
        product_id: &str,
        update: ProductUpdate,
    ) -> EngineResult<Product> {
        ctx.validate()?;
        validation::validate_uuid("product_id", product_id)
            .map_err(|_| EngineError::invalid_reference("product_id", product_id))?;

        if update.is_empty() {
            return Err(EngineError::InvalidInput(
                "update contains no fields".to_string(),
            ));
        }
        if let Some(barcode) = &update.barcode {
            validation::validate_barcode(barcode)?;
        }
        if let Some(name) = &update.name {
            validation::validate_product_name(name)?;
        }
        if let Some(color) = &update.color {
            validation::validate_variant_label("color", color)?;
        }
        if let Some(size) = &update.size {
            validation::validate_variant_label("size", size)?;
        }
        for price in [
            update.b2b_price_cents,
            update.b2c_price_cents,
            update.purchase_price_cents,
        ]
        .into_iter()
        .flatten()
        {
            validation::validate_price_cents(price)?;
        }
        if let Some(bps) = update.tax_rate_bps {
            validation::validate_tax_rate_bps(bps)?;
        }

        debug!(product_id = %product_id, "update_product");

        self.db
            .products()
            .update_fields(&ctx.branch_id, product_id, &update)
            .await?;

        self.get_product(ctx, product_id).await
    }

    /// Deletes a product from the catalog.
    ///
    /// Historical invoice lines keep their frozen snapshots.
    pub async fn delete_product(&self, ctx: &RequestContext, product_id: &str) -> EngineResult<()> {
        ctx.validate()?;
        validation::validate_uuid("product_id", product_id)
            .map_err(|_| EngineError::invalid_reference("product_id", product_id))?;

        self.db.products().delete(&ctx.branch_id, product_id).await?;

        info!(product_id = %product_id, "Product deleted");

        Ok(())
    }

    /// Fetches a product by ID.
    pub async fn get_product(&self, ctx: &RequestContext, product_id: &str) -> EngineResult<Product> {
        ctx.validate()?;
        validation::validate_uuid("product_id", product_id)
            .map_err(|_| EngineError::invalid_reference("product_id", product_id))?;

        self.db
            .products()
            .get_by_id(&ctx.branch_id, product_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Product", product_id))
    }

    /// Fetches a product by barcode.
    pub async fn get_product_by_barcode(
        &self,
        ctx: &RequestContext,
        barcode: &str,
    ) -> EngineResult<Product> {
        ctx.validate()?;
        validation::validate_barcode(barcode)?;

        self.db
            .products()
            .get_by_barcode(&ctx.branch_id, barcode)
            .await?
            .ok_or_else(|| EngineError::not_found("Product", barcode))
    }

    /// Lists products in the branch, ordered by name.
    pub async fn list_products(&self, ctx: &RequestContext, limit: u32) -> EngineResult<Vec<Product>> {
        ctx.validate()?;
        Ok(self.db.products().list(&ctx.branch_id, limit).await?)
    }

    /// Lists products filtered by derived status (sellable or sold out).
    pub async fn list_products_by_status(
        &self,
        ctx: &RequestContext,
        status: ProductStatus,
        limit: u32,
    ) -> EngineResult<Vec<Product>> {
        ctx.validate()?;
        Ok(self
            .db
            .products()
            .list_by_status(&ctx.branch_id, status, limit)
            .await?)
    }

    /// Receives stock: `quantity` units added to the product.
    pub async fn add_stock(
        &self,
        ctx: &RequestContext,
        product_id: &str,
        quantity: i64,
    ) -> EngineResult<Product> {
        ctx.validate()?;
        validation::validate_uuid("product_id", product_id)
            .map_err(|_| EngineError::invalid_reference("product_id", product_id))?;
        validation::validate_quantity(quantity)?;

        debug!(product_id = %product_id, quantity = %quantity, "add_stock");

        match self
            .db
            .products()
            .adjust_stock_standalone(&ctx.branch_id, product_id, quantity)
            .await?
        {
            StockAdjustOutcome::Adjusted => {}
            StockAdjustOutcome::NotFound => {
                return Err(EngineError::not_found("Product", product_id));
            }
            StockAdjustOutcome::Insufficient { .. } => {
                // Unreachable: a positive delta always satisfies the floor.
                return Err(EngineError::Storage(
                    "stock receipt rejected by floor check".to_string(),
                ));
            }
        }

        info!(product_id = %product_id, quantity = %quantity, "Stock added");

        self.get_product(ctx, product_id).await
    }

    /// Removes stock outside of billing (damage, shrinkage, transfer).
    ///
    /// ## Errors
    /// * `InsufficientStock` - reduction would push stock below zero
    pub async fn reduce_stock(
        &self,
        ctx: &RequestContext,
        product_id: &str,
        quantity: i64,
    ) -> EngineResult<Product> {
        ctx.validate()?;
        validation::validate_uuid("product_id", product_id)
            .map_err(|_| EngineError::invalid_reference("product_id", product_id))?;
        validation::validate_quantity(quantity)?;

        debug!(product_id = %product_id, quantity = %quantity, "reduce_stock");

        match self
            .db
            .products()
            .adjust_stock_standalone(&ctx.branch_id, product_id, -quantity)
            .await?
        {
            StockAdjustOutcome::Adjusted => {}
            StockAdjustOutcome::NotFound => {
                return Err(EngineError::not_found("Product", product_id));
            }
            StockAdjustOutcome::Insufficient { available } => {
                let product = self.get_product(ctx, product_id).await?;
                return Err(EngineError::InsufficientStock {
                    name: product.name,
                    available,
                    requested: quantity,
                });
            }
        }

        info!(product_id = %product_id, quantity = %quantity, "Stock reduced");

        self.get_product(ctx, product_id).await
    }

    /// Lists products at or below the low-stock threshold.
    pub async fn low_stock_products(&self, ctx: &RequestContext) -> EngineResult<Vec<Product>> {
        ctx.validate()?;
        Ok(self
            .db
            .products()
            .low_stock(&ctx.branch_id, LOW_STOCK_THRESHOLD)
            .await?)
    }

    /// Aggregates the branch's stock position.
    pub async fn stock_summary(&self, ctx: &RequestContext) -> EngineResult<StockSummary> {
        ctx.validate()?;
        Ok(self
            .db
            .products()
            .stock_summary(&ctx.branch_id, LOW_STOCK_THRESHOLD)
            .await?)
    }
}
