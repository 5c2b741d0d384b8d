//! Shared test fixtures: an in-memory database with the full schema,
//! the three services, and seed helpers.

#![allow(dead_code)]

use meridian_core::{Customer, CustomerType, Product};
use meridian_db::{Database, DbConfig};
use meridian_engine::{
    BillingEngine, CatalogService, CustomerDirectory, NewCustomer, NewProduct, RequestContext,
};

pub struct TestEnv {
    pub db: Database,
    pub billing: BillingEngine,
    pub catalog: CatalogService,
    pub customers: CustomerDirectory,
    pub ctx: RequestContext,
}

pub async fn setup() -> TestEnv {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    TestEnv {
        billing: BillingEngine::new(db.clone()),
        catalog: CatalogService::new(db.clone()),
        customers: CustomerDirectory::new(db.clone()),
        ctx: RequestContext::new("branch-1", "user-1"),
        db,
    }
}

/// Seeds a product with the given barcode, retail price, tax rate and
/// starting stock. Trade price is 80% of retail.
pub async fn seed_product(
    env: &TestEnv,
    barcode: &str,
    b2c_price_cents: i64,
    tax_rate_bps: u32,
    quantity: i64,
) -> Product {
    env.catalog
        .create_product(
            &env.ctx,
            NewProduct {
                barcode: barcode.to_string(),
                name: format!("Test Shirt {}", barcode),
                item_code: None,
                color: "Navy".to_string(),
                size: "M".to_string(),
                quantity,
                b2b_price_cents: b2c_price_cents * 80 / 100,
                b2c_price_cents,
                purchase_price_cents: b2c_price_cents / 2,
                tax_rate_bps,
            },
        )
        .await
        .unwrap()
}

pub async fn seed_customer(env: &TestEnv, tier: CustomerType) -> Customer {
    env.customers
        .create_customer(
            &env.ctx,
            NewCustomer {
                name: match tier {
                    CustomerType::B2b => "Harbor Outfitters".to_string(),
                    CustomerType::B2c => "Walk-in Counter".to_string(),
                },
                customer_type: tier,
                email: None,
                phone: None,
            },
        )
        .await
        .unwrap()
}

/// Current on-hand quantity of a product, read straight from the catalog.
pub async fn stock_of(env: &TestEnv, product_id: &str) -> i64 {
    env.catalog
        .get_product(&env.ctx, product_id)
        .await
        .unwrap()
        .quantity
}
