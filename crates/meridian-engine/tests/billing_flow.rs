//! End-to-end billing flows: scanning, quantity updates, removal,
//! completion and deletion, with stock and totals checked after every
//! step.

mod common;

use common::{seed_customer, seed_product, setup, stock_of};
use meridian_core::{CustomerType, InvoiceStatus, ProductStatus, MAX_INVOICE_LINES};
use meridian_engine::{EngineError, ErrorCode, RequestContext};
use uuid::Uuid;

#[tokio::test]
async fn scan_decrements_stock_and_builds_totals() {
    let env = setup().await;
    // $100.00 retail, 10% tax, 10 in stock
    let product = seed_product(&env, "8900000000001", 10000, 1000, 10).await;
    let customer = seed_customer(&env, CustomerType::B2c).await;

    let invoice = env
        .billing
        .create_invoice(&env.ctx, &customer.id)
        .await
        .unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Draft);
    assert_eq!(invoice.total_cents, 0);
    assert!(invoice.items.is_empty());

    let invoice = env
        .billing
        .add_item_by_barcode(&env.ctx, &invoice.id, "8900000000001", 3)
        .await
        .unwrap();

    assert_eq!(invoice.items.len(), 1);
    let line = &invoice.items[0];
    assert_eq!(line.line_no, 1);
    assert_eq!(line.quantity, 3);
    assert_eq!(line.unit_price_cents, 10000);
    assert_eq!(line.subtotal_cents, 30000);
    assert_eq!(line.tax_cents, 3000);
    assert_eq!(line.total_cents, 33000);

    assert_eq!(invoice.subtotal_cents, 30000);
    assert_eq!(invoice.tax_cents, 3000);
    assert_eq!(invoice.total_cents, 33000);

    assert_eq!(stock_of(&env, &product.id).await, 7);
}

#[tokio::test]
async fn quantity_update_moves_stock_by_difference() {
    let env = setup().await;
    let product = seed_product(&env, "8900000000002", 10000, 1000, 10).await;
    let customer = seed_customer(&env, CustomerType::B2c).await;

    let invoice = env
        .billing
        .create_invoice(&env.ctx, &customer.id)
        .await
        .unwrap();
    env.billing
        .add_item_by_barcode(&env.ctx, &invoice.id, "8900000000002", 3)
        .await
        .unwrap();

    // 3 → 5: two more units leave stock, totals recomputed at the
    // frozen unit price and rate.
    let updated = env
        .billing
        .update_item_quantity(&env.ctx, &invoice.id, &product.id, 5)
        .await
        .unwrap();

    assert_eq!(updated.items[0].quantity, 5);
    assert_eq!(updated.subtotal_cents, 50000);
    assert_eq!(updated.tax_cents, 5000);
    assert_eq!(updated.total_cents, 55000);
    assert_eq!(stock_of(&env, &product.id).await, 5);

    // 5 → 2: three units come back.
    let updated = env
        .billing
        .update_item_quantity(&env.ctx, &invoice.id, &product.id, 2)
        .await
        .unwrap();

    assert_eq!(updated.total_cents, 22000);
    assert_eq!(stock_of(&env, &product.id).await, 8);
}

#[tokio::test]
async fn remove_restores_stock_and_zeroes_totals() {
    let env = setup().await;
    let product = seed_product(&env, "8900000000003", 1099, 825, 6).await;
    let customer = seed_customer(&env, CustomerType::B2c).await;

    let invoice = env
        .billing
        .create_invoice(&env.ctx, &customer.id)
        .await
        .unwrap();
    env.billing
        .add_item_by_barcode(&env.ctx, &invoice.id, "8900000000003", 4)
        .await
        .unwrap();
    assert_eq!(stock_of(&env, &product.id).await, 2);

    let invoice = env
        .billing
        .remove_item(&env.ctx, &invoice.id, &product.id)
        .await
        .unwrap();

    assert!(invoice.items.is_empty());
    assert_eq!(invoice.subtotal_cents, 0);
    assert_eq!(invoice.tax_cents, 0);
    assert_eq!(invoice.total_cents, 0);
    assert_eq!(stock_of(&env, &product.id).await, 6);
}

#[tokio::test]
async fn insufficient_stock_applies_nothing() {
    let env = setup().await;
    let product = seed_product(&env, "8900000000004", 5000, 0, 2).await;
    let customer = seed_customer(&env, CustomerType::B2c).await;

    let invoice = env
        .billing
        .create_invoice(&env.ctx, &customer.id)
        .await
        .unwrap();

    let err = env
        .billing
        .add_item_by_barcode(&env.ctx, &invoice.id, "8900000000004", 5)
        .await
        .unwrap_err();

    match err {
        EngineError::InsufficientStock {
            available,
            requested,
            ..
        } => {
            assert_eq!(available, 2);
            assert_eq!(requested, 5);
        }
        other => panic!("expected InsufficientStock, got {:?}", other),
    }

    // Rollback: stock untouched, no line, totals still zero.
    assert_eq!(stock_of(&env, &product.id).await, 2);
    let invoice = env.billing.get_invoice(&env.ctx, &invoice.id).await.unwrap();
    assert!(invoice.items.is_empty());
    assert_eq!(invoice.total_cents, 0);
}

#[tokio::test]
async fn rescan_appends_duplicate_line_and_targets_first() {
    let env = setup().await;
    let product = seed_product(&env, "8900000000005", 2000, 0, 10).await;
    let customer = seed_customer(&env, CustomerType::B2c).await;

    let invoice = env
        .billing
        .create_invoice(&env.ctx, &customer.id)
        .await
        .unwrap();
    env.billing
        .add_item_by_barcode(&env.ctx, &invoice.id, "8900000000005", 2)
        .await
        .unwrap();
    let invoice2 = env
        .billing
        .add_item_by_barcode(&env.ctx, &invoice.id, "8900000000005", 1)
        .await
        .unwrap();

    // Lines are appended, never merged.
    assert_eq!(invoice2.items.len(), 2);
    assert_eq!(invoice2.items[0].line_no, 1);
    assert_eq!(invoice2.items[0].quantity, 2);
    assert_eq!(invoice2.items[1].line_no, 2);
    assert_eq!(invoice2.items[1].quantity, 1);
    assert_eq!(invoice2.subtotal_cents, 6000);
    assert_eq!(stock_of(&env, &product.id).await, 7);

    // Product-addressed ops act on the earliest line.
    let after = env
        .billing
        .remove_item(&env.ctx, &invoice.id, &product.id)
        .await
        .unwrap();
    assert_eq!(after.items.len(), 1);
    assert_eq!(after.items[0].line_no, 2);
    assert_eq!(after.subtotal_cents, 2000);
    assert_eq!(stock_of(&env, &product.id).await, 9);
}

#[tokio::test]
async fn b2b_customer_gets_trade_price() {
    let env = setup().await;
    // Retail $100.00 → trade $80.00 via the seed helper
    seed_product(&env, "8900000000006", 10000, 1000, 10).await;
    let customer = seed_customer(&env, CustomerType::B2b).await;

    let invoice = env
        .billing
        .create_invoice(&env.ctx, &customer.id)
        .await
        .unwrap();
    let invoice = env
        .billing
        .add_item_by_barcode(&env.ctx, &invoice.id, "8900000000006", 1)
        .await
        .unwrap();

    assert_eq!(invoice.customer.customer_type, CustomerType::B2b);
    assert_eq!(invoice.items[0].unit_price_cents, 8000);
    assert_eq!(invoice.subtotal_cents, 8000);
    assert_eq!(invoice.tax_cents, 800);
}

#[tokio::test]
async fn completion_is_terminal() {
    let env = setup().await;
    let product = seed_product(&env, "8900000000007", 3000, 500, 5).await;
    let customer = seed_customer(&env, CustomerType::B2c).await;

    let invoice = env
        .billing
        .create_invoice(&env.ctx, &customer.id)
        .await
        .unwrap();
    env.billing
        .add_item_by_barcode(&env.ctx, &invoice.id, "8900000000007", 1)
        .await
        .unwrap();

    let completed = env
        .billing
        .complete_invoice(&env.ctx, &invoice.id)
        .await
        .unwrap();
    assert_eq!(completed.status, InvoiceStatus::Completed);
    assert!(completed.completed_at.is_some());

    // Completing again is an InvalidState, not a NotFound.
    let err = env
        .billing
        .complete_invoice(&env.ctx, &invoice.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidState);

    // All mutations are rejected after completion.
    let err = env
        .billing
        .add_item_by_barcode(&env.ctx, &invoice.id, "8900000000007", 1)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidState);

    let err = env
        .billing
        .update_item_quantity(&env.ctx, &invoice.id, &product.id, 2)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidState);

    let err = env
        .billing
        .remove_item(&env.ctx, &invoice.id, &product.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidState);

    let err = env
        .billing
        .delete_invoice(&env.ctx, &invoice.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidState);

    // Stock stays where the sale left it.
    assert_eq!(stock_of(&env, &product.id).await, 4);
}

#[tokio::test]
async fn delete_draft_restores_every_line() {
    let env = setup().await;
    let p1 = seed_product(&env, "8900000000008", 1500, 0, 5).await;
    let p2 = seed_product(&env, "8900000000009", 2500, 1000, 8).await;
    let customer = seed_customer(&env, CustomerType::B2c).await;

    let invoice = env
        .billing
        .create_invoice(&env.ctx, &customer.id)
        .await
        .unwrap();
    env.billing
        .add_item_by_barcode(&env.ctx, &invoice.id, "8900000000008", 2)
        .await
        .unwrap();
    env.billing
        .add_item_by_barcode(&env.ctx, &invoice.id, "8900000000009", 3)
        .await
        .unwrap();
    assert_eq!(stock_of(&env, &p1.id).await, 3);
    assert_eq!(stock_of(&env, &p2.id).await, 5);

    env.billing.delete_invoice(&env.ctx, &invoice.id).await.unwrap();

    assert_eq!(stock_of(&env, &p1.id).await, 5);
    assert_eq!(stock_of(&env, &p2.id).await, 8);

    let err = env.billing.get_invoice(&env.ctx, &invoice.id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn remove_after_catalog_delete_still_drops_line() {
    let env = setup().await;
    let product = seed_product(&env, "8900000000016", 2000, 1000, 5).await;
    let customer = seed_customer(&env, CustomerType::B2c).await;

    let invoice = env
        .billing
        .create_invoice(&env.ctx, &customer.id)
        .await
        .unwrap();
    env.billing
        .add_item_by_barcode(&env.ctx, &invoice.id, "8900000000016", 2)
        .await
        .unwrap();

    // The catalog row disappears while the draft still references it.
    env.catalog.delete_product(&env.ctx, &product.id).await.unwrap();

    // The line is removed and totals adjusted; there is simply no stock
    // row left to restore into.
    let after = env
        .billing
        .remove_item(&env.ctx, &invoice.id, &product.id)
        .await
        .unwrap();
    assert!(after.items.is_empty());
    assert_eq!(after.subtotal_cents, 0);
    assert_eq!(after.tax_cents, 0);
    assert_eq!(after.total_cents, 0);

    let err = env.catalog.get_product(&env.ctx, &product.id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn delete_invoice_aborts_whole_when_a_product_is_missing() {
    let env = setup().await;
    let p1 = seed_product(&env, "8900000000017", 1500, 0, 5).await;
    let p2 = seed_product(&env, "8900000000018", 2500, 1000, 8).await;
    let customer = seed_customer(&env, CustomerType::B2c).await;

    let invoice = env
        .billing
        .create_invoice(&env.ctx, &customer.id)
        .await
        .unwrap();
    env.billing
        .add_item_by_barcode(&env.ctx, &invoice.id, "8900000000017", 2)
        .await
        .unwrap();
    let before = env
        .billing
        .add_item_by_barcode(&env.ctx, &invoice.id, "8900000000018", 3)
        .await
        .unwrap();

    env.catalog.delete_product(&env.ctx, &p2.id).await.unwrap();

    // One line's product is gone: a partial restore would lose units,
    // so nothing is restored and nothing is deleted.
    let err = env
        .billing
        .delete_invoice(&env.ctx, &invoice.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);

    let intact = env.billing.get_invoice(&env.ctx, &invoice.id).await.unwrap();
    assert_eq!(intact.items.len(), 2);
    assert_eq!(intact.total_cents, before.total_cents);
    assert_eq!(stock_of(&env, &p1.id).await, 3);
}

#[tokio::test]
async fn totals_match_line_sums_after_every_mutation() {
    let env = setup().await;
    let p1 = seed_product(&env, "8900000000010", 1099, 825, 20).await;
    seed_product(&env, "8900000000011", 333, 1750, 20).await;
    let customer = seed_customer(&env, CustomerType::B2c).await;

    let invoice = env
        .billing
        .create_invoice(&env.ctx, &customer.id)
        .await
        .unwrap();

    let check = |detail: &meridian_engine::InvoiceDetail| {
        let subtotal: i64 = detail.items.iter().map(|l| l.subtotal_cents).sum();
        let tax: i64 = detail.items.iter().map(|l| l.tax_cents).sum();
        assert_eq!(detail.subtotal_cents, subtotal);
        assert_eq!(detail.tax_cents, tax);
        assert_eq!(detail.total_cents, subtotal + tax);
    };

    let d = env
        .billing
        .add_item_by_barcode(&env.ctx, &invoice.id, "8900000000010", 4)
        .await
        .unwrap();
    check(&d);

    let d = env
        .billing
        .add_item_by_barcode(&env.ctx, &invoice.id, "8900000000011", 7)
        .await
        .unwrap();
    check(&d);

    let d = env
        .billing
        .update_item_quantity(&env.ctx, &invoice.id, &p1.id, 9)
        .await
        .unwrap();
    check(&d);

    let d = env
        .billing
        .remove_item(&env.ctx, &invoice.id, &p1.id)
        .await
        .unwrap();
    check(&d);
}

#[tokio::test]
async fn stock_plus_invoiced_units_is_conserved() {
    let env = setup().await;
    let product = seed_product(&env, "8900000000012", 5000, 1000, 12).await;
    let customer = seed_customer(&env, CustomerType::B2c).await;

    let invoice = env
        .billing
        .create_invoice(&env.ctx, &customer.id)
        .await
        .unwrap();

    let conserved = |detail: &meridian_engine::InvoiceDetail, stock: i64| {
        let invoiced: i64 = detail.items.iter().map(|l| l.quantity).sum();
        assert_eq!(stock + invoiced, 12);
    };

    let d = env
        .billing
        .add_item_by_barcode(&env.ctx, &invoice.id, "8900000000012", 5)
        .await
        .unwrap();
    conserved(&d, stock_of(&env, &product.id).await);

    let d = env
        .billing
        .update_item_quantity(&env.ctx, &invoice.id, &product.id, 2)
        .await
        .unwrap();
    conserved(&d, stock_of(&env, &product.id).await);

    let d = env
        .billing
        .add_item_by_barcode(&env.ctx, &invoice.id, "8900000000012", 6)
        .await
        .unwrap();
    conserved(&d, stock_of(&env, &product.id).await);

    let d = env
        .billing
        .remove_item(&env.ctx, &invoice.id, &product.id)
        .await
        .unwrap();
    conserved(&d, stock_of(&env, &product.id).await);
}

#[tokio::test]
async fn branch_scope_isolates_lookups() {
    let env = setup().await;
    let product = seed_product(&env, "8900000000013", 4000, 0, 5).await;
    let customer = seed_customer(&env, CustomerType::B2c).await;

    let invoice = env
        .billing
        .create_invoice(&env.ctx, &customer.id)
        .await
        .unwrap();

    let other = RequestContext::new("branch-2", "user-9");

    // Neither the invoice, the product, nor the customer is visible
    // from another branch.
    let err = env.billing.get_invoice(&other, &invoice.id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);

    let err = env.catalog.get_product(&other, &product.id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);

    let err = env
        .billing
        .create_invoice(&other, &customer.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn malformed_and_unknown_references() {
    let env = setup().await;
    seed_customer(&env, CustomerType::B2c).await;

    // Malformed UUID is an InvalidReference before any I/O happens.
    let err = env
        .billing
        .create_invoice(&env.ctx, "not-a-uuid")
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidReference);

    // Well-formed but unknown invoice id is a NotFound.
    let missing = Uuid::new_v4().to_string();
    let err = env.billing.get_invoice(&env.ctx, &missing).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);

    // Well-formed but unknown customer on create is a NotFound.
    let err = env
        .billing
        .create_invoice(&env.ctx, &Uuid::new_v4().to_string())
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn zero_and_negative_quantities_rejected() {
    let env = setup().await;
    seed_product(&env, "8900000000014", 1000, 0, 5).await;
    let customer = seed_customer(&env, CustomerType::B2c).await;

    let invoice = env
        .billing
        .create_invoice(&env.ctx, &customer.id)
        .await
        .unwrap();

    for qty in [0, -3, 1000] {
        let err = env
            .billing
            .add_item_by_barcode(&env.ctx, &invoice.id, "8900000000014", qty)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidInput, "qty {}", qty);
    }
}

#[tokio::test]
async fn full_invoice_rejects_further_scans() {
    let env = setup().await;
    seed_product(&env, "8900000000019", 100, 0, 500).await;
    let customer = seed_customer(&env, CustomerType::B2c).await;

    let invoice = env
        .billing
        .create_invoice(&env.ctx, &customer.id)
        .await
        .unwrap();

    for _ in 0..MAX_INVOICE_LINES {
        env.billing
            .add_item_by_barcode(&env.ctx, &invoice.id, "8900000000019", 1)
            .await
            .unwrap();
    }

    let err = env
        .billing
        .add_item_by_barcode(&env.ctx, &invoice.id, "8900000000019", 1)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidInput);

    let detail = env.billing.get_invoice(&env.ctx, &invoice.id).await.unwrap();
    assert_eq!(detail.items.len(), MAX_INVOICE_LINES);
}

#[tokio::test]
async fn selling_out_deactivates_and_restock_reactivates() {
    let env = setup().await;
    let product = seed_product(&env, "8900000000015", 2000, 0, 2).await;
    let customer = seed_customer(&env, CustomerType::B2c).await;
    assert_eq!(product.status, ProductStatus::Active);

    let invoice = env
        .billing
        .create_invoice(&env.ctx, &customer.id)
        .await
        .unwrap();
    env.billing
        .add_item_by_barcode(&env.ctx, &invoice.id, "8900000000015", 2)
        .await
        .unwrap();

    let sold_out = env.catalog.get_product(&env.ctx, &product.id).await.unwrap();
    assert_eq!(sold_out.quantity, 0);
    assert_eq!(sold_out.status, ProductStatus::Inactive);

    // Removing the line puts units back and reactivates the product.
    env.billing
        .remove_item(&env.ctx, &invoice.id, &product.id)
        .await
        .unwrap();
    let restored = env.catalog.get_product(&env.ctx, &product.id).await.unwrap();
    assert_eq!(restored.quantity, 2);
    assert_eq!(restored.status, ProductStatus::Active);
}

#[tokio::test]
async fn list_invoices_newest_first() {
    let env = setup().await;
    let customer = seed_customer(&env, CustomerType::B2c).await;

    let first = env
        .billing
        .create_invoice(&env.ctx, &customer.id)
        .await
        .unwrap();
    let second = env
        .billing
        .create_invoice(&env.ctx, &customer.id)
        .await
        .unwrap();

    let invoices = env.billing.list_invoices(&env.ctx, 10).await.unwrap();
    assert_eq!(invoices.len(), 2);
    assert_ne!(first.invoice_number, second.invoice_number);
    assert!(invoices[0].created_at >= invoices[1].created_at);
}
