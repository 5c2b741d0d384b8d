//! Customer directory: creation, tier storage, lookup and listing.

mod common;

use common::setup;
use meridian_core::CustomerType;
use meridian_engine::{ErrorCode, NewCustomer};
use uuid::Uuid;

#[tokio::test]
async fn create_and_fetch_customer() {
    let env = setup().await;

    let created = env
        .customers
        .create_customer(
            &env.ctx,
            NewCustomer {
                name: "  Harbor Outfitters  ".to_string(),
                customer_type: CustomerType::B2b,
                email: Some("orders@harbor.example.com".to_string()),
                phone: Some("+1-555-0100".to_string()),
            },
        )
        .await
        .unwrap();

    // Name is trimmed on the way in.
    assert_eq!(created.name, "Harbor Outfitters");
    assert_eq!(created.customer_type, CustomerType::B2b);

    let fetched = env.customers.get_customer(&env.ctx, &created.id).await.unwrap();
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.email.as_deref(), Some("orders@harbor.example.com"));
}

#[tokio::test]
async fn invalid_customer_inputs_rejected() {
    let env = setup().await;

    let err = env
        .customers
        .create_customer(
            &env.ctx,
            NewCustomer {
                name: "   ".to_string(),
                customer_type: CustomerType::B2c,
                email: None,
                phone: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidInput);

    let err = env
        .customers
        .create_customer(
            &env.ctx,
            NewCustomer {
                name: "Lena Fischer".to_string(),
                customer_type: CustomerType::B2c,
                email: Some("not-an-email".to_string()),
                phone: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidInput);
}

#[tokio::test]
async fn unknown_customer_is_not_found() {
    let env = setup().await;
    let missing = Uuid::new_v4().to_string();

    let err = env.customers.get_customer(&env.ctx, &missing).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);

    let err = env
        .customers
        .get_customer(&env.ctx, "not-a-uuid")
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidReference);
}

#[tokio::test]
async fn list_customers_ordered_by_name() {
    let env = setup().await;

    for name in ["Crescent Wholesale", "Amara Boutique", "Walk-in Counter"] {
        env.customers
            .create_customer(
                &env.ctx,
                NewCustomer {
                    name: name.to_string(),
                    customer_type: CustomerType::B2c,
                    email: None,
                    phone: None,
                },
            )
            .await
            .unwrap();
    }

    let listed = env.customers.list_customers(&env.ctx, 10).await.unwrap();
    let names: Vec<&str> = listed.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Amara Boutique", "Crescent Wholesale", "Walk-in Counter"]
    );
}
