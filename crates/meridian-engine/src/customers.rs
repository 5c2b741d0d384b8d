//! # Customer Directory
//!
//! Branch-scoped customer records. The directory exists to serve
//! billing: the tier on a customer (B2B/B2C) decides which price a
//! product sells at when scanned onto that customer's invoice.

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info};

use meridian_core::{Customer, CustomerType, ValidationError};
use meridian_db::repository::customer::generate_customer_id;
use meridian_db::Database;

use crate::context::RequestContext;
use crate::error::{EngineError, EngineResult};

/// Payload for creating a customer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    pub name: String,
    pub customer_type: CustomerType,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl NewCustomer {
    fn validate(&self) -> EngineResult<()> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::Required {
                field: "name".to_string(),
            }
            .into());
        }
        if name.len() > 200 {
            return Err(ValidationError::TooLong {
                field: "name".to_string(),
                max: 200,
            }
            .into());
        }
        if let Some(email) = &self.email {
            if !email.contains('@') {
                return Err(ValidationError::InvalidFormat {
                    field: "email".to_string(),
                    reason: "must contain '@'".to_string(),
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Directory operations for one database.
#[derive(Debug, Clone)]
pub struct CustomerDirectory {
    db: Database,
}

impl CustomerDirectory {
    /// Creates a customer directory over an open database.
    pub fn new(db: Database) -> Self {
        CustomerDirectory { db }
    }

    /// Creates a customer.
    pub async fn create_customer(
        &self,
        ctx: &RequestContext,
        input: NewCustomer,
    ) -> EngineResult<Customer> {
        ctx.validate()?;
        input.validate()?;

        debug!(branch_id = %ctx.branch_id, name = %input.name, "create_customer");

        let now = Utc::now();
        let customer = Customer {
            id: generate_customer_id(),
            branch_id: ctx.branch_id.clone(),
            customer_type: input.customer_type,
            name: input.name.trim().to_string(),
            email: input.email,
            phone: input.phone,
            created_at: now,
            updated_at: now,
        };

        self.db.customers().insert(&customer).await?;

        info!(customer_id = %customer.id, tier = ?customer.customer_type, "Customer created");

        Ok(customer)
    }

    /// Fetches a customer by ID.
    pub async fn get_customer(
        &self,
        ctx: &RequestContext,
        customer_id: &str,
    ) -> EngineResult<Customer> {
        ctx.validate()?;
        meridian_core::validation::validate_uuid("customer_id", customer_id)
            .map_err(|_| EngineError::invalid_reference("customer_id", customer_id))?;

        self.db
            .customers()
            .get_by_id(&ctx.branch_id, customer_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Customer", customer_id))
    }

    /// Lists customers in the branch, ordered by name.
    pub async fn list_customers(
        &self,
        ctx: &RequestContext,
        limit: u32,
    ) -> EngineResult<Vec<Customer>> {
        ctx.validate()?;
        Ok(self.db.customers().list(&ctx.branch_id, limit).await?)
    }
}
