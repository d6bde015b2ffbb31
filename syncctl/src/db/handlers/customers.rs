//! Database repository for registry customers.

use crate::{
    db::{
        errors::Result,
        models::customers::{CustomerCreateDBRequest, CustomerDBResponse},
    },
    types::CustomerId,
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use tracing::instrument;
use uuid::Uuid;

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct Customer {
    pub id: CustomerId,
    pub db_id: String,
    pub name: String,
    pub address: String,
    pub place: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

impl From<Customer> for CustomerDBResponse {
    fn from(customer: Customer) -> Self {
        Self {
            id: customer.id,
            db_id: customer.db_id,
            name: customer.name,
            address: customer.address,
            place: customer.place,
            phone: customer.phone,
            created_at: customer.created_at,
        }
    }
}

pub struct Customers<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Customers<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Insert a customer, or return `None` when `(db_id, name)` is already taken.
    #[instrument(skip(self, request), fields(db_id = %request.db_id, name = %request.name), err)]
    pub async fn create(&mut self, request: &CustomerCreateDBRequest) -> Result<Option<CustomerDBResponse>> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (id, db_id, name, address, place, phone)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (db_id, name) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.db_id)
        .bind(&request.name)
        .bind(&request.address)
        .bind(&request.place)
        .bind(&request.phone)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(customer.map(CustomerDBResponse::from))
    }

    #[instrument(skip(self), err)]
    pub async fn list_by_db_id(&mut self, db_id: &str) -> Result<Vec<CustomerDBResponse>> {
        let customers =
            sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE db_id = $1 ORDER BY name ASC")
                .bind(db_id)
                .fetch_all(&mut *self.db)
                .await?;

        Ok(customers.into_iter().map(CustomerDBResponse::from).collect())
    }
}
