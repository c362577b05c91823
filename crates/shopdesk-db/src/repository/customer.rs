//! # Customer Repository
//!
//! Registered customers. The aggregate columns (`outstanding_balance_cents`,
//! `total_purchases_cents`, `last_purchase`) are never written from here
//! except through [`store_aggregates`], which only the propagator calls.

use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use shopdesk_core::validation::{validate_customer_name, validate_email, validate_phone};
use shopdesk_core::{Customer, ValidationError};

use crate::error::{DbError, DbResult, SaleError, SaleResult};

const CUSTOMER_COLUMNS: &str = "id, name, email, phone, outstanding_balance_cents, \
     total_purchases_cents, last_purchase, created_at";

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

    /// Registers a customer.
    ///
    /// Aggregates are stored as zero regardless of what `customer` carries;
    /// they are derived from documents, not entered.
    pub async fn insert(&self, customer: &Customer) -> SaleResult<Customer> {
        validate_customer_name(&customer.name)?;
        validate_phone(&customer.phone)?;
        if let Some(email) = customer.email.as_deref() {
            validate_email(email)?;
        }

        debug!(id = %customer.id, phone = %customer.phone, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, name, email, phone,
                outstanding_balance_cents, total_purchases_cents, last_purchase,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, 0, 0, NULL, ?5)
            "#,
        )
        .bind(&customer.id)
        .bind(customer.name.trim())
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } if field.contains("phone") => {
                SaleError::from(ValidationError::Duplicate {
                    field: "phone".to_string(),
                    value: customer.phone.clone(),
                })
            }
            other => SaleError::from(other),
        })?;

        Ok(Customer {
            name: customer.name.trim().to_string(),
            outstanding_balance_cents: 0,
            total_purchases_cents: 0,
            last_purchase: None,
            ..customer.clone()
        })
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    /// Gets a customer by phone.
    pub async fn get_by_phone(&self, phone: &str) -> DbResult<Option<Customer>> {
        let mut conn = self.pool.acquire().await?;
        fetch_by_phone(&mut conn, phone).await
    }

    /// Customers with money still owed, largest balance first.
    pub async fn with_outstanding_balance(&self) -> DbResult<Vec<Customer>> {
        let sql = format!(
            "SELECT {} FROM customers WHERE outstanding_balance_cents > 0 \
             ORDER BY outstanding_balance_cents DESC",
            CUSTOMER_COLUMNS
        );
        let customers = sqlx::query_as::<_, Customer>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(customers)
    }
}

// =============================================================================
// In-transaction operations
// =============================================================================

pub(crate) async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Customer>> {
    let sql = format!("SELECT {} FROM customers WHERE id = ?1", CUSTOMER_COLUMNS);
    let customer = sqlx::query_as::<_, Customer>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(customer)
}

pub(crate) async fn fetch_by_phone(
    conn: &mut SqliteConnection,
    phone: &str,
) -> DbResult<Option<Customer>> {
    let sql = format!("SELECT {} FROM customers WHERE phone = ?1", CUSTOMER_COLUMNS);
    let customer = sqlx::query_as::<_, Customer>(&sql)
        .bind(phone)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(customer)
}

/// Derived values written back by the propagator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CustomerAggregates {
    pub total_purchases_cents: i64,
    pub outstanding_balance_cents: i64,
    pub last_purchase: Option<NaiveDate>,
}

pub(crate) async fn store_aggregates(
    conn: &mut SqliteConnection,
    customer_id: &str,
    aggregates: &CustomerAggregates,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE customers
        SET total_purchases_cents = ?2,
            outstanding_balance_cents = ?3,
            last_purchase = ?4
        WHERE id = ?1
        "#,
    )
    .bind(customer_id)
    .bind(aggregates.total_purchases_cents)
    .bind(aggregates.outstanding_balance_cents)
    .bind(aggregates.last_purchase)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Customer", customer_id));
    }
    Ok(())
}
