//! # Product Repository
//!
//! Database operations for products, including the stock ledger.
//!
//! ## Stock Ledger
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                            │
//! │                                                                     │
//! │  ❌ WRONG: read, check in Rust, write absolute value               │
//! │     SELECT quantity ...; UPDATE products SET quantity = 7          │
//! │     (two documents can both pass the check)                        │
//! │                                                                     │
//! │  ✅ CORRECT: one conditional delta statement                       │
//! │     UPDATE products SET quantity = quantity - 3                    │
//! │     WHERE id = ? AND quantity >= 3                                 │
//! │                                                                     │
//! │  0 rows affected → re-read quantity → InsufficientStock            │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `reserve` and `restore` take a `&mut SqliteConnection` so they run inside
//! the caller's transaction; the repository methods use the pool.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use shopdesk_core::stock::{apply_adjustment, ensure_available};
use shopdesk_core::validation::{
    validate_barcode, validate_price_cents, validate_product_name, validate_stock_quantity,
};
use shopdesk_core::{CoreError, PriceQuote, Product, ProductKey};

use crate::error::{DbError, DbResult, SaleResult};

const PRODUCT_COLUMNS: &str = "id, name, barcode, quantity, unit_price_cents, buying_price_cents, \
     low_stock_threshold, created_at, updated_at";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let quote = repo.lookup_price(&ProductKey::Barcode("5901234123457".into())).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product
    /// * `Err(Validation)` - Bad name, price, stock or barcode
    /// * `Err(DbError::UniqueViolation)` - Barcode already exists
    pub async fn insert(&self, product: &Product) -> SaleResult<Product> {
        validate_product_name(&product.name)?;
        validate_price_cents(product.unit_price_cents)?;
        validate_price_cents(product.buying_price_cents)?;
        validate_stock_quantity(product.quantity)?;
        if let Some(barcode) = product.barcode.as_deref() {
            validate_barcode(barcode)?;
        }

        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, barcode, quantity,
                unit_price_cents, buying_price_cents, low_stock_threshold,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(product.name.trim())
        .bind(&product.barcode)
        .bind(product.quantity)
        .bind(product.unit_price_cents)
        .bind(product.buying_price_cents)
        .bind(product.low_stock_threshold)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } if field.contains("barcode") => {
                DbError::duplicate("barcode", product.barcode.clone().unwrap_or_default())
            }
            other => other,
        })?;

        Ok(product.clone())
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets a product by its barcode.
    pub async fn get_by_barcode(&self, barcode: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE barcode = ?1", PRODUCT_COLUMNS);
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(barcode.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Price lookup used to prefill the item form.
    ///
    /// Accepts either the product id or a scanned barcode.
    pub async fn lookup_price(&self, key: &ProductKey) -> DbResult<PriceQuote> {
        debug!(?key, "Looking up product price");

        let (product, shown) = match key {
            ProductKey::Id(id) => (self.get_by_id(id).await?, id),
            ProductKey::Barcode(code) => (self.get_by_barcode(code).await?, code),
        };

        product
            .as_ref()
            .map(PriceQuote::from)
            .ok_or_else(|| DbError::not_found("Product", shown.as_str()))
    }

    /// Units on hand.
    pub async fn available(&self, id: &str) -> DbResult<i64> {
        let quantity: Option<i64> = sqlx::query_scalar("SELECT quantity FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        quantity.ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Manual restock or shrinkage.
    ///
    /// Positive `delta` receives stock, negative writes it off. The result
    /// can never go below zero.
    pub async fn adjust(&self, id: &str, delta: i64) -> SaleResult<Product> {
        debug!(id = %id, delta = %delta, "Adjusting stock");

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let result = sqlx::query(
            r#"
            UPDATE products
            SET quantity = quantity + ?2, updated_at = ?3
            WHERE id = ?1 AND quantity + ?2 >= 0
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        let product = fetch(&mut *tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        if result.rows_affected() == 0 {
            // Reports the shortage against the current level.
            apply_adjustment(&product, delta)?;
            return Err(CoreError::invalid_amount("stock adjustment rejected").into());
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(id = %id, delta = %delta, quantity = product.quantity, "Stock adjusted");
        Ok(product)
    }

    /// Products below their own low-stock threshold, lowest first.
    pub async fn low_stock(&self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE quantity < low_stock_threshold \
             ORDER BY quantity ASC, name ASC LIMIT ?1",
            PRODUCT_COLUMNS
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Lists products by name.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products ORDER BY name LIMIT ?1",
            PRODUCT_COLUMNS
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Counts total products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// In-transaction ledger operations
// =============================================================================

/// Loads a product on the caller's connection.
pub(crate) async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(product)
}

/// Takes `quantity` units of `product` off the shelf.
///
/// Check and decrement are one statement, so two documents racing for the
/// last units cannot both succeed.
pub(crate) async fn reserve(
    conn: &mut SqliteConnection,
    product: &Product,
    quantity: i64,
) -> SaleResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET quantity = quantity - ?2, updated_at = ?3
        WHERE id = ?1 AND quantity >= ?2
        "#,
    )
    .bind(&product.id)
    .bind(quantity)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await
    .map_err(DbError::from)?;

    if result.rows_affected() == 0 {
        let current = fetch(conn, &product.id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &product.id))?;
        ensure_available(&current, quantity)?;
        // Only reachable if the row changed between the two statements.
        return Err(CoreError::Conflict {
            what: format!("stock of {}", current.name),
        }
        .into());
    }

    debug!(product_id = %product.id, quantity, "Stock reserved");
    Ok(())
}

/// Puts `quantity` units back on the shelf.
pub(crate) async fn restore(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE products SET quantity = quantity + ?2, updated_at = ?3 WHERE id = ?1",
    )
    .bind(product_id)
    .bind(quantity)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", product_id));
    }

    debug!(product_id = %product_id, quantity, "Stock restored");
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
