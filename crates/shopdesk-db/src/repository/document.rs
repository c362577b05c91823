//! # Document Repository
//!
//! Rows of `documents` and `document_items`.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Document Lifecycle                                │
//! │                                                                         │
//! │  1. CREATE                                                             │
//! │     └── insert() → Document { status: unpaid, number: POS-007 }        │
//! │                                                                         │
//! │  2. ITEMS                                                              │
//! │     └── insert_item() / delete_item()                                  │
//! │     └── store_totals() → full re-sum written back                      │
//! │                                                                         │
//! │  3. PAY                                                                │
//! │     └── store_status(paid, paid_at)                                    │
//! │                                                                         │
//! │  4. (OPTIONAL) DELETE                                                  │
//! │     └── delete() → items cascade                                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The write path is made of free functions over `&mut SqliteConnection`
//! that the engine calls inside one transaction. [`DocumentRepository`] is
//! the read side over the pool.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use shopdesk_core::document::Totals;
use shopdesk_core::{Document, DocumentKind, DocumentStatus, Item};

use crate::error::{DbError, DbResult};
use crate::repository::customer::CustomerAggregates;

const DOCUMENT_COLUMNS: &str = "id, kind, number, sequence, status, customer_id, customer_name, \
     contact_number, email, subtotal_cents, discount_cents, total_cents, date, due_date, \
     created_at, updated_at, paid_at";

const ITEM_COLUMNS: &str = "id, document_id, product_id, position, name_snapshot, quantity, \
     unit_price_cents, amount_cents, created_at";

/// Read-side repository for documents.
#[derive(Debug, Clone)]
pub struct DocumentRepository {
    pool: SqlitePool,
}

impl DocumentRepository {
    /// Creates a new DocumentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DocumentRepository { pool }
    }

    /// Gets a document by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Document>> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    /// Gets a document by its business number (`POS-001`).
    pub async fn get_by_number(&self, number: &str) -> DbResult<Option<Document>> {
        let sql = format!("SELECT {} FROM documents WHERE number = ?1", DOCUMENT_COLUMNS);
        let document = sqlx::query_as::<_, Document>(&sql)
            .bind(number)
            .fetch_optional(&self.pool)
            .await?;

        Ok(document)
    }

    /// Items of a document in insertion order.
    pub async fn items(&self, document_id: &str) -> DbResult<Vec<Item>> {
        let mut conn = self.pool.acquire().await?;
        fetch_items(&mut conn, document_id).await
    }

    /// Lists documents of one kind, newest number first.
    pub async fn list(
        &self,
        kind: DocumentKind,
        status: Option<DocumentStatus>,
        limit: u32,
    ) -> DbResult<Vec<Document>> {
        debug!(kind = %kind, ?status, limit, "Listing documents");

        let documents = match status {
            Some(status) => {
                let sql = format!(
                    "SELECT {} FROM documents WHERE kind = ?1 AND status = ?2 \
                     ORDER BY sequence DESC LIMIT ?3",
                    DOCUMENT_COLUMNS
                );
                sqlx::query_as::<_, Document>(&sql)
                    .bind(kind)
                    .bind(status)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM documents WHERE kind = ?1 ORDER BY sequence DESC LIMIT ?2",
                    DOCUMENT_COLUMNS
                );
                sqlx::query_as::<_, Document>(&sql)
                    .bind(kind)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(documents)
    }

    /// Counts documents of one kind (for diagnostics).
    pub async fn count(&self, kind: DocumentKind) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE kind = ?1")
            .bind(kind)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Documents (in-transaction)
// =============================================================================

/// Bumps `updated_at`.
///
/// Engine transactions start with this so SQLite takes the write lock
/// before any read; it doubles as the existence check.
pub(crate) async fn touch(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    let result = sqlx::query("UPDATE documents SET updated_at = ?2 WHERE id = ?1")
        .bind(id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Document", id));
    }
    Ok(())
}

pub(crate) async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Document>> {
    let sql = format!("SELECT {} FROM documents WHERE id = ?1", DOCUMENT_COLUMNS);
    let document = sqlx::query_as::<_, Document>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(document)
}

/// Like [`fetch`] but a missing row is an error.
pub(crate) async fn load(conn: &mut SqliteConnection, id: &str) -> DbResult<Document> {
    fetch(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("Document", id))
}

pub(crate) async fn insert(conn: &mut SqliteConnection, document: &Document) -> DbResult<()> {
    debug!(id = %document.id, number = %document.number, "Inserting document");

    sqlx::query(
        r#"
        INSERT INTO documents (
            id, kind, number, sequence, status,
            customer_id, customer_name, contact_number, email,
            subtotal_cents, discount_cents, total_cents,
            date, due_date, created_at, updated_at, paid_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5,
            ?6, ?7, ?8, ?9,
            ?10, ?11, ?12,
            ?13, ?14, ?15, ?16, ?17
        )
        "#,
    )
    .bind(&document.id)
    .bind(document.kind)
    .bind(&document.number)
    .bind(document.sequence)
    .bind(document.status)
    .bind(&document.customer_id)
    .bind(&document.customer_name)
    .bind(&document.contact_number)
    .bind(&document.email)
    .bind(document.subtotal_cents)
    .bind(document.discount_cents)
    .bind(document.total_cents)
    .bind(document.date)
    .bind(document.due_date)
    .bind(document.created_at)
    .bind(document.updated_at)
    .bind(document.paid_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Writes the result of a recompute.
pub(crate) async fn store_totals(
    conn: &mut SqliteConnection,
    id: &str,
    totals: &Totals,
) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE documents
        SET subtotal_cents = ?2, discount_cents = ?3, total_cents = ?4, updated_at = ?5
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(totals.subtotal.cents())
    .bind(totals.discount.cents())
    .bind(totals.total.cents())
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn store_status(
    conn: &mut SqliteConnection,
    id: &str,
    status: DocumentStatus,
    paid_at: Option<DateTime<Utc>>,
) -> DbResult<()> {
    sqlx::query("UPDATE documents SET status = ?2, paid_at = ?3, updated_at = ?4 WHERE id = ?1")
        .bind(id)
        .bind(status)
        .bind(paid_at)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Deletes the document; items go with it (ON DELETE CASCADE).
pub(crate) async fn delete(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    let result = sqlx::query("DELETE FROM documents WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Document", id));
    }
    Ok(())
}

// =============================================================================
// Items (in-transaction)
// =============================================================================

pub(crate) async fn fetch_items(
    conn: &mut SqliteConnection,
    document_id: &str,
) -> DbResult<Vec<Item>> {
    let sql = format!(
        "SELECT {} FROM document_items WHERE document_id = ?1 ORDER BY position",
        ITEM_COLUMNS
    );
    let items = sqlx::query_as::<_, Item>(&sql)
        .bind(document_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(items)
}

pub(crate) async fn fetch_item(
    conn: &mut SqliteConnection,
    document_id: &str,
    item_id: &str,
) -> DbResult<Option<Item>> {
    let sql = format!(
        "SELECT {} FROM document_items WHERE id = ?1 AND document_id = ?2",
        ITEM_COLUMNS
    );
    let item = sqlx::query_as::<_, Item>(&sql)
        .bind(item_id)
        .bind(document_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(item)
}

/// Next free insertion position (1-based).
pub(crate) async fn next_position(conn: &mut SqliteConnection, document_id: &str) -> DbResult<i64> {
    let position: i64 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(position), 0) + 1 FROM document_items WHERE document_id = ?1",
    )
    .bind(document_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(position)
}

pub(crate) async fn insert_item(conn: &mut SqliteConnection, item: &Item) -> DbResult<()> {
    debug!(document_id = %item.document_id, product_id = %item.product_id, "Inserting item");

    sqlx::query(
        r#"
        INSERT INTO document_items (
            id, document_id, product_id, position, name_snapshot,
            quantity, unit_price_cents, amount_cents, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&item.id)
    .bind(&item.document_id)
    .bind(&item.product_id)
    .bind(item.position)
    .bind(&item.name_snapshot)
    .bind(item.quantity)
    .bind(item.unit_price_cents)
    .bind(item.amount_cents)
    .bind(item.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn delete_item(conn: &mut SqliteConnection, item_id: &str) -> DbResult<()> {
    sqlx::query("DELETE FROM document_items WHERE id = ?1")
        .bind(item_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

// =============================================================================
// Aggregates
// =============================================================================

/// Sums a customer's documents straight from the source rows.
///
/// A document belongs to the customer if it references them (invoices) or,
/// for POS tickets, if its contact number equals their phone.
pub(crate) async fn aggregate_for_customer(
    conn: &mut SqliteConnection,
    customer_id: &str,
    phone: &str,
) -> DbResult<CustomerAggregates> {
    let (total_purchases_cents, outstanding_balance_cents, last_purchase): (
        i64,
        i64,
        Option<chrono::NaiveDate>,
    ) = sqlx::query_as(
        r#"
        SELECT
            COALESCE(SUM(CASE WHEN status = 'paid' THEN total_cents END), 0),
            COALESCE(SUM(CASE WHEN status IN ('unpaid', 'overdue') THEN total_cents END), 0),
            MAX(CASE WHEN status = 'paid' THEN date END)
        FROM documents
        WHERE customer_id = ?1
           OR (kind = 'pos' AND contact_number = ?2)
        "#,
    )
    .bind(customer_id)
    .bind(phone)
    .fetch_one(&mut *conn)
    .await?;

    Ok(CustomerAggregates {
        total_purchases_cents,
        outstanding_balance_cents,
        last_purchase,
    })
}
