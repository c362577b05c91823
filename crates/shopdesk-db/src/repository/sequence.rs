//! # Numbering Counters
//!
//! One `document_sequences` row per document kind. The increment and the
//! read are a single `UPDATE ... RETURNING`, executed on the creating
//! transaction's connection. SQLite holds the write lock from that statement
//! until commit, so no two creators can observe the same value.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use shopdesk_core::{DocumentKind, DocumentNumber};

use crate::error::{DbError, DbResult};

/// Hands out the next number for `kind`.
pub(crate) async fn next_number(
    conn: &mut SqliteConnection,
    kind: DocumentKind,
) -> DbResult<DocumentNumber> {
    let value: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE document_sequences
        SET last_value = last_value + 1
        WHERE kind = ?1
        RETURNING last_value
        "#,
    )
    .bind(kind.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    let sequence = value.ok_or_else(|| DbError::not_found("Sequence", kind.as_str()))?;
    debug!(kind = %kind, sequence, "Allocated document number");

    Ok(DocumentNumber::new(kind, sequence))
}

/// Last value handed out for `kind` (0 before the first document).
pub async fn current_value(pool: &SqlitePool, kind: DocumentKind) -> DbResult<i64> {
    let value: Option<i64> =
        sqlx::query_scalar("SELECT last_value FROM document_sequences WHERE kind = ?1")
            .bind(kind.as_str())
            .fetch_optional(pool)
            .await?;

    value.ok_or_else(|| DbError::not_found("Sequence", kind.as_str()))
}
