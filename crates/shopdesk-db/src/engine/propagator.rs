//! Customer aggregate propagation.
//!
//! Called explicitly by the engine, inside the transaction that changed a
//! document. Always a full recompute from the `documents` rows, never a
//! delta, so running it twice is harmless and running it late repairs drift.

use sqlx::SqliteConnection;
use tracing::debug;

use shopdesk_core::{Customer, Document, DocumentKind};

use crate::error::{DbError, DbResult};
use crate::repository::{customer, document};

/// The registered customer a document counts towards, if any.
pub(crate) async fn owner_of(
    conn: &mut SqliteConnection,
    doc: &Document,
) -> DbResult<Option<Customer>> {
    match (doc.kind, doc.customer_id.as_deref(), doc.contact_number.as_deref()) {
        (DocumentKind::Invoice, Some(id), _) => customer::fetch(conn, id).await,
        (DocumentKind::Pos, _, Some(phone)) => customer::fetch_by_phone(conn, phone).await,
        _ => Ok(None),
    }
}

/// Recomputes and stores one customer's aggregates.
pub(crate) async fn recompute(conn: &mut SqliteConnection, who: &Customer) -> DbResult<Customer> {
    let aggregates = document::aggregate_for_customer(conn, &who.id, &who.phone).await?;
    customer::store_aggregates(conn, &who.id, &aggregates).await?;

    debug!(
        customer_id = %who.id,
        total_purchases = aggregates.total_purchases_cents,
        outstanding = aggregates.outstanding_balance_cents,
        "Customer aggregates recomputed"
    );

    Ok(Customer {
        total_purchases_cents: aggregates.total_purchases_cents,
        outstanding_balance_cents: aggregates.outstanding_balance_cents,
        last_purchase: aggregates.last_purchase,
        ..who.clone()
    })
}

/// Propagates a change of `doc` to its customer. No-op for anonymous walk-ins.
pub(crate) async fn propagate(conn: &mut SqliteConnection, doc: &Document) -> DbResult<()> {
    if let Some(owner) = owner_of(conn, doc).await? {
        recompute(conn, &owner).await?;
    }
    Ok(())
}

/// Recompute by customer id.
pub(crate) async fn reconcile(conn: &mut SqliteConnection, customer_id: &str) -> DbResult<Customer> {
    let who = customer::fetch(conn, customer_id)
        .await?
        .ok_or_else(|| DbError::not_found("Customer", customer_id))?;
    recompute(conn, &who).await
}
