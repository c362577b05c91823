//! # Sale Engine
//!
//! Orchestrates POS tickets and invoices: numbering, items, stock,
//! discount, payment, status and customer propagation.
//!
//! ## Anatomy of a mutation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  add_item(doc, product, qty)                                            │
//! │                                                                         │
//! │  1. DocumentLocks::acquire(doc)        one writer per document         │
//! │  2. BEGIN                                                               │
//! │  3. touch(doc)                         write first: takes SQLite's     │
//! │                                        write lock, NotFound check      │
//! │  4. load rows, ask shopdesk-core       pure rules decide               │
//! │  5. reserve stock / insert item        conditional decrement           │
//! │  6. full recompute → store_totals                                      │
//! │  7. propagator::propagate              customer aggregates             │
//! │  8. COMMIT                             or drop = ROLLBACK on any error │
//! │  9. release lock                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every failure returns before COMMIT, so a rejected operation leaves no
//! trace: status, totals, stock and customer balances are as they were.

pub mod locks;
mod propagator;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, warn};
use uuid::Uuid;

use shopdesk_core::document::{
    can_make_payment, check_discount, check_payment, checked_subtotal, ensure_payable, line_amount,
    parse_discount, plan_status_change, Totals, Transition,
};
use shopdesk_core::validation::{
    normalize_contact_number, validate_customer_name, validate_email, validate_quantity,
};
use shopdesk_core::{
    CoreError, Customer, CustomerRef, Document, DocumentDetail, DocumentKind, DocumentStatus,
    DocumentTotals, Item, Money, NewDocument, ValidationError,
};

use crate::error::{DbError, SaleError, SaleResult};
use crate::repository::{customer, document, product, sequence};
use locks::DocumentLocks;

/// The sale-transaction engine.
///
/// Obtain one from [`crate::Database::engine`]; clones share the lock table.
#[derive(Debug, Clone)]
pub struct SaleEngine {
    pool: SqlitePool,
    locks: Arc<DocumentLocks>,
}

impl SaleEngine {
    pub fn new(pool: SqlitePool, locks: Arc<DocumentLocks>) -> Self {
        SaleEngine { pool, locks }
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Opens a new, empty, unpaid document and stamps its number.
    ///
    /// ## Customer handling
    /// ```text
    /// POS     + WalkIn     → free-text name/phone/email
    /// POS     + Registered → copies the customer's name/phone/email
    /// Invoice + Registered → references the customer (required)
    /// Invoice + WalkIn     → rejected
    /// ```
    pub async fn create_document(&self, new: NewDocument) -> SaleResult<Document> {
        let kind = new.kind;
        let result = self.create_document_inner(new).await;
        report("create_document", kind.as_str(), result)
    }

    async fn create_document_inner(&self, new: NewDocument) -> SaleResult<Document> {
        let date = new.date.unwrap_or_else(|| Utc::now().date_naive());
        if let Some(due) = new.due_date {
            if new.kind != DocumentKind::Invoice {
                return Err(ValidationError::InvalidFormat {
                    field: "due_date".to_string(),
                    reason: "only invoices have a due date".to_string(),
                }
                .into());
            }
            if due < date {
                return Err(ValidationError::InvalidFormat {
                    field: "due_date".to_string(),
                    reason: "cannot be before the document date".to_string(),
                }
                .into());
            }
        }

        let walk_in = match (&new.kind, &new.customer) {
            (
                DocumentKind::Pos,
                CustomerRef::WalkIn {
                    name,
                    contact_number,
                    email,
                },
            ) => {
                validate_customer_name(name)?;
                let phone = normalize_contact_number(contact_number.as_deref())?;
                let email = email
                    .as_deref()
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .map(|e| validate_email(e).map(|_| e.to_string()))
                    .transpose()?;
                Some((name.trim().to_string(), phone, email))
            }
            (DocumentKind::Invoice, CustomerRef::WalkIn { .. }) => {
                return Err(ValidationError::Required {
                    field: "customer_id".to_string(),
                }
                .into());
            }
            (_, CustomerRef::Registered { .. }) => None,
        };

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        // First statement is the counter write.
        let number = sequence::next_number(&mut *tx, new.kind).await?;

        let (customer_id, customer_name, contact_number, email) = match (walk_in, &new.customer) {
            (Some((name, phone, email)), _) => {
                if let Some(phone) = phone.as_deref() {
                    if let Some(owner) = customer::fetch_by_phone(&mut *tx, phone).await? {
                        if !same_name(&owner.name, &name) {
                            return Err(ValidationError::PhoneOwnedByOther {
                                phone: phone.to_string(),
                                existing_name: owner.name,
                            }
                            .into());
                        }
                    }
                }
                (None, name, phone, email)
            }
            (None, CustomerRef::Registered { customer_id }) => {
                let registered: Customer = customer::fetch(&mut *tx, customer_id)
                    .await?
                    .ok_or_else(|| CoreError::not_found("Customer", customer_id.as_str()))?;
                let reference = match new.kind {
                    DocumentKind::Invoice => Some(registered.id.clone()),
                    DocumentKind::Pos => None,
                };
                (
                    reference,
                    registered.name,
                    Some(registered.phone),
                    registered.email,
                )
            }
            (None, CustomerRef::WalkIn { .. }) => {
                return Err(ValidationError::Required {
                    field: "customer_id".to_string(),
                }
                .into());
            }
        };

        let now = Utc::now();
        let doc = Document {
            id: Uuid::new_v4().to_string(),
            kind: new.kind,
            number: number.to_string(),
            sequence: number.sequence,
            status: DocumentStatus::Unpaid,
            customer_id,
            customer_name,
            contact_number,
            email,
            subtotal_cents: 0,
            discount_cents: 0,
            total_cents: 0,
            date,
            due_date: new.due_date,
            created_at: now,
            updated_at: now,
            paid_at: None,
        };

        document::insert(&mut *tx, &doc).await.map_err(|e| {
            if e.is_unique_violation_on("documents.") {
                SaleError::from(CoreError::Conflict {
                    what: doc.number.clone(),
                })
            } else {
                SaleError::from(e)
            }
        })?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            id = %doc.id,
            number = %doc.number,
            kind = %doc.kind,
            customer = %doc.customer_name,
            "Document created"
        );
        Ok(doc)
    }

    // =========================================================================
    // Items
    // =========================================================================

    /// Adds a line and reserves its stock.
    ///
    /// `unit_price` defaults to the product's current selling price. Fails
    /// with `InsufficientStock` when `quantity` exceeds what is on hand.
    pub async fn add_item(
        &self,
        document_id: &str,
        product_id: &str,
        quantity: i64,
        unit_price: Option<Money>,
    ) -> SaleResult<Item> {
        let _guard = self.locks.acquire(document_id).await;
        let result = self
            .add_item_locked(document_id, product_id, quantity, unit_price)
            .await;
        report("add_item", document_id, result)
    }

    async fn add_item_locked(
        &self,
        document_id: &str,
        product_id: &str,
        quantity: i64,
        unit_price: Option<Money>,
    ) -> SaleResult<Item> {
        validate_quantity(quantity)?;

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;
        document::touch(&mut *tx, document_id).await?;
        let doc = document::load(&mut *tx, document_id).await?;

        let stocked = product::fetch(&mut *tx, product_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Product", product_id))?;
        let price = unit_price.unwrap_or_else(|| stocked.unit_price());
        let amount = line_amount(quantity, price)?;

        product::reserve(&mut *tx, &stocked, quantity).await?;

        let item = Item {
            id: Uuid::new_v4().to_string(),
            document_id: doc.id.clone(),
            product_id: stocked.id.clone(),
            position: document::next_position(&mut *tx, &doc.id).await?,
            name_snapshot: stocked.name.clone(),
            quantity,
            unit_price_cents: price.cents(),
            amount_cents: amount.cents(),
            created_at: Utc::now(),
        };
        document::insert_item(&mut *tx, &item).await?;

        let totals = recompute_totals(&mut *tx, &doc).await?;
        propagator::propagate(&mut *tx, &doc).await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            document = %doc.number,
            product = %stocked.name,
            quantity,
            amount = %amount,
            subtotal = %totals.subtotal,
            "Item added"
        );
        Ok(item)
    }

    /// Removes a line and returns its stock.
    ///
    /// Unknown item ids are a no-op. If the new subtotal falls below the
    /// discount, the discount is clamped to the subtotal.
    pub async fn remove_item(&self, document_id: &str, item_id: &str) -> SaleResult<()> {
        let _guard = self.locks.acquire(document_id).await;
        let result = self.remove_item_locked(document_id, item_id).await;
        report("remove_item", document_id, result)
    }

    async fn remove_item_locked(&self, document_id: &str, item_id: &str) -> SaleResult<()> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;
        document::touch(&mut *tx, document_id).await?;
        let doc = document::load(&mut *tx, document_id).await?;

        let Some(item) = document::fetch_item(&mut *tx, &doc.id, item_id).await? else {
            // Dropping the transaction rolls back the touch.
            return Ok(());
        };

        document::delete_item(&mut *tx, &item.id).await?;
        product::restore(&mut *tx, &item.product_id, item.quantity).await?;

        let totals = recompute_totals(&mut *tx, &doc).await?;
        propagator::propagate(&mut *tx, &doc).await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            document = %doc.number,
            item = %item.name_snapshot,
            quantity = item.quantity,
            subtotal = %totals.subtotal,
            "Item removed"
        );
        Ok(())
    }

    // =========================================================================
    // Discount
    // =========================================================================

    /// Sets the discount of a POS ticket.
    ///
    /// Succeeds iff `0 ≤ discount ≤ subtotal`; afterwards
    /// `total == subtotal - discount`.
    pub async fn update_discount(&self, document_id: &str, discount: Money) -> SaleResult<Document> {
        let _guard = self.locks.acquire(document_id).await;
        let result = self.update_discount_locked(document_id, discount).await;
        report("update_discount", document_id, result)
    }

    /// [`update_discount`](Self::update_discount) from form text (`"3.00"`).
    pub async fn update_discount_text(&self, document_id: &str, input: &str) -> SaleResult<Document> {
        let discount = match parse_discount(input) {
            Ok(discount) => discount,
            Err(e) => return report("update_discount", document_id, Err(e.into())),
        };
        self.update_discount(document_id, discount).await
    }

    async fn update_discount_locked(&self, document_id: &str, discount: Money) -> SaleResult<Document> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;
        document::touch(&mut *tx, document_id).await?;
        let doc = document::load(&mut *tx, document_id).await?;

        let items = document::fetch_items(&mut *tx, &doc.id).await?;
        let subtotal = checked_subtotal(items.iter().map(Item::amount))?;
        check_discount(doc.kind, discount, subtotal)?;
        let totals = Totals::recompute([subtotal], discount)?;

        document::store_totals(&mut *tx, &doc.id, &totals).await?;
        propagator::propagate(&mut *tx, &doc).await?;
        let updated = document::load(&mut *tx, &doc.id).await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            document = %updated.number,
            discount = %totals.discount,
            total = %totals.total,
            "Discount updated"
        );
        Ok(updated)
    }

    // =========================================================================
    // Payment & Status
    // =========================================================================

    /// Marks the document paid.
    ///
    /// ## Guard
    /// 1. at least one item, else `EmptySale`
    /// 2. total > 0, else `ZeroTotal`
    /// 3. full document validation, else `ValidationFailed`
    ///
    /// On success the customer's aggregates are recomputed in the same
    /// transaction.
    pub async fn make_payment(&self, document_id: &str) -> SaleResult<Document> {
        let _guard = self.locks.acquire(document_id).await;
        let result = self.make_payment_locked(document_id).await;
        report("make_payment", document_id, result)
    }

    async fn make_payment_locked(&self, document_id: &str) -> SaleResult<Document> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;
        document::touch(&mut *tx, document_id).await?;
        let doc = document::load(&mut *tx, document_id).await?;
        ensure_payable(&doc)?;

        let paid = pay(&mut *tx, &doc).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(document = %paid.number, total = %paid.total(), "Payment recorded");
        Ok(paid)
    }

    /// Sets the status label.
    ///
    /// `paid` goes through the same guard as [`make_payment`](Self::make_payment)
    /// (and is a no-op when already paid); `overdue` is only valid for
    /// invoices; other changes are unconstrained.
    pub async fn set_status(&self, document_id: &str, status: DocumentStatus) -> SaleResult<Document> {
        let _guard = self.locks.acquire(document_id).await;
        let result = self.set_status_locked(document_id, status).await;
        report("set_status", document_id, result)
    }

    async fn set_status_locked(&self, document_id: &str, status: DocumentStatus) -> SaleResult<Document> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;
        document::touch(&mut *tx, document_id).await?;
        let doc = document::load(&mut *tx, document_id).await?;
        let previous = doc.status;

        let updated = match plan_status_change(&doc, status)? {
            Transition::Unchanged => doc,
            Transition::Pay => pay(&mut *tx, &doc).await?,
            Transition::Relabel(next) => {
                document::store_status(&mut *tx, &doc.id, next, None).await?;
                propagator::propagate(&mut *tx, &doc).await?;
                document::load(&mut *tx, &doc.id).await?
            }
        };

        tx.commit().await.map_err(DbError::from)?;

        info!(
            document = %updated.number,
            from = %previous,
            to = %updated.status,
            "Status updated"
        );
        Ok(updated)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Totals read model.
    pub async fn get_totals(&self, document_id: &str) -> SaleResult<DocumentTotals> {
        let detail = self.get_document(document_id).await?;
        Ok(detail.totals)
    }

    /// Document, items and totals from one consistent snapshot.
    pub async fn get_document(&self, document_id: &str) -> SaleResult<DocumentDetail> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;
        let doc = document::load(&mut *tx, document_id).await?;
        let items = document::fetch_items(&mut *tx, document_id).await?;
        tx.commit().await.map_err(DbError::from)?;

        Ok(DocumentDetail {
            totals: DocumentTotals::of(&doc, items.len()),
            can_make_payment: can_make_payment(&doc, items.len()),
            document: doc,
            items,
        })
    }

    // =========================================================================
    // Delete & Reconcile
    // =========================================================================

    /// Deletes a document and its items.
    ///
    /// Stock reserved by an unpaid document goes back on the shelf; a paid
    /// document's stock stays sold. The customer is recomputed without it.
    pub async fn delete_document(&self, document_id: &str) -> SaleResult<()> {
        let _guard = self.locks.acquire(document_id).await;
        let result = self.delete_document_locked(document_id).await;
        report("delete_document", document_id, result)
    }

    async fn delete_document_locked(&self, document_id: &str) -> SaleResult<()> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;
        document::touch(&mut *tx, document_id).await?;
        let doc = document::load(&mut *tx, document_id).await?;
        let items = document::fetch_items(&mut *tx, &doc.id).await?;

        if !doc.is_paid() {
            for item in &items {
                product::restore(&mut *tx, &item.product_id, item.quantity).await?;
            }
        }

        let owner = propagator::owner_of(&mut *tx, &doc).await?;
        document::delete(&mut *tx, &doc.id).await?;
        if let Some(owner) = owner {
            propagator::recompute(&mut *tx, &owner).await?;
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(
            document = %doc.number,
            items = items.len(),
            restocked = !doc.is_paid(),
            "Document deleted"
        );
        Ok(())
    }

    /// Recomputes a customer's aggregates from their documents.
    pub async fn reconcile_customer(&self, customer_id: &str) -> SaleResult<Customer> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;
        let customer = propagator::reconcile(&mut *tx, customer_id).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(
            customer_id = %customer.id,
            total_purchases = %customer.total_purchases(),
            outstanding = %customer.outstanding_balance(),
            "Customer reconciled"
        );
        Ok(customer)
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Runs the payment guard and flips the status; caller commits.
async fn pay(conn: &mut SqliteConnection, doc: &Document) -> SaleResult<Document> {
    let items = document::fetch_items(conn, &doc.id).await?;
    check_payment(doc, &items)?;

    document::store_status(conn, &doc.id, DocumentStatus::Paid, Some(Utc::now())).await?;
    propagator::propagate(conn, doc).await?;

    Ok(document::load(conn, &doc.id).await?)
}

/// Full re-sum of the items, clamping the discount if it no longer fits.
async fn recompute_totals(conn: &mut SqliteConnection, doc: &Document) -> SaleResult<Totals> {
    let items = document::fetch_items(conn, &doc.id).await?;
    let (totals, clamped) =
        Totals::recompute_clamped(items.iter().map(Item::amount), doc.discount())?;
    if clamped {
        warn!(
            document = %doc.number,
            discount = %doc.discount(),
            subtotal = %totals.subtotal,
            "Discount clamped to new subtotal"
        );
    }
    document::store_totals(conn, &doc.id, &totals).await?;
    Ok(totals)
}

fn same_name(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Logs rejected operations.
fn report<T>(op: &'static str, subject: &str, result: SaleResult<T>) -> SaleResult<T> {
    if let Err(e) = &result {
        warn!(op, subject, kind = ?e.kind(), error = %e, "Operation rejected");
    }
    result
}
