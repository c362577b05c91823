use std::collections::HashSet;

use chrono::{Duration, Utc};
use shopdesk_core::{
    CoreError, Customer, CustomerRef, DocumentKind, DocumentStatus, ErrorKind, Money, NewDocument,
    Product, ValidationError,
};

use crate::error::SaleError;
use crate::pool::{Database, DbConfig};

async fn setup() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

async fn stock(db: &Database, name: &str, price: i64, quantity: i64) -> Product {
    db.products()
        .insert(&Product::new(name, Money::from_cents(price), quantity))
        .await
        .unwrap()
}

async fn register(db: &Database, name: &str, phone: &str) -> Customer {
    db.customers()
        .insert(&Customer::new(name, phone))
        .await
        .unwrap()
}

async fn reload(db: &Database, customer: &Customer) -> Customer {
    db.customers().get_by_id(&customer.id).await.unwrap().unwrap()
}

fn walk_in(name: &str, phone: &str) -> NewDocument {
    NewDocument::pos(name, Some(phone.to_string()))
}

// =============================================================================
// End-to-end scenarios
// =============================================================================

#[tokio::test]
async fn test_pos_sale_counts_towards_customer() {
    let db = setup().await;
    let engine = db.engine();
    let p = stock(&db, "P", 1000, 1).await;
    let ayesha = register(&db, "Ayesha Khan", "03001234567").await;

    let doc = engine
        .create_document(walk_in("Ayesha Khan", "03001234567"))
        .await
        .unwrap();

    let err = engine.add_item(&doc.id, &p.id, 2, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientStock);
    assert_eq!(
        err.to_string(),
        "Insufficient stock for P. Only 1 units available."
    );

    db.products().adjust(&p.id, 4).await.unwrap();
    engine.add_item(&doc.id, &p.id, 2, None).await.unwrap();

    let totals = engine.get_totals(&doc.id).await.unwrap();
    assert_eq!(totals.subtotal, Money::from_cents(2000));
    assert_eq!(totals.item_count, 1);
    assert_eq!(db.products().available(&p.id).await.unwrap(), 3);

    // Unpaid documents are owed, not purchased.
    let before = reload(&db, &ayesha).await;
    assert_eq!(before.outstanding_balance_cents, 2000);
    assert_eq!(before.total_purchases_cents, 0);

    let paid = engine.set_status(&doc.id, DocumentStatus::Paid).await.unwrap();
    assert_eq!(paid.status, DocumentStatus::Paid);
    assert!(paid.paid_at.is_some());

    let after = reload(&db, &ayesha).await;
    assert_eq!(after.total_purchases_cents, 2000);
    assert_eq!(after.outstanding_balance_cents, 0);
    assert_eq!(after.last_purchase, Some(paid.date));
}

#[tokio::test]
async fn test_empty_sale_cannot_be_paid() {
    let db = setup().await;
    let engine = db.engine();
    let doc = engine
        .create_document(NewDocument::pos("Walk-in", None))
        .await
        .unwrap();

    let err = engine
        .set_status(&doc.id, DocumentStatus::Paid)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmptySale);
    assert!(err.to_string().contains("empty sale"));

    let err = engine.make_payment(&doc.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmptySale);

    let detail = engine.get_document(&doc.id).await.unwrap();
    assert_eq!(detail.document.status, DocumentStatus::Unpaid);
    assert!(detail.document.paid_at.is_none());
    assert!(!detail.can_make_payment);
}

#[tokio::test]
async fn test_discount_bounded_by_subtotal() {
    let db = setup().await;
    let engine = db.engine();
    let soap = stock(&db, "Soap", 200, 10).await;
    let doc = engine
        .create_document(NewDocument::pos("Walk-in", None))
        .await
        .unwrap();
    engine.add_item(&doc.id, &soap.id, 5, None).await.unwrap();

    let err = engine
        .update_discount(&doc.id, Money::from_cents(1200))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidDiscount);
    assert!(matches!(
        err,
        SaleError::Core(CoreError::DiscountExceedsSubtotal { .. })
    ));
    let totals = engine.get_totals(&doc.id).await.unwrap();
    assert_eq!(totals.discount, Money::zero());
    assert_eq!(totals.total, Money::from_cents(1000));

    let updated = engine.update_discount_text(&doc.id, "3.00").await.unwrap();
    assert_eq!(updated.total(), Money::from_cents(700));
    assert_eq!(updated.discount(), Money::from_cents(300));

    let err = engine
        .update_discount(&doc.id, Money::from_cents(-1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidDiscount);

    let err = engine
        .update_discount_text(&doc.id, "abc")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidDiscount);

    // Blank clears it.
    let cleared = engine.update_discount_text(&doc.id, "  ").await.unwrap();
    assert_eq!(cleared.total(), Money::from_cents(1000));
}

#[tokio::test]
async fn test_extreme_discounts_are_rejected() {
    let db = setup().await;
    let engine = db.engine();
    let tea = stock(&db, "Tea", 450, 10).await;
    let doc = engine
        .create_document(NewDocument::pos("Walk-in", None))
        .await
        .unwrap();
    engine.add_item(&doc.id, &tea.id, 2, None).await.unwrap();

    for cents in [i64::MIN, i64::MIN + 1, i64::MAX] {
        let err = engine
            .update_discount(&doc.id, Money::from_cents(cents))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDiscount);
    }

    let totals = engine.get_totals(&doc.id).await.unwrap();
    assert_eq!(totals.discount, Money::zero());
    assert_eq!(totals.total, Money::from_cents(900));
}

// =============================================================================
// Items
// =============================================================================

#[tokio::test]
async fn test_totals_follow_items() {
    let db = setup().await;
    let engine = db.engine();
    let tea = stock(&db, "Tea", 450, 20).await;
    let sugar = stock(&db, "Sugar", 1450, 20).await;
    let doc = engine
        .create_document(NewDocument::pos("Walk-in", None))
        .await
        .unwrap();

    let first = engine.add_item(&doc.id, &tea.id, 2, None).await.unwrap();
    let second = engine
        .add_item(&doc.id, &sugar.id, 1, Some(Money::from_cents(1000)))
        .await
        .unwrap();
    assert_eq!(first.position, 1);
    assert_eq!(second.position, 2);
    assert_eq!(second.amount(), Money::from_cents(1000));
    assert_eq!(second.name_snapshot, "Sugar");

    assert_eq!(
        engine.get_totals(&doc.id).await.unwrap().subtotal,
        Money::from_cents(1900)
    );

    engine.remove_item(&doc.id, &first.id).await.unwrap();
    let detail = engine.get_document(&doc.id).await.unwrap();
    assert_eq!(detail.totals.subtotal, Money::from_cents(1000));
    assert_eq!(detail.totals.item_count, 1);
    assert_eq!(detail.items[0].id, second.id);
    assert_eq!(db.products().available(&tea.id).await.unwrap(), 20);
    assert_eq!(db.products().available(&sugar.id).await.unwrap(), 19);
}

#[tokio::test]
async fn test_remove_item_is_idempotent() {
    let db = setup().await;
    let engine = db.engine();
    let milk = stock(&db, "Milk", 220, 4).await;
    let doc = engine
        .create_document(NewDocument::pos("Walk-in", None))
        .await
        .unwrap();
    let item = engine.add_item(&doc.id, &milk.id, 3, None).await.unwrap();

    engine.remove_item(&doc.id, &item.id).await.unwrap();
    engine.remove_item(&doc.id, &item.id).await.unwrap();
    engine.remove_item(&doc.id, "no-such-item").await.unwrap();

    // Stock comes back exactly once.
    assert_eq!(db.products().available(&milk.id).await.unwrap(), 4);
    assert_eq!(
        engine.get_totals(&doc.id).await.unwrap().subtotal,
        Money::zero()
    );
}

#[tokio::test]
async fn test_remove_item_clamps_discount() {
    let db = setup().await;
    let engine = db.engine();
    let rice = stock(&db, "Rice", 1000, 5).await;
    let salt = stock(&db, "Salt", 100, 5).await;
    let doc = engine
        .create_document(NewDocument::pos("Walk-in", None))
        .await
        .unwrap();
    let big = engine.add_item(&doc.id, &rice.id, 1, None).await.unwrap();
    engine.add_item(&doc.id, &salt.id, 1, None).await.unwrap();
    engine
        .update_discount(&doc.id, Money::from_cents(500))
        .await
        .unwrap();

    engine.remove_item(&doc.id, &big.id).await.unwrap();

    let totals = engine.get_totals(&doc.id).await.unwrap();
    assert_eq!(totals.subtotal, Money::from_cents(100));
    assert_eq!(totals.discount, Money::from_cents(100));
    assert_eq!(totals.total, Money::zero());

    let err = engine.make_payment(&doc.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ZeroTotal);
}

#[tokio::test]
async fn test_add_item_rejections_leave_no_trace() {
    let db = setup().await;
    let engine = db.engine();
    let flour = stock(&db, "Flour", 1800, 0).await;
    let doc = engine
        .create_document(NewDocument::pos("Walk-in", None))
        .await
        .unwrap();

    let err = engine.add_item(&doc.id, &flour.id, 1, None).await.unwrap_err();
    assert_eq!(err.to_string(), "Stock unavailable for Flour.");

    let err = engine.add_item(&doc.id, &flour.id, 0, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let err = engine.add_item(&doc.id, "missing", 1, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = engine.add_item("missing", &flour.id, 1, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let detail = engine.get_document(&doc.id).await.unwrap();
    assert!(detail.items.is_empty());
    assert_eq!(detail.totals.subtotal, Money::zero());
    assert_eq!(db.products().available(&flour.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_subtotal_overflow_is_rejected() {
    let db = setup().await;
    let engine = db.engine();
    let gold = stock(&db, "Gold Bar", 100, 10).await;
    let doc = engine
        .create_document(NewDocument::pos("Walk-in", None))
        .await
        .unwrap();
    let huge = Money::from_cents(i64::MAX / 2 + 1);

    engine.add_item(&doc.id, &gold.id, 1, Some(huge)).await.unwrap();
    let err = engine
        .add_item(&doc.id, &gold.id, 1, Some(huge))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidDiscount);
    assert!(matches!(
        err,
        SaleError::Core(CoreError::InvalidAmount { .. })
    ));

    // The second line, its stock and its totals were rolled back.
    let detail = engine.get_document(&doc.id).await.unwrap();
    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.totals.subtotal, huge);
    assert_eq!(db.products().available(&gold.id).await.unwrap(), 9);
}

// =============================================================================
// Stock under concurrency
// =============================================================================

#[tokio::test]
async fn test_two_documents_compete_for_stock() {
    let db = setup().await;
    let engine = db.engine();
    let oil = stock(&db, "Cooking Oil", 5200, 3).await;
    let a = engine
        .create_document(NewDocument::pos("A", None))
        .await
        .unwrap();
    let b = engine
        .create_document(NewDocument::pos("B", None))
        .await
        .unwrap();

    engine.add_item(&a.id, &oil.id, 2, None).await.unwrap();
    let err = engine.add_item(&b.id, &oil.id, 2, None).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Insufficient stock for Cooking Oil. Only 1 units available."
    );
    assert_eq!(db.products().available(&oil.id).await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_reservations_never_oversell() {
    let db = setup().await;
    let engine = db.engine();
    let biscuits = stock(&db, "Biscuits", 600, 5).await;

    let mut handles = Vec::new();
    for n in 0..10 {
        let engine = engine.clone();
        let product_id = biscuits.id.clone();
        handles.push(tokio::spawn(async move {
            let doc = engine
                .create_document(NewDocument::pos(format!("Buyer {}", n), None))
                .await
                .unwrap();
            engine.add_item(&doc.id, &product_id, 1, None).await.is_ok()
        }));
    }

    let mut sold = 0;
    for handle in handles {
        if handle.await.unwrap() {
            sold += 1;
        }
    }

    assert_eq!(sold, 5);
    assert_eq!(db.products().available(&biscuits.id).await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_adds_to_one_document() {
    let db = setup().await;
    let engine = db.engine();
    let soap = stock(&db, "Soap", 95, 50).await;
    let doc = engine
        .create_document(NewDocument::pos("Walk-in", None))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = engine.clone();
        let doc_id = doc.id.clone();
        let product_id = soap.id.clone();
        handles.push(tokio::spawn(async move {
            engine.add_item(&doc_id, &product_id, 2, None).await.unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let detail = engine.get_document(&doc.id).await.unwrap();
    assert_eq!(detail.items.len(), 8);
    assert_eq!(detail.totals.subtotal, Money::from_cents(95 * 16));
    let positions: HashSet<i64> = detail.items.iter().map(|i| i.position).collect();
    assert_eq!(positions.len(), 8);
    assert_eq!(db.products().available(&soap.id).await.unwrap(), 34);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_file_database_with_many_connections() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(DbConfig::new(dir.path().join("shop.db")).max_connections(8))
        .await
        .unwrap();
    let engine = db.engine();
    let kettles = stock(&db, "Kettle", 3500, 5).await;

    let mut handles = Vec::new();
    for n in 0..30 {
        let engine = engine.clone();
        let product_id = kettles.id.clone();
        handles.push(tokio::spawn(async move {
            let doc = engine
                .create_document(NewDocument::pos(format!("Buyer {}", n), None))
                .await
                .unwrap();
            let added = engine.add_item(&doc.id, &product_id, 1, None).await;
            (doc.number, added.map_err(|e| e.kind()))
        }));
    }

    let mut numbers = HashSet::new();
    let mut sold = 0;
    let mut short = 0;
    for handle in handles {
        let (number, added) = handle.await.unwrap();
        numbers.insert(number);
        match added {
            Ok(_) => sold += 1,
            Err(ErrorKind::InsufficientStock) => short += 1,
            Err(other) => panic!("unexpected rejection: {:?}", other),
        }
    }

    assert_eq!(numbers.len(), 30);
    assert_eq!(sold, 5);
    assert_eq!(short, 25);
    assert_eq!(db.products().available(&kettles.id).await.unwrap(), 0);

    db.close().await;
}

#[tokio::test]
async fn test_lock_table_drains() {
    let db = setup().await;
    let engine = db.engine();
    let bread = stock(&db, "Bread", 150, 100).await;

    for n in 0..100 {
        let err = engine
            .remove_item(&format!("missing-{}", n), "no-such-item")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
    for _ in 0..50 {
        let doc = engine
            .create_document(NewDocument::pos("Walk-in", None))
            .await
            .unwrap();
        engine.add_item(&doc.id, &bread.id, 1, None).await.unwrap();
        engine.make_payment(&doc.id).await.unwrap();
    }
    let doc = engine
        .create_document(NewDocument::pos("Walk-in", None))
        .await
        .unwrap();
    engine.delete_document(&doc.id).await.unwrap();

    assert!(engine.locks.is_empty());
}

// =============================================================================
// Numbering
// =============================================================================

#[tokio::test]
async fn test_numbers_are_per_kind() {
    let db = setup().await;
    let engine = db.engine();
    let customer = register(&db, "Usman Ali", "03111234567").await;

    let first = engine
        .create_document(NewDocument::pos("Walk-in", None))
        .await
        .unwrap();
    let invoice = engine
        .create_document(NewDocument::invoice(customer.id.clone()))
        .await
        .unwrap();
    let second = engine
        .create_document(NewDocument::pos("Walk-in", None))
        .await
        .unwrap();

    assert_eq!(first.number, "POS-001");
    assert_eq!(second.number, "POS-002");
    assert_eq!(invoice.number, "INV-001");
    assert_eq!(
        db.documents()
            .get_by_number("POS-002")
            .await
            .unwrap()
            .map(|d| d.id),
        Some(second.id)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_creators_get_distinct_numbers() {
    let db = setup().await;
    let engine = db.engine();

    let mut handles = Vec::new();
    for _ in 0..20 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .create_document(NewDocument::pos("Walk-in", None))
                .await
                .unwrap()
                .number
        }));
    }

    let mut numbers = HashSet::new();
    for handle in handles {
        numbers.insert(handle.await.unwrap());
    }

    let expected: HashSet<String> = (1..=20).map(|n| format!("POS-{:03}", n)).collect();
    assert_eq!(numbers, expected);
    assert_eq!(db.documents().count(DocumentKind::Pos).await.unwrap(), 20);
}

#[tokio::test]
async fn test_rejected_create_does_not_consume_a_number() {
    let db = setup().await;
    let engine = db.engine();
    register(&db, "Ayesha Khan", "03001234567").await;

    let err = engine
        .create_document(walk_in("Bilal Ahmed", "03001234567"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SaleError::Core(CoreError::Validation(ValidationError::PhoneOwnedByOther { .. }))
    ));
    assert!(err.to_string().contains("Ayesha Khan"));

    // Case-insensitive match on the owner's name is accepted.
    let doc = engine
        .create_document(walk_in("ayesha khan", "03001234567"))
        .await
        .unwrap();
    assert_eq!(doc.number, "POS-001");
}

// =============================================================================
// Customers
// =============================================================================

#[tokio::test]
async fn test_walk_in_contact_is_validated() {
    let db = setup().await;
    let engine = db.engine();

    let err = engine
        .create_document(walk_in("Walk-in", "12345"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let err = engine
        .create_document(NewDocument::pos("   ", None))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    // Unknown phones are fine: the customer is simply not registered.
    let doc = engine
        .create_document(walk_in("Walk-in", "03009999999"))
        .await
        .unwrap();
    assert_eq!(doc.contact_number.as_deref(), Some("03009999999"));
}

#[tokio::test]
async fn test_pos_for_registered_customer_copies_contact() {
    let db = setup().await;
    let engine = db.engine();
    let tea = stock(&db, "Tea", 2100, 10).await;
    let hira = register(&db, "Hira Shah", "03211234567").await;

    let doc = engine
        .create_document(NewDocument {
            kind: DocumentKind::Pos,
            customer: CustomerRef::Registered {
                customer_id: hira.id.clone(),
            },
            date: None,
            due_date: None,
        })
        .await
        .unwrap();
    assert_eq!(doc.customer_id, None);
    assert_eq!(doc.customer_name, "Hira Shah");
    assert_eq!(doc.contact_number.as_deref(), Some("03211234567"));

    engine.add_item(&doc.id, &tea.id, 1, None).await.unwrap();
    engine.make_payment(&doc.id).await.unwrap();
    assert_eq!(reload(&db, &hira).await.total_purchases_cents, 2100);
}

#[tokio::test]
async fn test_reconcile_repairs_drift() {
    let db = setup().await;
    let engine = db.engine();
    let rice = stock(&db, "Rice", 3200, 10).await;
    let omar = register(&db, "Omar Farooq", "03331234567").await;

    let doc = engine
        .create_document(walk_in("Omar Farooq", "03331234567"))
        .await
        .unwrap();
    engine.add_item(&doc.id, &rice.id, 1, None).await.unwrap();
    engine.make_payment(&doc.id).await.unwrap();

    sqlx::query(
        "UPDATE customers SET total_purchases_cents = 1, outstanding_balance_cents = 99 WHERE id = ?1",
    )
    .bind(&omar.id)
    .execute(db.pool())
    .await
    .unwrap();

    let fixed = engine.reconcile_customer(&omar.id).await.unwrap();
    assert_eq!(fixed.total_purchases_cents, 3200);
    assert_eq!(fixed.outstanding_balance_cents, 0);
    assert_eq!(reload(&db, &omar).await.total_purchases_cents, 3200);

    let err = engine.reconcile_customer("missing").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// =============================================================================
// Invoices & status
// =============================================================================

#[tokio::test]
async fn test_invoice_lifecycle() {
    let db = setup().await;
    let engine = db.engine();
    let oil = stock(&db, "Cooking Oil", 5200, 10).await;
    let kamran = register(&db, "Kamran Javed", "03451234567").await;

    let today = Utc::now().date_naive();
    let invoice = engine
        .create_document(NewDocument {
            due_date: Some(today + Duration::days(30)),
            ..NewDocument::invoice(kamran.id.clone())
        })
        .await
        .unwrap();
    assert_eq!(invoice.customer_id.as_deref(), Some(kamran.id.as_str()));

    engine.add_item(&invoice.id, &oil.id, 2, None).await.unwrap();
    assert_eq!(reload(&db, &kamran).await.outstanding_balance_cents, 10400);

    let overdue = engine
        .set_status(&invoice.id, DocumentStatus::Overdue)
        .await
        .unwrap();
    assert_eq!(overdue.status, DocumentStatus::Overdue);
    assert_eq!(reload(&db, &kamran).await.outstanding_balance_cents, 10400);

    let paid = engine.make_payment(&invoice.id).await.unwrap();
    assert_eq!(paid.status, DocumentStatus::Paid);

    let settled = reload(&db, &kamran).await;
    assert_eq!(settled.outstanding_balance_cents, 0);
    assert_eq!(settled.total_purchases_cents, 10400);

    let err = engine.make_payment(&invoice.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidStatus);

    // Re-labelling as paid is a no-op.
    let again = engine
        .set_status(&invoice.id, DocumentStatus::Paid)
        .await
        .unwrap();
    assert_eq!(again.paid_at, paid.paid_at);
}

#[tokio::test]
async fn test_invoice_rules() {
    let db = setup().await;
    let engine = db.engine();
    let salt = stock(&db, "Salt", 100, 10).await;
    let nadia = register(&db, "Nadia Iqbal", "03011234567").await;

    let err = engine
        .create_document(NewDocument {
            kind: DocumentKind::Invoice,
            ..NewDocument::pos("Walk-in", None)
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let err = engine
        .create_document(NewDocument::invoice("missing"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let today = Utc::now().date_naive();
    let err = engine
        .create_document(NewDocument {
            date: Some(today),
            due_date: Some(today - Duration::days(1)),
            ..NewDocument::invoice(nadia.id.clone())
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let invoice = engine
        .create_document(NewDocument::invoice(nadia.id.clone()))
        .await
        .unwrap();
    engine.add_item(&invoice.id, &salt.id, 3, None).await.unwrap();

    let err = engine
        .update_discount(&invoice.id, Money::from_cents(100))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidDiscount);
    engine
        .update_discount(&invoice.id, Money::zero())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_pos_cannot_be_overdue() {
    let db = setup().await;
    let engine = db.engine();
    let doc = engine
        .create_document(NewDocument::pos("Walk-in", None))
        .await
        .unwrap();

    let err = engine
        .set_status(&doc.id, DocumentStatus::Overdue)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidStatus);

    let err = engine
        .create_document(NewDocument {
            due_date: Some(Utc::now().date_naive()),
            ..NewDocument::pos("Walk-in", None)
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[tokio::test]
async fn test_paid_back_to_unpaid_moves_balance() {
    let db = setup().await;
    let engine = db.engine();
    let tea = stock(&db, "Tea", 500, 10).await;
    let zainab = register(&db, "Zainab Raza", "03121234567").await;

    let doc = engine
        .create_document(walk_in("Zainab Raza", "03121234567"))
        .await
        .unwrap();
    engine.add_item(&doc.id, &tea.id, 2, None).await.unwrap();
    engine.make_payment(&doc.id).await.unwrap();

    let reopened = engine
        .set_status(&doc.id, DocumentStatus::Unpaid)
        .await
        .unwrap();
    assert_eq!(reopened.status, DocumentStatus::Unpaid);
    assert!(reopened.paid_at.is_none());

    let customer = reload(&db, &zainab).await;
    assert_eq!(customer.total_purchases_cents, 0);
    assert_eq!(customer.outstanding_balance_cents, 1000);
    assert_eq!(customer.last_purchase, None);
}

// =============================================================================
// Delete & reads
// =============================================================================

#[tokio::test]
async fn test_delete_unpaid_restocks() {
    let db = setup().await;
    let engine = db.engine();
    let milk = stock(&db, "Milk", 220, 6).await;
    let faisal = register(&db, "Faisal Malik", "03041234567").await;

    let doc = engine
        .create_document(walk_in("Faisal Malik", "03041234567"))
        .await
        .unwrap();
    engine.add_item(&doc.id, &milk.id, 4, None).await.unwrap();
    assert_eq!(reload(&db, &faisal).await.outstanding_balance_cents, 880);

    engine.delete_document(&doc.id).await.unwrap();

    assert_eq!(db.products().available(&milk.id).await.unwrap(), 6);
    assert_eq!(reload(&db, &faisal).await.outstanding_balance_cents, 0);
    assert!(engine.locks.is_empty());

    let err = engine.get_document(&doc.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = engine.delete_document(&doc.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_delete_paid_keeps_stock_sold() {
    let db = setup().await;
    let engine = db.engine();
    let milk = stock(&db, "Milk", 220, 6).await;
    let doc = engine
        .create_document(NewDocument::pos("Walk-in", None))
        .await
        .unwrap();
    engine.add_item(&doc.id, &milk.id, 4, None).await.unwrap();
    engine.make_payment(&doc.id).await.unwrap();

    engine.delete_document(&doc.id).await.unwrap();

    assert_eq!(db.products().available(&milk.id).await.unwrap(), 2);
    assert!(db.documents().items(&doc.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_document_detail_read_model() {
    let db = setup().await;
    let engine = db.engine();
    let tea = stock(&db, "Tea", 450, 10).await;
    let doc = engine
        .create_document(NewDocument::pos("Walk-in", None))
        .await
        .unwrap();

    let empty = engine.get_document(&doc.id).await.unwrap();
    assert!(!empty.can_make_payment);
    assert_eq!(empty.totals.item_count, 0);

    engine.add_item(&doc.id, &tea.id, 2, None).await.unwrap();
    engine
        .update_discount(&doc.id, Money::from_cents(100))
        .await
        .unwrap();

    let detail = engine.get_document(&doc.id).await.unwrap();
    assert!(detail.can_make_payment);
    assert_eq!(detail.totals.subtotal, Money::from_cents(900));
    assert_eq!(detail.totals.discount, Money::from_cents(100));
    assert_eq!(detail.totals.total, Money::from_cents(800));
    assert_eq!(detail.items.len(), 1);

    let listed = db
        .documents()
        .list(DocumentKind::Pos, Some(DocumentStatus::Unpaid), 10)
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].total_cents, 800);

    engine.make_payment(&doc.id).await.unwrap();
    let paid = engine.get_document(&doc.id).await.unwrap();
    assert!(!paid.can_make_payment);
}
