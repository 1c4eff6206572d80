//! End-to-end sale, cancel, ledger and report flows through [`Pos`].

use tally_core::{
    NewProduct, NewTransaction, PaymentMethod, ProductPatch, SaleLine, TransactionPatch,
    TransactionStatus,
};
use tally_db::{Database, DbConfig};
use tally_pos::{ErrorCode, Pos, PosConfig};

const MERCHANT: &str = "merchant-1";

async fn pos() -> Pos {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    Pos::new(db, &PosConfig::default())
}

async fn product(pos: &Pos, name: &str, price_cents: i64, stock: i64) -> String {
    pos.catalog()
        .create_product(
            MERCHANT,
            NewProduct {
                name: name.to_string(),
                description: None,
                price_cents,
                stock,
            },
        )
        .await
        .unwrap()
        .id
}

async fn stock_of(pos: &Pos, id: &str) -> i64 {
    pos.catalog().get_product(MERCHANT, id).await.unwrap().stock
}

fn sale(lines: Vec<SaleLine>) -> NewTransaction {
    NewTransaction {
        items: lines,
        payment_method: Some(PaymentMethod::Cash),
        ..Default::default()
    }
}

#[tokio::test]
async fn sell_then_cancel_restores_stock() {
    let pos = pos().await;
    let cola = product(&pos, "Cola", 150, 20).await;

    let created = pos
        .sales()
        .create_transaction(MERCHANT, sale(vec![SaleLine::new(&cola, 5)]))
        .await
        .unwrap();
    assert_eq!(stock_of(&pos, &cola).await, 15);

    pos.sales().cancel_transaction(MERCHANT, &created.id).await.unwrap();
    assert_eq!(stock_of(&pos, &cola).await, 20);

    let fetched = pos.ledger().get_transaction(MERCHANT, &created.id).await.unwrap();
    assert_eq!(fetched.status, TransactionStatus::Cancelled);

    let err = pos
        .sales()
        .cancel_transaction(MERCHANT, &created.id)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::AlreadyCancelled);
    assert_eq!(stock_of(&pos, &cola).await, 20);
}

#[tokio::test]
async fn total_is_computed_from_lines() {
    let pos = pos().await;
    let cola = product(&pos, "Cola", 1000, 10).await;
    let chips = product(&pos, "Chips", 249, 4).await;

    let created = pos
        .sales()
        .create_transaction(
            MERCHANT,
            sale(vec![SaleLine::new(&cola, 3), SaleLine::new(&chips, 2)]),
        )
        .await
        .unwrap();

    assert_eq!(created.total_amount_cents, 3000 + 498);
    assert_eq!(created.items.len(), 2);
    assert_eq!(created.items[0].product_id, cola);
    assert_eq!(created.items[0].line_no, 0);
    assert_eq!(created.items[1].product_id, chips);
    assert_eq!(created.items[1].subtotal_cents, 498);
    assert_eq!(stock_of(&pos, &cola).await, 7);
    assert_eq!(stock_of(&pos, &chips).await, 2);
}

#[tokio::test]
async fn failing_line_rolls_back_earlier_lines() {
    let pos = pos().await;
    let cola = product(&pos, "Cola", 150, 10).await;
    let chips = product(&pos, "Chips", 249, 1).await;

    let err = pos
        .sales()
        .create_transaction(
            MERCHANT,
            sale(vec![SaleLine::new(&cola, 4), SaleLine::new(&chips, 2)]),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InsufficientStock);
    assert!(err.message.contains("Chips"));

    let err = pos
        .sales()
        .create_transaction(
            MERCHANT,
            sale(vec![SaleLine::new(&cola, 4), SaleLine::new("no-such-product", 1)]),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);

    assert_eq!(stock_of(&pos, &cola).await, 10);
    assert_eq!(stock_of(&pos, &chips).await, 1);

    let page = pos.ledger().get_transactions(MERCHANT, None, 0).await.unwrap();
    assert_eq!(page.total, 0);
    assert!(page.data.is_empty());
}

#[tokio::test]
async fn items_keep_their_snapshot() {
    let pos = pos().await;
    let cola = product(&pos, "Cola", 150, 10).await;

    let created = pos
        .sales()
        .create_transaction(MERCHANT, sale(vec![SaleLine::new(&cola, 1)]))
        .await
        .unwrap();

    pos.catalog()
        .update_product(
            MERCHANT,
            &cola,
            ProductPatch {
                name: Some("Cola Classic".to_string()),
                price_cents: Some(175),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    pos.catalog().delete_product(MERCHANT, &cola).await.unwrap();

    let fetched = pos.ledger().get_transaction(MERCHANT, &created.id).await.unwrap();
    let item = &fetched.items[0];
    assert_eq!(item.product_name, "Cola");
    assert_eq!(item.price_cents, 150);
    assert_eq!(fetched.total_amount_cents, 150);

    let current = item.product.as_ref().unwrap();
    assert_eq!(current.name, "Cola Classic");
    assert!(!current.is_active);

    // Deleted products cannot be sold, but cancelling still restocks them
    let err = pos
        .sales()
        .create_transaction(MERCHANT, sale(vec![SaleLine::new(&cola, 1)]))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
    pos.sales().cancel_transaction(MERCHANT, &created.id).await.unwrap();
}

#[tokio::test]
async fn update_touches_only_notes_and_customer() {
    let pos = pos().await;
    let cola = product(&pos, "Cola", 1000, 10).await;
    let created = pos
        .sales()
        .create_transaction(MERCHANT, sale(vec![SaleLine::new(&cola, 2)]))
        .await
        .unwrap();

    let patch: TransactionPatch = serde_json::from_str(
        r#"{ "notes": "gift wrap", "total_amount": 999, "total_amount_cents": 1, "status": "cancelled" }"#,
    )
    .unwrap();
    pos.ledger()
        .update_transaction(MERCHANT, &created.id, patch)
        .await
        .unwrap();

    let fetched = pos.ledger().get_transaction(MERCHANT, &created.id).await.unwrap();
    assert_eq!(fetched.notes.as_deref(), Some("gift wrap"));
    assert_eq!(fetched.customer_name, None);
    assert_eq!(fetched.total_amount_cents, 2000);
    assert_eq!(fetched.status, TransactionStatus::Completed);

    let err = pos
        .ledger()
        .update_transaction("merchant-2", &created.id, TransactionPatch::default())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn today_sales_exclude_cancelled() {
    let pos = pos().await;
    let big = product(&pos, "Big", 100, 5).await;
    let small = product(&pos, "Small", 50, 5).await;

    pos.sales()
        .create_transaction(MERCHANT, sale(vec![SaleLine::new(&big, 1)]))
        .await
        .unwrap();
    let cancelled = pos
        .sales()
        .create_transaction(MERCHANT, sale(vec![SaleLine::new(&small, 1)]))
        .await
        .unwrap();
    pos.sales()
        .cancel_transaction(MERCHANT, &cancelled.id)
        .await
        .unwrap();

    let summary = pos.reports().get_today_sales(MERCHANT).await.unwrap();
    assert_eq!(summary.total_amount_cents, 100);
    assert_eq!(summary.count, 1);

    let other = pos.reports().get_today_sales("merchant-2").await.unwrap();
    assert_eq!(other.count, 0);
}

#[tokio::test]
async fn transactions_are_paged_newest_first() {
    let pos = pos().await;
    let cola = product(&pos, "Cola", 100, 50).await;

    let mut ids = Vec::new();
    for qty in 1..=3 {
        let created = pos
            .sales()
            .create_transaction(MERCHANT, sale(vec![SaleLine::new(&cola, qty)]))
            .await
            .unwrap();
        ids.push(created.id);
    }

    let first = pos.ledger().get_transactions(MERCHANT, Some(2), 0).await.unwrap();
    assert_eq!(first.total, 3);
    assert_eq!(first.limit, 2);
    assert_eq!(first.data.len(), 2);
    assert_eq!(first.data[0].id, ids[2]);
    assert_eq!(first.data[1].id, ids[1]);
    assert_eq!(first.data[0].items.len(), 1);

    let second = pos.ledger().get_transactions(MERCHANT, Some(2), 2).await.unwrap();
    assert_eq!(second.data.len(), 1);
    assert_eq!(second.data[0].id, ids[0]);

    let clamped = pos.ledger().get_transactions(MERCHANT, Some(1000), 0).await.unwrap();
    assert_eq!(clamped.limit, 100);

    let err = pos
        .ledger()
        .get_transactions(MERCHANT, Some(0), 0)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidInput);

    let err = pos
        .ledger()
        .get_transactions(MERCHANT, None, -1)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidInput);
}
