//! Racing sales and cancellations against a file-backed, multi-connection
//! database.

use std::path::Path;

use tally_core::{NewProduct, NewTransaction, SaleLine};
use tally_pos::{ErrorCode, Pos, PosConfig};

const MERCHANT: &str = "merchant-1";

async fn open(dir: &Path) -> Pos {
    let config = PosConfig {
        database_path: dir.join("tally.db"),
        max_connections: 8,
        ..PosConfig::default()
    };
    Pos::connect(&config).await.unwrap()
}

async fn product(pos: &Pos, stock: i64) -> String {
    pos.catalog()
        .create_product(
            MERCHANT,
            NewProduct {
                name: "Limited Edition".to_string(),
                description: None,
                price_cents: 2500,
                stock,
            },
        )
        .await
        .unwrap()
        .id
}

fn one_of(product_id: &str, quantity: i64) -> NewTransaction {
    NewTransaction {
        items: vec![SaleLine::new(product_id, quantity)],
        ..Default::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sales_never_oversell() {
    let dir = tempfile::tempdir().unwrap();
    let pos = open(dir.path()).await;
    let id = product(&pos, 5).await;

    let mut handles = Vec::new();
    for _ in 0..12 {
        let pos = pos.clone();
        let id = id.clone();
        handles.push(tokio::spawn(async move {
            pos.sales().create_transaction(MERCHANT, one_of(&id, 1)).await
        }));
    }

    let mut sold = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => sold += 1,
            Err(err) => assert_eq!(err.code, ErrorCode::InsufficientStock, "{}", err),
        }
    }

    assert_eq!(sold, 5);
    assert_eq!(pos.catalog().get_product(MERCHANT, &id).await.unwrap().stock, 0);

    let page = pos.ledger().get_transactions(MERCHANT, None, 0).await.unwrap();
    assert_eq!(page.total, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_cancels_restore_once() {
    let dir = tempfile::tempdir().unwrap();
    let pos = open(dir.path()).await;
    let id = product(&pos, 10).await;

    let created = pos
        .sales()
        .create_transaction(MERCHANT, one_of(&id, 3))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..6 {
        let pos = pos.clone();
        let transaction_id = created.id.clone();
        handles.push(tokio::spawn(async move {
            pos.sales().cancel_transaction(MERCHANT, &transaction_id).await
        }));
    }

    let mut cancelled = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => cancelled += 1,
            Err(err) => assert_eq!(err.code, ErrorCode::AlreadyCancelled, "{}", err),
        }
    }

    assert_eq!(cancelled, 1);
    assert_eq!(pos.catalog().get_product(MERCHANT, &id).await.unwrap().stock, 10);

    let summary = pos.reports().get_today_sales(MERCHANT).await.unwrap();
    assert_eq!(summary.count, 0);
}
