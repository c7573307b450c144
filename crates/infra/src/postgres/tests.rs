//! Transaction behaviour against a live database. Each test returns early
//! unless `DATABASE_URL` points at a disposable Postgres.

use chrono::{Days, NaiveDate, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use stockroom_core::{DocumentKind, ProductId, SupplierId};
use stockroom_parties::{NewSupplier, Supplier};
use stockroom_products::{NewProduct, Product};
use stockroom_purchasing::{NewGoodsReceive, NewGoodsReceiveItem};
use stockroom_sales::{NewOrder, NewOrderItem, NewStockOut, NewStockOutItem, OrderStatus};

use super::PgStore;
use crate::error::StoreError;
use crate::store::{
    GoodsReceiveRepository, OrderRepository, ProductRepository, StockOutRepository,
    SupplierRepository,
};

/// Concurrent `CREATE TABLE IF NOT EXISTS` can race in Postgres.
static SCHEMA_LOCK: Mutex<()> = Mutex::const_new(());

async fn store() -> Option<PgStore> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let _guard = SCHEMA_LOCK.lock().await;
    Some(PgStore::connect(&url, 4).await.unwrap())
}

fn unique_code() -> String {
    format!("T-{}", Uuid::now_v7().simple())
}

/// A document date no other test run shares, so sequence rows can be counted.
fn unique_day() -> NaiveDate {
    let offset = (Uuid::now_v7().as_u128() & 0xFFFF_FFFF) as u64 % 60_000;
    NaiveDate::from_ymd_opt(1850, 1, 1).unwrap() + Days::new(offset)
}

async fn product(store: &PgStore, stock: i64) -> Product {
    let p = Product::create(
        NewProduct {
            code: unique_code(),
            name: "Transaction test product".into(),
            category: None,
            unit: None,
            cost_price: 100,
            sale_price: 150,
            opening_stock: stock,
            reorder_level: 0,
        },
        Utc::now(),
    )
    .unwrap();
    store.create_product(p).await.unwrap()
}

async fn supplier(store: &PgStore) -> Supplier {
    let s = Supplier::create(
        NewSupplier {
            name: "Transaction test supplier".into(),
            contact_person: None,
            phone: None,
            email: None,
            address: None,
        },
        Utc::now(),
    )
    .unwrap();
    store.create_supplier(s).await.unwrap()
}

fn receive(
    supplier_id: SupplierId,
    day: NaiveDate,
    lines: &[(ProductId, i64, i64)],
) -> NewGoodsReceive {
    NewGoodsReceive {
        supplier_id,
        received_on: Some(day),
        items: lines
            .iter()
            .map(|(product_id, quantity, unit_cost)| NewGoodsReceiveItem {
                product_id: *product_id,
                quantity: *quantity,
                unit_cost: *unit_cost,
            })
            .collect(),
        discount: 0,
        paid: 0,
        note: None,
    }
}

fn issue(day: NaiveDate, lines: &[(ProductId, i64)]) -> NewStockOut {
    NewStockOut {
        customer_name: "Walk-in customer".into(),
        customer_phone: None,
        issued_on: Some(day),
        items: lines
            .iter()
            .map(|(product_id, quantity)| NewStockOutItem {
                product_id: *product_id,
                quantity: *quantity,
                unit_price: None,
            })
            .collect(),
        discount: 0,
        note: None,
    }
}

async fn sequence_rows(store: &PgStore, kind: DocumentKind, day: NaiveDate) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM document_sequences WHERE kind = $1 AND day = $2")
        .bind(kind.prefix())
        .bind(day)
        .fetch_one(store.pool())
        .await
        .unwrap()
}

async fn receives_for(store: &PgStore, supplier_id: SupplierId) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM goods_receives WHERE supplier_id = $1")
        .bind(*supplier_id.as_uuid())
        .fetch_one(store.pool())
        .await
        .unwrap()
}

#[tokio::test]
async fn short_stock_out_writes_nothing() {
    let Some(store) = store().await else { return };
    let a = product(&store, 5).await;
    let b = product(&store, 1).await;
    let day = unique_day();

    let err = store
        .create_stock_out(issue(day, &[(a.id, 2), (b.id, 3)]), None, Utc::now())
        .await
        .unwrap_err();
    assert!(
        matches!(err, StoreError::InsufficientStock { product_id, available: 1, requested: 3 } if product_id == b.id),
        "{err:?}"
    );

    assert_eq!(store.get_product(a.id).await.unwrap().stock, 5);
    assert_eq!(store.get_product(b.id).await.unwrap().stock, 1);
    assert_eq!(sequence_rows(&store, DocumentKind::StockOut, day).await, 0);
}

#[tokio::test]
async fn goods_receive_with_unknown_product_rolls_back() {
    let Some(store) = store().await else { return };
    let a = product(&store, 2).await;
    let s = supplier(&store).await;
    let day = unique_day();

    let err = store
        .create_goods_receive(
            receive(s.id, day, &[(a.id, 4, 999), (ProductId::new(), 1, 10)]),
            None,
            Utc::now(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }), "{err:?}");

    let after = store.get_product(a.id).await.unwrap();
    assert_eq!(after.stock, 2);
    assert_eq!(after.cost_price, a.cost_price);
    assert_eq!(receives_for(&store, s.id).await, 0);
    assert_eq!(sequence_rows(&store, DocumentKind::GoodsReceive, day).await, 0);
}

#[tokio::test]
async fn sold_goods_receive_cannot_be_deleted() {
    let Some(store) = store().await else { return };
    let a = product(&store, 0).await;
    let s = supplier(&store).await;
    let day = unique_day();

    let gr = store
        .create_goods_receive(receive(s.id, day, &[(a.id, 5, 120)]), None, Utc::now())
        .await
        .unwrap();
    assert_eq!(store.get_product(a.id).await.unwrap().cost_price.minor(), 120);
    store
        .create_stock_out(issue(day, &[(a.id, 4)]), None, Utc::now())
        .await
        .unwrap();

    let err = store.delete_goods_receive(gr.id).await.unwrap_err();
    assert!(
        matches!(err, StoreError::InsufficientStock { available: 1, requested: 5, .. }),
        "{err:?}"
    );
    assert!(store.get_goods_receive(gr.id).await.is_ok());
    assert_eq!(store.get_product(a.id).await.unwrap().stock, 1);
}

#[tokio::test]
async fn order_fulfils_once() {
    let Some(store) = store().await else { return };
    let a = product(&store, 5).await;
    let order = store
        .create_order(
            NewOrder {
                customer_name: "Grace".into(),
                customer_phone: None,
                items: vec![NewOrderItem { product_id: a.id, quantity: 2, unit_price: None }],
                note: None,
            },
            None,
            Utc::now(),
        )
        .await
        .unwrap();

    let (fulfilled, stock_out) = store.fulfill_order(order.id, None, Utc::now()).await.unwrap();
    assert_eq!(fulfilled.status, OrderStatus::Fulfilled);
    assert_eq!(fulfilled.stock_out_id, Some(stock_out.id));
    assert_eq!(stock_out.order_id, Some(order.id));
    assert_eq!(store.get_product(a.id).await.unwrap().stock, 3);

    assert!(store.fulfill_order(order.id, None, Utc::now()).await.is_err());
    assert_eq!(store.get_product(a.id).await.unwrap().stock, 3);
    assert_eq!(store.get_order(order.id).await.unwrap().status, OrderStatus::Fulfilled);

    let err = store.delete_stock_out(stock_out.id).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)), "{err:?}");
}
