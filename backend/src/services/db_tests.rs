//! Service tests against a live PostgreSQL database
//!
//! Run with `cargo test -- --ignored` and `DATABASE_URL` (or `MOPS__DATABASE__URL`)
//! pointing at a scratch database. Each test seeds its own companies.

use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use shared::models::{
    BulkDeliveryInput, BusinessCustomerInput, CreateOrderInput, DeliveryUpdate, ProductInput,
};
use shared::types::Pagination;

use super::{CustomerService, OrderService, ProductService};
use crate::error::AppError;

async fn pool() -> PgPool {
    let url = std::env::var("MOPS__DATABASE__URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("DATABASE_URL must be set for database tests");
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("connect to test database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");
    pool
}

/// Insert a company with one owner, returning `(company_id, user_id)`
async fn seed_company(pool: &PgPool, name: &str) -> (Uuid, Uuid) {
    let tag = Uuid::new_v4().simple().to_string();
    let company_id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO companies (name, email) VALUES ($1, $2) RETURNING id",
    )
    .bind(name)
    .bind(format!("company-{}@example.com", tag))
    .fetch_one(pool)
    .await
    .expect("insert company");

    let user_id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO users (company_id, name, email, password_hash, role)
        VALUES ($1, 'Owner', $2, 'not-a-hash', 'owner')
        RETURNING id
        "#,
    )
    .bind(company_id)
    .bind(format!("owner-{}@example.com", tag))
    .fetch_one(pool)
    .await
    .expect("insert user");

    (company_id, user_id)
}

/// Seed a customer and a product, then place an order for `quantity` units
async fn seed_order(pool: &PgPool, company_id: Uuid, user_id: Uuid, quantity: Decimal) -> Uuid {
    let customer = CustomerService::new(pool.clone())
        .create(
            company_id,
            BusinessCustomerInput {
                name: "Sharma Traders".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let product = ProductService::new(pool.clone())
        .create_product(
            company_id,
            ProductInput {
                name: "Filter Coffee 500g".to_string(),
                sku: format!("FC-{}", &Uuid::new_v4().simple().to_string()[..8]).to_uppercase(),
                selling_price: Decimal::from(120),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    OrderService::new(pool.clone())
        .create(
            company_id,
            user_id,
            CreateOrderInput {
                customer_id: customer.id,
                product_id: product.id,
                quantity_ordered: quantity,
                price_per_unit: Decimal::from(120),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .order
        .id
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_created_customer_is_listed() {
    let pool = pool().await;
    let (company_id, _) = seed_company(&pool, "Round Trip Roasters").await;
    let service = CustomerService::new(pool);

    let created = service
        .create(
            company_id,
            BusinessCustomerInput {
                name: "Kaveri Cafe".to_string(),
                contact_person: Some("Anita".to_string()),
                city: Some("Mysuru".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let page = service
        .list(company_id, None, &Pagination::default())
        .await
        .unwrap();

    assert_eq!(page.data.len(), 1);
    let listed = &page.data[0];
    assert_eq!(listed.id, created.id);
    assert_eq!(listed.name, "Kaveri Cafe");
    assert_eq!(listed.contact_person.as_deref(), Some("Anita"));
    assert_eq!(listed.city.as_deref(), Some("Mysuru"));
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_created_order_reads_back() {
    let pool = pool().await;
    let (company_id, user_id) = seed_company(&pool, "Order Roasters").await;
    let order_id = seed_order(&pool, company_id, user_id, Decimal::from(50)).await;

    let detail = OrderService::new(pool).get(company_id, order_id).await.unwrap();

    assert_eq!(detail.order.quantity_ordered, Decimal::from(50));
    assert_eq!(detail.order.quantity_delivered, Decimal::ZERO);
    assert_eq!(detail.order.remaining_quantity, Decimal::from(50));
    assert_eq!(detail.order.total_amount, Decimal::from(6000));
    assert!(detail.deliveries.is_empty());
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_rejected_batch_leaves_orders_untouched() {
    let pool = pool().await;
    let (company_id, user_id) = seed_company(&pool, "Batch Roasters").await;
    let first = seed_order(&pool, company_id, user_id, Decimal::from(100)).await;
    let second = seed_order(&pool, company_id, user_id, Decimal::from(10)).await;
    let service = OrderService::new(pool);

    let result = service
        .bulk_delivery(
            company_id,
            user_id,
            BulkDeliveryInput {
                updates: vec![
                    DeliveryUpdate {
                        order_id: first,
                        quantity_delivered: Decimal::from(40),
                        ..Default::default()
                    },
                    DeliveryUpdate {
                        order_id: second,
                        quantity_delivered: Decimal::from(25),
                        ..Default::default()
                    },
                ],
            },
        )
        .await;

    match result {
        Err(AppError::BatchRejected(items)) => {
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].index, 1);
            assert_eq!(items[0].order_id, second);
        }
        other => panic!("expected a rejected batch, got {:?}", other.map(|r| r.orders.len())),
    }

    let first = service.get(company_id, first).await.unwrap();
    assert_eq!(first.order.quantity_delivered, Decimal::ZERO);
    assert_eq!(first.order.remaining_quantity, Decimal::from(100));
    assert!(first.deliveries.is_empty());

    let second = service.get(company_id, second).await.unwrap();
    assert_eq!(second.order.quantity_delivered, Decimal::ZERO);
    assert_eq!(second.order.remaining_quantity, Decimal::from(10));
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_other_company_ids_are_not_found() {
    let pool = pool().await;
    let (owner, user_id) = seed_company(&pool, "Owner Roasters").await;
    let (intruder, _) = seed_company(&pool, "Intruder Roasters").await;
    let order_id = seed_order(&pool, owner, user_id, Decimal::from(5)).await;

    let orders = OrderService::new(pool.clone());
    assert!(matches!(
        orders.get(intruder, order_id).await,
        Err(AppError::NotFound(_))
    ));

    let customers = CustomerService::new(pool);
    let customer_id = orders.get(owner, order_id).await.unwrap().order.customer_id;
    assert!(matches!(
        customers.get(intruder, customer_id).await,
        Err(AppError::NotFound(_))
    ));
    let listed = customers
        .list(intruder, None, &Pagination::default())
        .await
        .unwrap();
    assert!(listed.data.is_empty());
}
