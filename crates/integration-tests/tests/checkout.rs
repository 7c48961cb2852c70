//! End-to-end checkout against a scratch database.
//!
//! Skipped unless `VITRINA_TEST_DATABASE_URL` is set.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tokio::task::JoinSet;

use vitrina_core::Role;
use vitrina_integration_tests::{database_state, send, token_for};
use vitrina_storefront::db::ProductRepository;
use vitrina_storefront::models::ProductInput;
use vitrina_storefront::state::AppState;

async fn product(state: &AppState, name: &str, price: i64, stock: i32) -> i32 {
    ProductRepository::new(state.pool())
        .create(&ProductInput {
            name: name.to_owned(),
            description: None,
            price: Decimal::new(price, 0),
            stock,
            photo: None,
            category_id: None,
            manufacturer_id: None,
        })
        .await
        .unwrap()
        .id
        .as_i32()
}

async fn count_rows(state: &AppState, table: &str, user_id: i64) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table} WHERE user_id = $1"))
        .bind(i32::try_from(user_id).unwrap())
        .fetch_one(state.pool())
        .await
        .unwrap()
}

async fn register(state: &AppState) -> (String, i64) {
    let email = format!("buyer-{}@example.com", uuid::Uuid::new_v4());
    let (status, body) = send(
        state,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "email": email,
            "password": "correct horse battery",
            "firstName": "Анна",
            "lastName": "Иванова"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    (
        body["token"].as_str().unwrap().to_owned(),
        body["user"]["id"].as_i64().unwrap(),
    )
}

#[tokio::test]
async fn test_checkout_creates_order_with_items() {
    let Some(state) = database_state().await else {
        return;
    };
    let (token, user_id) = register(&state).await;
    let kettle = product(&state, "Чайник", 1500, 10).await;
    let lamp = product(&state, "Лампа", 250, 10).await;

    let (status, body) = send(
        &state,
        "POST",
        "/api/orders",
        Some(&token),
        Some(json!({
            "userId": user_id,
            "address": {"city": "Казань", "street": "Баумана", "house": "5"},
            "deliveryMethod": "courier",
            "paymentMethod": "card",
            "items": [
                {"product_id": kettle, "quantity": 1, "price": 1},
                {"productId": lamp.to_string(), "quantity": "2"}
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let order_id = body["orderId"].as_i64().unwrap();

    let (status, order) = send(
        &state,
        "GET",
        &format!("/api/orders?orderId={order_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["delivery_method"], "courier");
    assert_eq!(order["payment_method"], "card");
    assert_eq!(order["items"].as_array().unwrap().len(), 2);

    let (_, stock) = send(&state, "GET", &format!("/api/products/{lamp}"), None, None).await;
    assert_eq!(stock["stock"], 8);
}

#[tokio::test]
async fn test_insufficient_stock_rolls_back() {
    let Some(state) = database_state().await else {
        return;
    };
    let (token, user_id) = register(&state).await;
    let scarce = product(&state, "Редкая ваза", 9000, 1).await;
    let plenty = product(&state, "Салфетки", 50, 100).await;

    let (status, _) = send(
        &state,
        "POST",
        "/api/orders",
        Some(&token),
        Some(json!({
            "userId": user_id,
            "address": {"house": "1"},
            "items": [
                {"product_id": plenty, "quantity": 3},
                {"product_id": scarce, "quantity": 2}
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = send(&state, "GET", &format!("/api/products/{plenty}"), None, None).await;
    assert_eq!(body["stock"], 100);

    let (_, orders) = send(&state, "GET", "/api/orders", Some(&token), None).await;
    assert_eq!(orders, Value::Array(Vec::new()));
}

#[tokio::test]
async fn test_order_without_house_or_apartment_is_rejected() {
    let Some(state) = database_state().await else {
        return;
    };
    let (token, user_id) = register(&state).await;
    let item = product(&state, "Кружка", 300, 5).await;

    let (status, _) = send(
        &state,
        "POST",
        "/api/orders",
        Some(&token),
        Some(json!({
            "userId": user_id,
            "address": {"city": "Казань", "house": "  ", "apartment": ""},
            "items": [{"product_id": item, "quantity": 1}]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(count_rows(&state, "addresses", user_id).await, 0);
    assert_eq!(count_rows(&state, "orders", user_id).await, 0);
}

#[tokio::test]
async fn test_order_for_unknown_user_writes_nothing() {
    let Some(state) = database_state().await else {
        return;
    };
    let admin = token_for(&state, 1, Role::Admin);
    let item = product(&state, "Свеча", 400, 5).await;
    let ghost = 2_147_483_001_i64;

    let (status, _) = send(
        &state,
        "POST",
        "/api/orders",
        Some(&admin),
        Some(json!({
            "userId": ghost,
            "address": {"house": "9"},
            "items": [{"product_id": item, "quantity": 1}]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(count_rows(&state, "addresses", ghost).await, 0);
    assert_eq!(count_rows(&state, "orders", ghost).await, 0);

    let (_, body) = send(&state, "GET", &format!("/api/products/{item}"), None, None).await;
    assert_eq!(body["stock"], 5);
}

#[tokio::test]
async fn test_concurrent_checkouts_in_opposite_order_all_succeed() {
    let Some(state) = database_state().await else {
        return;
    };
    let (token, user_id) = register(&state).await;
    let first = product(&state, "Тарелка", 120, 1000).await;
    let second = product(&state, "Вилка", 60, 1000).await;

    let mut checkouts = JoinSet::new();
    for round in 0..24 {
        let (a, b) = if round % 2 == 0 { (first, second) } else { (second, first) };
        let state = state.clone();
        let token = token.clone();
        checkouts.spawn(async move {
            send(
                &state,
                "POST",
                "/api/orders",
                Some(&token),
                Some(json!({
                    "userId": user_id,
                    "address": {"house": "3"},
                    "items": [{"product_id": a, "quantity": 1}, {"product_id": b, "quantity": 1}]
                })),
            )
            .await
        });
    }

    while let Some(result) = checkouts.join_next().await {
        let (status, body) = result.unwrap();
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    let (_, body) = send(&state, "GET", &format!("/api/products/{first}"), None, None).await;
    assert_eq!(body["stock"], 976);
    let (_, body) = send(&state, "GET", &format!("/api/products/{second}"), None, None).await;
    assert_eq!(body["stock"], 976);
}

#[tokio::test]
async fn test_duplicate_lines_are_merged() {
    let Some(state) = database_state().await else {
        return;
    };
    let (token, user_id) = register(&state).await;
    let item = product(&state, "Ложка", 40, 10).await;

    let (status, body) = send(
        &state,
        "POST",
        "/api/orders",
        Some(&token),
        Some(json!({
            "userId": user_id,
            "address": {"house": "2"},
            "items": [{"product_id": item, "quantity": 2}, {"product_id": item, "quantity": 3}]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let order_id = body["orderId"].as_i64().unwrap();

    let (_, order) = send(
        &state,
        "GET",
        &format!("/api/orders?orderId={order_id}"),
        Some(&token),
        None,
    )
    .await;
    let items = order["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], 5);

    let (_, body) = send(&state, "GET", &format!("/api/products/{item}"), None, None).await;
    assert_eq!(body["stock"], 5);
}

#[tokio::test]
async fn test_mixed_case_legacy_account_can_log_in() {
    let Some(state) = database_state().await else {
        return;
    };
    let local = format!("Legacy.Buyer-{}", uuid::Uuid::new_v4().simple());
    sqlx::query("INSERT INTO users (email, password_hash) VALUES ($1, $2)")
        .bind(format!("{local}@Example.COM"))
        .bind("plain-old-secret")
        .execute(state.pool())
        .await
        .unwrap();

    let (status, body) = send(
        &state,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({
            "email": format!("{}@example.com", local.to_lowercase()),
            "password": "plain-old-secret"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["token"].as_str().is_some());
}

#[tokio::test]
async fn test_unknown_order_is_not_found() {
    let Some(state) = database_state().await else {
        return;
    };
    let token = token_for(&state, 1, Role::Admin);
    let (status, _) = send(
        &state,
        "GET",
        "/api/orders?orderId=2147483000",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_payment_upsert_replaces_status() {
    let Some(state) = database_state().await else {
        return;
    };
    let (token, user_id) = register(&state).await;
    let item = product(&state, "Плед", 2000, 5).await;
    let (_, body) = send(
        &state,
        "POST",
        "/api/orders",
        Some(&token),
        Some(json!({
            "userId": user_id,
            "address": {"apartment": "12"},
            "items": [{"product_id": item, "quantity": 1}]
        })),
    )
    .await;
    let order_id = body["orderId"].as_i64().unwrap();

    let staff = token_for(&state, 1, Role::Manager);
    for status in ["pending", "paid"] {
        let (code, _) = send(
            &state,
            "POST",
            "/api/payments",
            Some(&staff),
            Some(json!({"orderId": order_id, "method": "card", "status": status})),
        )
        .await;
        assert_eq!(code, StatusCode::OK);
    }

    let (code, payment) = send(
        &state,
        "GET",
        &format!("/api/payments/{order_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(payment["status"], "paid");
}
