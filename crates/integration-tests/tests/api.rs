//! API behavior that is decided before any query runs: routing, token
//! checks, role checks and request validation.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;

use vitrina_core::Role;
use vitrina_integration_tests::{offline_state, send, token_for};

#[tokio::test]
async fn test_health() {
    let state = offline_state();
    let (status, _) = send(&state, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_profile_requires_token() {
    let state = offline_state();
    let (status, body) = send(&state, "GET", "/api/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authentication required");
}

#[tokio::test]
async fn test_garbage_token_is_unauthorized() {
    let state = offline_state();
    let (status, _) = send(&state, "GET", "/api/users/me", Some("not.a.jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_client_cannot_list_users() {
    let state = offline_state();
    let token = token_for(&state, 1, Role::Client);
    let (status, body) = send(&state, "GET", "/api/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Insufficient permissions");
}

#[tokio::test]
async fn test_manager_cannot_reach_backups() {
    let state = offline_state();
    let token = token_for(&state, 2, Role::Manager);
    let (status, _) = send(&state, "GET", "/api/backup/list", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_client_cannot_change_order_status() {
    let state = offline_state();
    let token = token_for(&state, 1, Role::Client);
    let (status, _) = send(
        &state,
        "PUT",
        "/api/orders/1/status",
        Some(&token),
        Some(json!({"status": "shipped"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_order_without_items_is_bad_request() {
    let state = offline_state();
    let token = token_for(&state, 7, Role::Client);
    let (status, body) = send(
        &state,
        "POST",
        "/api/orders",
        Some(&token),
        Some(json!({"userId": 7, "deliveryMethod": "courier"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "userId and items are required");
}

#[tokio::test]
async fn test_client_cannot_order_for_someone_else() {
    let state = offline_state();
    let token = token_for(&state, 7, Role::Client);
    let (status, _) = send(
        &state,
        "POST",
        "/api/orders",
        Some(&token),
        Some(json!({"userId": 8, "items": [{"product_id": 1, "quantity": 1}]})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_restore_requires_filename() {
    let state = offline_state();
    let token = token_for(&state, 1, Role::Admin);
    let (status, body) = send(
        &state,
        "POST",
        "/api/backup/restore",
        Some(&token),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "filename is required");
}

#[tokio::test]
async fn test_download_rejects_path_components() {
    let state = offline_state();
    let token = token_for(&state, 1, Role::Admin);
    let (status, _) = send(
        &state,
        "GET",
        "/api/backup/download/..%2Fsecrets.sql",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cleanup_without_backup_dir_deletes_nothing() {
    let state = offline_state();
    let token = token_for(&state, 1, Role::Admin);
    let (status, body) = send(
        &state,
        "POST",
        "/api/backup/cleanup",
        Some(&token),
        Some(json!({"retentionDays": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "deleted": 0}));
}

#[tokio::test]
async fn test_cleanup_removes_dumps_past_retention() {
    let state = offline_state();
    let token = token_for(&state, 1, Role::Admin);
    let dir = state.config().backup.dir.clone();
    tokio::fs::create_dir_all(&dir).await.unwrap();
    tokio::fs::write(dir.join("backup_2020-01-01_00-00-00.sql"), b"-- dump")
        .await
        .unwrap();
    tokio::fs::write(dir.join("notes.txt"), b"keep me").await.unwrap();

    let (status, body) = send(
        &state,
        "POST",
        "/api/backup/cleanup",
        Some(&token),
        Some(json!({"retentionDays": 30})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 0);

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let (status, body) = send(
        &state,
        "POST",
        "/api/backup/cleanup",
        Some(&token),
        Some(json!({"retentionDays": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "deleted": 1}));
    assert!(!dir.join("backup_2020-01-01_00-00-00.sql").exists());
    assert!(dir.join("notes.txt").exists());

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}

#[tokio::test]
async fn test_empty_cart_needs_no_session() {
    let state = offline_state();
    let (status, body) = send(&state, "GET", "/api/cart", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"], json!([]));
    assert_eq!(body["itemCount"], 0);
}

#[tokio::test]
async fn test_cart_rejects_zero_quantity() {
    let state = offline_state();
    let (status, _) = send(
        &state,
        "POST",
        "/api/cart/items",
        None,
        Some(json!({"productId": 1, "quantity": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
