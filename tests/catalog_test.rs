mod common;

use axum::http::{Method, StatusCode};
use rust_decimal_macros::dec;
use serde_json::json;

use common::{assert_status, dec_field, TestApp};

#[tokio::test]
async fn duplicate_sku_is_a_conflict() {
    let app = TestApp::new().await;
    app.seed_item("DUP-001", dec!(5.00), dec!(10)).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/items",
            Some(json!({
                "name": "Another item",
                "sku": "DUP-001",
                "price": "6.00"
            })),
        )
        .await;
    let body = assert_status(response, StatusCode::CONFLICT).await;
    assert_eq!(body["code"], "conflict");
}

#[tokio::test]
async fn low_stock_lists_items_at_or_below_their_minimum() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/items",
            Some(json!({
                "name": "Running low",
                "sku": "LOW-001",
                "price": "5.00",
                "stock": "2",
                "min_stock_level": "3"
            })),
        )
        .await;
    assert_status(response, StatusCode::CREATED).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/items",
            Some(json!({
                "name": "Well stocked",
                "sku": "HIGH-001",
                "price": "5.00",
                "stock": "50",
                "min_stock_level": "3"
            })),
        )
        .await;
    assert_status(response, StatusCode::CREATED).await;

    let response = app
        .request_authenticated(Method::GET, "/api/v1/items/low-stock", None)
        .await;
    let body = assert_status(response, StatusCode::OK).await;
    let items = body["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["sku"], "LOW-001");
}

#[tokio::test]
async fn items_can_be_partially_updated_and_deactivated() {
    let app = TestApp::new().await;
    let item_id = app.seed_item("UPD-001", dec!(9.00), dec!(4)).await;

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/items/{}", item_id),
            Some(json!({"price": "11.50"})),
        )
        .await;
    let body = assert_status(response, StatusCode::OK).await;
    assert_eq!(dec_field(&body["data"]["price"]), dec!(11.50));
    assert_eq!(dec_field(&body["data"]["stock"]), dec!(4));

    let response = app
        .request_authenticated(Method::DELETE, &format!("/api/v1/items/{}", item_id), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Deactivated items fall out of the catalog listing but the row
    // is still fetchable for historical sales.
    let response = app
        .request_authenticated(Method::GET, "/api/v1/items", None)
        .await;
    let body = assert_status(response, StatusCode::OK).await;
    assert_eq!(body["data"]["items"].as_array().map(|i| i.len()), Some(0));

    let response = app
        .request_authenticated(Method::GET, &format!("/api/v1/items/{}", item_id), None)
        .await;
    let body = assert_status(response, StatusCode::OK).await;
    assert_eq!(body["data"]["is_active"], false);
}

#[tokio::test]
async fn duplicate_username_is_a_conflict() {
    let app = TestApp::new().await;
    app.seed_cashier("paula").await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/users",
            Some(json!({
                "username": "paula",
                "email": "paula2@example.com"
            })),
        )
        .await;
    assert_status(response, StatusCode::CONFLICT).await;
}

#[tokio::test]
async fn users_can_be_listed_and_fetched() {
    let app = TestApp::new().await;
    let id = app.seed_cashier("quinn").await;

    let response = app
        .request_authenticated(Method::GET, "/api/v1/users", None)
        .await;
    let body = assert_status(response, StatusCode::OK).await;
    assert_eq!(body["data"].as_array().map(|u| u.len()), Some(1));

    let response = app
        .request_authenticated(Method::GET, &format!("/api/v1/users/{}", id), None)
        .await;
    let body = assert_status(response, StatusCode::OK).await;
    assert_eq!(body["data"]["username"], "quinn");
}
