mod common;

use axum::http::{Method, StatusCode};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::json;
use uuid::Uuid;

use common::{assert_status, dec_field, TestApp};
use retail_pos_api::entities::payment_due;

async fn seed_pending_sale(app: &TestApp, cashier: Uuid, sku: &str, total: &str) -> String {
    let item_id = app.seed_item(sku, dec!(10.00), dec!(100)).await;
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "payment_method": "credit",
                "status": "pending",
                "cashier_id": cashier,
                "total": total,
                "subtotal": total,
                "lines": [
                    {"item_id": item_id, "quantity": "1", "price": "10.00", "total": "10.00"}
                ]
            })),
        )
        .await;
    let body = assert_status(response, StatusCode::CREATED).await;
    body["data"]["id"].as_str().unwrap().to_string()
}

async fn backdate_due(app: &TestApp, sale_id: &str, due_date: DateTime<Utc>) {
    let sale_id: Uuid = sale_id.parse().unwrap();
    let due = payment_due::Entity::find()
        .all(&*app.state.db)
        .await
        .unwrap()
        .into_iter()
        .find(|d| d.sale_id == sale_id)
        .expect("payment due for sale");

    let mut active: payment_due::ActiveModel = due.into();
    active.due_date = Set(due_date);
    active.update(&*app.state.db).await.unwrap();
}

#[tokio::test]
async fn overdue_listing_only_shows_unpaid_dues_past_their_date() {
    let app = TestApp::new().await;
    let cashier = app.seed_cashier("kate").await;

    let fresh = seed_pending_sale(&app, cashier, "OD-FRESH", "20.00").await;
    let late = seed_pending_sale(&app, cashier, "OD-LATE", "30.00").await;
    backdate_due(&app, &late, Utc::now() - Duration::days(3)).await;

    let response = app
        .request_authenticated(Method::GET, "/api/v1/payments/overdue", None)
        .await;
    let body = assert_status(response, StatusCode::OK).await;
    let dues = body["data"].as_array().unwrap();
    assert_eq!(dues.len(), 1);
    assert_eq!(dues[0]["sale_id"].as_str().unwrap(), late);

    // The fresh due is still pending, just not overdue.
    let response = app
        .request_authenticated(Method::GET, "/api/v1/payments/pending", None)
        .await;
    let body = assert_status(response, StatusCode::OK).await;
    let pending: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["sale_id"].as_str().unwrap())
        .collect();
    assert!(pending.contains(&fresh.as_str()));
    assert!(pending.contains(&late.as_str()));
}

#[tokio::test]
async fn mark_paid_overwrites_the_due_date_with_the_payment_date() {
    let app = TestApp::new().await;
    let cashier = app.seed_cashier("liam").await;
    let sale_id = seed_pending_sale(&app, cashier, "MP-001", "45.00").await;

    let response = app
        .request_authenticated(Method::GET, "/api/v1/payments/pending", None)
        .await;
    let body = assert_status(response, StatusCode::OK).await;
    let due_id = body["data"][0]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"][0]["sale_id"].as_str().unwrap(), sale_id);

    let payment_date = "2026-08-15T10:30:00Z";
    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/payments/{}/paid", due_id),
            Some(json!({"payment_date": payment_date})),
        )
        .await;
    let body = assert_status(response, StatusCode::OK).await;
    assert_eq!(body["data"]["status"], "paid");
    let recorded: DateTime<Utc> = body["data"]["due_date"].as_str().unwrap().parse().unwrap();
    assert_eq!(recorded, payment_date.parse::<DateTime<Utc>>().unwrap());

    // Settled dues drop out of the pending listing.
    let response = app
        .request_authenticated(Method::GET, "/api/v1/payments/pending", None)
        .await;
    let body = assert_status(response, StatusCode::OK).await;
    assert_eq!(body["data"].as_array().map(|d| d.len()), Some(0));
}

#[tokio::test]
async fn mark_paid_without_a_date_keeps_the_due_date() {
    let app = TestApp::new().await;
    let cashier = app.seed_cashier("rhea").await;
    seed_pending_sale(&app, cashier, "MP-002", "30.00").await;

    let response = app
        .request_authenticated(Method::GET, "/api/v1/payments/pending", None)
        .await;
    let body = assert_status(response, StatusCode::OK).await;
    let due_id = body["data"][0]["id"].as_str().unwrap().to_string();
    let original_due: DateTime<Utc> = body["data"][0]["due_date"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/payments/{}/paid", due_id),
            None,
        )
        .await;
    let body = assert_status(response, StatusCode::OK).await;
    assert_eq!(body["data"]["status"], "paid");
    let recorded: DateTime<Utc> = body["data"]["due_date"].as_str().unwrap().parse().unwrap();
    assert_eq!(recorded, original_due);
}

#[tokio::test]
async fn a_due_from_earlier_today_is_not_yet_overdue() {
    let app = TestApp::new().await;
    let cashier = app.seed_cashier("sami").await;
    let sale_id = seed_pending_sale(&app, cashier, "OD-TODAY", "15.00").await;

    // Just past midnight today, so it is in the past but not a day old.
    let earlier_today = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc()
        + Duration::seconds(1);
    backdate_due(&app, &sale_id, earlier_today).await;

    let response = app
        .request_authenticated(Method::GET, "/api/v1/payments/overdue", None)
        .await;
    let body = assert_status(response, StatusCode::OK).await;
    assert_eq!(body["data"].as_array().map(|d| d.len()), Some(0));

    let response = app
        .request_authenticated(Method::GET, "/api/v1/payments/pending", None)
        .await;
    let body = assert_status(response, StatusCode::OK).await;
    assert_eq!(body["data"][0]["sale_id"].as_str().unwrap(), sale_id);
}

#[tokio::test]
async fn mark_paid_on_missing_due_is_not_found() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/payments/{}/paid", Uuid::new_v4()),
            None,
        )
        .await;
    assert_status(response, StatusCode::NOT_FOUND).await;
}

#[tokio::test]
async fn listings_are_ordered_by_due_date() {
    let app = TestApp::new().await;
    let cashier = app.seed_cashier("mona").await;

    let first = seed_pending_sale(&app, cashier, "ORD-A", "10.00").await;
    let second = seed_pending_sale(&app, cashier, "ORD-B", "20.00").await;
    let third = seed_pending_sale(&app, cashier, "ORD-C", "30.00").await;

    backdate_due(&app, &first, Utc::now() - Duration::days(10)).await;
    backdate_due(&app, &second, Utc::now() - Duration::days(5)).await;
    backdate_due(&app, &third, Utc::now() + Duration::days(5)).await;

    // Full listing: latest due date first.
    let response = app
        .request_authenticated(Method::GET, "/api/v1/payments", None)
        .await;
    let body = assert_status(response, StatusCode::OK).await;
    let order: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["sale_id"].as_str().unwrap())
        .collect();
    assert_eq!(order, vec![third.as_str(), second.as_str(), first.as_str()]);

    // Pending listing: most urgent first.
    let response = app
        .request_authenticated(Method::GET, "/api/v1/payments/pending", None)
        .await;
    let body = assert_status(response, StatusCode::OK).await;
    let order: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["sale_id"].as_str().unwrap())
        .collect();
    assert_eq!(order, vec![first.as_str(), second.as_str(), third.as_str()]);
}

#[tokio::test]
async fn full_listing_can_be_filtered_by_status() {
    let app = TestApp::new().await;
    let cashier = app.seed_cashier("pia").await;

    let settled = seed_pending_sale(&app, cashier, "FLT-A", "10.00").await;
    let open = seed_pending_sale(&app, cashier, "FLT-B", "20.00").await;

    let response = app
        .request_authenticated(Method::GET, "/api/v1/payments", None)
        .await;
    let body = assert_status(response, StatusCode::OK).await;
    let due_id = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|d| d["sale_id"].as_str() == Some(settled.as_str()))
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/payments/{}/paid", due_id),
            None,
        )
        .await;
    assert_status(response, StatusCode::OK).await;

    let response = app
        .request_authenticated(Method::GET, "/api/v1/payments?status=paid", None)
        .await;
    let body = assert_status(response, StatusCode::OK).await;
    let paid: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["sale_id"].as_str().unwrap())
        .collect();
    assert_eq!(paid, vec![settled.as_str()]);

    let response = app
        .request_authenticated(Method::GET, "/api/v1/payments?status=pending", None)
        .await;
    let body = assert_status(response, StatusCode::OK).await;
    let pending: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["sale_id"].as_str().unwrap())
        .collect();
    assert_eq!(pending, vec![open.as_str()]);

    let response = app
        .request_authenticated(Method::GET, "/api/v1/payments?status=bogus", None)
        .await;
    assert_status(response, StatusCode::BAD_REQUEST).await;
}

#[tokio::test]
async fn explicit_sale_totals_are_trusted_and_due_matches_them() {
    let app = TestApp::new().await;
    let cashier = app.seed_cashier("nina").await;

    // Total deliberately disagrees with the line totals; the server
    // records what the register sent.
    let sale_id = seed_pending_sale(&app, cashier, "TRUST-001", "99.99").await;

    let response = app
        .request_authenticated(Method::GET, &format!("/api/v1/sales/{}", sale_id), None)
        .await;
    let body = assert_status(response, StatusCode::OK).await;
    assert_eq!(dec_field(&body["data"]["total"]), dec!(99.99));

    let response = app
        .request_authenticated(Method::GET, "/api/v1/payments/pending", None)
        .await;
    let body = assert_status(response, StatusCode::OK).await;
    assert_eq!(dec_field(&body["data"][0]["amount"]), dec!(99.99));
}

#[tokio::test]
async fn reversing_a_pending_sale_leaves_its_payment_due_alone() {
    let app = TestApp::new().await;
    let cashier = app.seed_cashier("omar").await;
    let sale_id = seed_pending_sale(&app, cashier, "REV-001", "25.00").await;

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/sales/{}/refund", sale_id),
            None,
        )
        .await;
    assert_status(response, StatusCode::OK).await;

    // The due survives the refund untouched.
    let response = app
        .request_authenticated(Method::GET, "/api/v1/payments/pending", None)
        .await;
    let body = assert_status(response, StatusCode::OK).await;
    let dues = body["data"].as_array().unwrap();
    assert_eq!(dues.len(), 1);
    assert_eq!(dues[0]["sale_id"].as_str().unwrap(), sale_id);
}
