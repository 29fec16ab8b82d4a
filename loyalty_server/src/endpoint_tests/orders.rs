use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use loyalty_engine::{
    db_types::{OrderRecord, OrderStatus},
    traits::LedgerError,
    OrderApi,
};
use lpg_common::Points;

use super::{
    helpers::{access_cookie, send},
    mocks::MockLedger,
};
use crate::routes::{load_order, order_list};

#[actix_web::test]
async fn uploading_requires_authentication() {
    let req = TestRequest::post().uri("/api/user/orders").set_payload("79927398713");
    let (status, _) = send(req, configure_upload_ok).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn a_fresh_order_is_accepted() {
    let req = TestRequest::post()
        .uri("/api/user/orders")
        .cookie(access_cookie("alice"))
        .set_payload("79927398713");
    let (status, _) = send(req, configure_upload_ok).await;
    assert_eq!(status, StatusCode::ACCEPTED);
}

#[actix_web::test]
async fn reuploading_your_own_order_is_ok_not_conflict() {
    let req = TestRequest::post()
        .uri("/api/user/orders")
        .cookie(access_cookie("alice"))
        .set_payload("79927398713");
    let (status, _) = send(req, configure_upload_duplicate).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn uploading_someone_elses_order_is_a_conflict() {
    let req = TestRequest::post()
        .uri("/api/user/orders")
        .cookie(access_cookie("bob"))
        .set_payload("79927398713");
    let (status, _) = send(req, configure_upload_foreign).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn numbers_failing_the_checksum_are_unprocessable() {
    let req =
        TestRequest::post().uri("/api/user/orders").cookie(access_cookie("alice")).set_payload("12345");
    // No store expectations: the Luhn gate must reject before any store call.
    let (status, _) = send(req, configure_upload_no_store_calls).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_web::test]
async fn non_numeric_bodies_are_unprocessable() {
    let req = TestRequest::post()
        .uri("/api/user/orders")
        .cookie(access_cookie("alice"))
        .set_payload("not-a-number");
    let (status, _) = send(req, configure_upload_no_store_calls).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_web::test]
async fn an_empty_body_is_a_bad_request() {
    let req = TestRequest::post().uri("/api/user/orders").cookie(access_cookie("alice"));
    let (status, _) = send(req, configure_upload_no_store_calls).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn an_empty_order_list_is_no_content() {
    let req = TestRequest::get().uri("/api/user/orders").cookie(access_cookie("alice"));
    let (status, body) = send(req, configure_empty_list).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
}

#[actix_web::test]
async fn the_order_list_renders_accruals_and_statuses() {
    let req = TestRequest::get().uri("/api/user/orders").cookie(access_cookie("alice"));
    let (status, body) = send(req, configure_two_orders).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, ORDERS_JSON);
}

fn configure_upload_ok(cfg: &mut ServiceConfig) {
    let mut db = MockLedger::new();
    db.expect_submit_order().returning(|_, _| Ok(()));
    add_order_api(cfg, db);
}

fn configure_upload_duplicate(cfg: &mut ServiceConfig) {
    let mut db = MockLedger::new();
    db.expect_submit_order().returning(|order_id, _| Err(LedgerError::OrderIdNotUnique(order_id)));
    add_order_api(cfg, db);
}

fn configure_upload_foreign(cfg: &mut ServiceConfig) {
    let mut db = MockLedger::new();
    db.expect_submit_order().returning(|order_id, _| Err(LedgerError::OrderLoadedByAnotherUser(order_id)));
    add_order_api(cfg, db);
}

fn configure_upload_no_store_calls(cfg: &mut ServiceConfig) {
    add_order_api(cfg, MockLedger::new());
}

fn configure_empty_list(cfg: &mut ServiceConfig) {
    let mut db = MockLedger::new();
    db.expect_order_list().returning(|_| Ok(vec![]));
    cfg.app_data(web::Data::new(OrderApi::new(db, true)))
        .route("/api/user/orders", web::get().to(order_list::<MockLedger>));
}

fn configure_two_orders(cfg: &mut ServiceConfig) {
    let mut db = MockLedger::new();
    db.expect_order_list().returning(|_| Ok(orders_response()));
    cfg.app_data(web::Data::new(OrderApi::new(db, true)))
        .route("/api/user/orders", web::get().to(order_list::<MockLedger>));
}

fn add_order_api(cfg: &mut ServiceConfig, db: MockLedger) {
    cfg.app_data(web::Data::new(OrderApi::new(db, true)))
        .route("/api/user/orders", web::post().to(load_order::<MockLedger>));
}

// Mock response to the `order_list` call
fn orders_response() -> Vec<OrderRecord> {
    vec![
        OrderRecord {
            number: "79927398713".parse().unwrap(),
            status: OrderStatus::Processed,
            accrual: Points::from_points(500),
            uploaded_at: Utc.with_ymd_and_hms(2024, 5, 2, 11, 30, 0).unwrap(),
        },
        OrderRecord {
            number: "4532015112830366".parse().unwrap(),
            status: OrderStatus::New,
            accrual: Points::default(),
            uploaded_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
        },
    ]
}

const ORDERS_JSON: &str = r#"[{"number":"79927398713","status":"PROCESSED","accrual":500.0,"uploaded_at":"2024-05-02T11:30:00Z"},{"number":"4532015112830366","status":"NEW","uploaded_at":"2024-05-01T10:00:00Z"}]"#;
