use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use loyalty_engine::{
    db_types::{OrderId, UserBalance, WithdrawalRecord},
    traits::LedgerError,
    OrderApi,
};
use lpg_common::Points;
use mockall::predicate::eq;
use serde_json::json;

use super::{
    helpers::{access_cookie, send},
    mocks::MockLedger,
};
use crate::routes::{balance, withdraw, withdrawals};

#[actix_web::test]
async fn the_balance_is_rendered_as_fractional_points() {
    let req = TestRequest::get().uri("/api/user/balance").cookie(access_cookie("alice"));
    let (status, body) = send(req, configure_balance).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"current":500.5,"withdrawn":42.0}"#);
}

#[actix_web::test]
async fn balance_requires_authentication() {
    let req = TestRequest::get().uri("/api/user/balance");
    let (status, _) = send(req, configure_balance).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn a_withdrawal_debits_the_given_order_and_sum() {
    let req = TestRequest::post()
        .uri("/api/user/balance/withdraw")
        .cookie(access_cookie("alice"))
        .set_json(json!({"order": "4532015112830366", "sum": 200}));
    let (status, _) = send(req, configure_withdraw_ok).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn an_uncovered_withdrawal_is_payment_required() {
    let req = TestRequest::post()
        .uri("/api/user/balance/withdraw")
        .cookie(access_cookie("alice"))
        .set_json(json!({"order": "4532015112830366", "sum": 1000}));
    let (status, _) = send(req, configure_withdraw_broke).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
}

#[actix_web::test]
async fn withdrawing_against_a_foreign_order_is_a_conflict() {
    let req = TestRequest::post()
        .uri("/api/user/balance/withdraw")
        .cookie(access_cookie("alice"))
        .set_json(json!({"order": "4532015112830366", "sum": 10}));
    let (status, _) = send(req, configure_withdraw_foreign).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn withdrawal_orders_pass_the_checksum_gate() {
    let req = TestRequest::post()
        .uri("/api/user/balance/withdraw")
        .cookie(access_cookie("alice"))
        .set_json(json!({"order": "12345", "sum": 10}));
    let (status, _) = send(req, configure_withdraw_no_store_calls).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_web::test]
async fn non_positive_sums_are_unprocessable() {
    let req = TestRequest::post()
        .uri("/api/user/balance/withdraw")
        .cookie(access_cookie("alice"))
        .set_json(json!({"order": "79927398713", "sum": -5}));
    let (status, _) = send(req, configure_withdraw_no_store_calls).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_web::test]
async fn an_empty_withdrawal_history_is_no_content() {
    let req = TestRequest::get().uri("/api/user/withdrawals").cookie(access_cookie("alice"));
    let (status, body) = send(req, configure_no_withdrawals).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
}

#[actix_web::test]
async fn the_withdrawal_history_lists_out_entries() {
    let req = TestRequest::get().uri("/api/user/withdrawals").cookie(access_cookie("alice"));
    let (status, body) = send(req, configure_one_withdrawal).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        r#"[{"order":"4532015112830366","sum":200.0,"processed_at":"2024-05-03T09:15:00Z"}]"#
    );
}

fn configure_balance(cfg: &mut ServiceConfig) {
    let mut db = MockLedger::new();
    db.expect_balance().returning(|_| {
        Ok(UserBalance { current: Points::try_from(500.5).unwrap(), withdrawn: Points::from_points(42) })
    });
    cfg.app_data(web::Data::new(OrderApi::new(db, true)))
        .route("/api/user/balance", web::get().to(balance::<MockLedger>));
}

fn configure_withdraw_ok(cfg: &mut ServiceConfig) {
    let mut db = MockLedger::new();
    let order_id = "4532015112830366".parse::<OrderId>().unwrap();
    db.expect_withdraw()
        .with(eq("alice"), eq(order_id), eq(Points::from_points(200)))
        .times(1)
        .returning(|_, _, _| Ok(()));
    add_withdraw_route(cfg, db);
}

fn configure_withdraw_broke(cfg: &mut ServiceConfig) {
    let mut db = MockLedger::new();
    db.expect_withdraw().returning(|_, _, _| Err(LedgerError::OutOfBalance));
    add_withdraw_route(cfg, db);
}

fn configure_withdraw_foreign(cfg: &mut ServiceConfig) {
    let mut db = MockLedger::new();
    db.expect_withdraw().returning(|_, order_id, _| Err(LedgerError::OrderLoadedByAnotherUser(order_id)));
    add_withdraw_route(cfg, db);
}

fn configure_withdraw_no_store_calls(cfg: &mut ServiceConfig) {
    add_withdraw_route(cfg, MockLedger::new());
}

fn configure_no_withdrawals(cfg: &mut ServiceConfig) {
    let mut db = MockLedger::new();
    db.expect_withdrawals().returning(|_| Ok(vec![]));
    cfg.app_data(web::Data::new(OrderApi::new(db, true)))
        .route("/api/user/withdrawals", web::get().to(withdrawals::<MockLedger>));
}

fn configure_one_withdrawal(cfg: &mut ServiceConfig) {
    let mut db = MockLedger::new();
    db.expect_withdrawals().returning(|_| {
        Ok(vec![WithdrawalRecord {
            order: "4532015112830366".parse().unwrap(),
            sum: Points::from_points(200),
            processed_at: Utc.with_ymd_and_hms(2024, 5, 3, 9, 15, 0).unwrap(),
        }])
    });
    cfg.app_data(web::Data::new(OrderApi::new(db, true)))
        .route("/api/user/withdrawals", web::get().to(withdrawals::<MockLedger>));
}

fn add_withdraw_route(cfg: &mut ServiceConfig, db: MockLedger) {
    cfg.app_data(web::Data::new(OrderApi::new(db, true)))
        .route("/api/user/balance/withdraw", web::post().to(withdraw::<MockLedger>));
}
