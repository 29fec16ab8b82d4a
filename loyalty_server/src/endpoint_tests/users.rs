use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use loyalty_engine::{traits::UserApiError, AuthApi};
use serde_json::json;

use super::{
    helpers::{send, send_raw, test_issuer},
    mocks::MockUserStore,
};
use crate::{
    auth::AUTH_COOKIE,
    routes::{login, register},
};

#[actix_web::test]
async fn registration_sets_a_valid_auth_cookie() {
    let req = TestRequest::post()
        .uri("/api/user/register")
        .set_json(json!({"login": "alice", "password": "s1"}));
    let res = send_raw(req, configure_register_ok).await;
    assert_eq!(res.status(), StatusCode::OK);
    let cookie = res.response().cookies().find(|c| c.name() == AUTH_COOKIE).expect("auth cookie missing");
    let claims = test_issuer().validate_token(cookie.value()).expect("cookie should hold a valid token");
    assert_eq!(claims.login, "alice");
}

#[actix_web::test]
async fn a_taken_login_is_a_conflict() {
    let req = TestRequest::post()
        .uri("/api/user/register")
        .set_json(json!({"login": "alice", "password": "s2"}));
    let (status, _) = send(req, configure_register_taken).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn malformed_registration_bodies_are_bad_requests() {
    let req = TestRequest::post().uri("/api/user/register").set_payload(r#"{"login":"#);
    let (status, _) = send(req, configure_register_ok).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn login_succeeds_with_the_right_password() {
    let req =
        TestRequest::post().uri("/api/user/login").set_json(json!({"login": "alice", "password": "s1"}));
    let res = send_raw(req, configure_login).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.response().cookies().any(|c| c.name() == AUTH_COOKIE));
}

#[actix_web::test]
async fn login_fails_with_the_wrong_password() {
    let req =
        TestRequest::post().uri("/api/user/login").set_json(json!({"login": "alice", "password": "nope"}));
    let (status, _) = send(req, configure_login).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn login_fails_for_an_unknown_user() {
    let req =
        TestRequest::post().uri("/api/user/login").set_json(json!({"login": "mallory", "password": "s1"}));
    let (status, _) = send(req, configure_login).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

fn configure_register_ok(cfg: &mut ServiceConfig) {
    let mut users = MockUserStore::new();
    users.expect_create_user().returning(|_, _| Ok(()));
    cfg.app_data(web::Data::new(AuthApi::new(users)))
        .route("/api/user/register", web::post().to(register::<MockUserStore>));
}

fn configure_register_taken(cfg: &mut ServiceConfig) {
    let mut users = MockUserStore::new();
    users.expect_create_user().returning(|login, _| Err(UserApiError::UserNotUnique(login.to_string())));
    cfg.app_data(web::Data::new(AuthApi::new(users)))
        .route("/api/user/register", web::post().to(register::<MockUserStore>));
}

// A store holding exactly one user, alice/s1.
fn configure_login(cfg: &mut ServiceConfig) {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(b"s1", &salt).expect("hashing failed").to_string();
    let mut users = MockUserStore::new();
    users.expect_fetch_password_hash().returning(move |login| {
        if login == "alice" {
            Ok(Some(hash.clone()))
        } else {
            Ok(None)
        }
    });
    cfg.app_data(web::Data::new(AuthApi::new(users)))
        .route("/api/user/login", web::post().to(login::<MockUserStore>));
}
