use actix_web::{
    cookie::Cookie,
    dev::ServiceResponse,
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use lpg_common::Secret;

use crate::{
    auth::{TokenIssuer, AUTH_COOKIE},
    config::AuthConfig,
};

// A fixed signing config for tests. DO NOT re-use this secret anywhere.
pub fn test_auth_config() -> AuthConfig {
    AuthConfig { jwt_secret: Secret::new(b"test-signing-secret-do-not-reuse".to_vec()), ephemeral: false }
}

pub fn test_issuer() -> TokenIssuer {
    TokenIssuer::new(&test_auth_config())
}

/// A valid access cookie for the given login, signed with the test secret.
pub fn access_cookie(login: &str) -> Cookie<'static> {
    let token = test_issuer().issue_token(login, None).expect("could not issue test token");
    Cookie::new(AUTH_COOKIE, token)
}

/// Runs a single request against an app built from `configure`, returning the raw response.
pub async fn send_raw(req: TestRequest, configure: fn(&mut ServiceConfig)) -> ServiceResponse {
    let _ = env_logger::try_init();
    let app = App::new().app_data(web::Data::new(test_issuer())).configure(configure);
    let service = test::init_service(app).await;
    test::call_service(&service, req.to_request()).await
}

/// As [`send_raw`], but reduced to the status code and the UTF-8 body.
pub async fn send(req: TestRequest, configure: fn(&mut ServiceConfig)) -> (StatusCode, String) {
    let res = send_raw(req, configure).await;
    let status = res.status();
    let body = test::read_body(res).await;
    (status, String::from_utf8_lossy(&body).into_owned())
}
