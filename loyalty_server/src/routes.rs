//! Request handler definitions
//!
//! Handlers are generic over the backend traits so that the endpoint tests can run them against
//! mock stores. They do no recovery of their own: every error kind is translated into an HTTP
//! status by [`ServerError`](crate::errors::ServerError); the only special case is an order
//! re-uploaded by its own user, which is a success (200) rather than a conflict.
use actix_web::{cookie::Cookie, get, web, HttpResponse, Responder};
use log::*;
use loyalty_engine::{
    db_types::OrderId,
    traits::{LedgerDatabase, LedgerError, LedgerQueries, UserManagement},
    AuthApi, OrderApi, OrderApiError,
};

use crate::{
    auth::{JwtClaims, TokenIssuer, AUTH_COOKIE},
    data_objects::{Credentials, WithdrawalRequest},
    errors::ServerError,
};

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

// ----------------------------------------------   Users   ----------------------------------------------------
pub async fn register<B: UserManagement>(
    api: web::Data<AuthApi<B>>,
    signer: web::Data<TokenIssuer>,
    body: web::Json<Credentials>,
) -> Result<HttpResponse, ServerError> {
    let Credentials { login, password } = body.into_inner();
    api.register_user(&login, password.reveal()).await?;
    let token = signer.issue_token(&login, None)?;
    debug!("💻️ New user {login} registered and logged in");
    Ok(HttpResponse::Ok().cookie(auth_cookie(token)).finish())
}

pub async fn login<B: UserManagement>(
    api: web::Data<AuthApi<B>>,
    signer: web::Data<TokenIssuer>,
    body: web::Json<Credentials>,
) -> Result<HttpResponse, ServerError> {
    let Credentials { login, password } = body.into_inner();
    if !api.verify_user(&login, password.reveal()).await? {
        debug!("💻️ Failed login attempt for {login}");
        return Err(ServerError::Unauthenticated("invalid login/password pair".to_string()));
    }
    let token = signer.issue_token(&login, None)?;
    Ok(HttpResponse::Ok().cookie(auth_cookie(token)).finish())
}

// ----------------------------------------------   Orders  ----------------------------------------------------
/// The upload body is the raw decimal order number, not JSON.
pub async fn load_order<B: LedgerDatabase>(
    claims: JwtClaims,
    api: web::Data<OrderApi<B>>,
    body: web::Bytes,
) -> Result<HttpResponse, ServerError> {
    let raw = String::from_utf8(body.to_vec())
        .map_err(|_| ServerError::InvalidRequestBody("the order number must be plain text".to_string()))?;
    if raw.trim().is_empty() {
        return Err(ServerError::InvalidRequestBody("empty order number".to_string()));
    }
    let order_id = raw.parse::<OrderId>().map_err(|_| ServerError::InvalidOrderFormat)?;
    debug!("💻️ {} uploads order [{order_id}]", claims.login);
    match api.load_order(order_id, &claims.login).await {
        Ok(()) => Ok(HttpResponse::Accepted().finish()),
        // Re-uploading your own order is idempotent, not a conflict.
        Err(OrderApiError::Ledger(LedgerError::OrderIdNotUnique(_))) => Ok(HttpResponse::Ok().finish()),
        Err(e) => Err(e.into()),
    }
}

pub async fn order_list<B: LedgerQueries>(
    claims: JwtClaims,
    api: web::Data<OrderApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let orders = api.order_list(&claims.login).await?;
    if orders.is_empty() {
        return Ok(HttpResponse::NoContent().finish());
    }
    Ok(HttpResponse::Ok().json(orders))
}

// ----------------------------------------------   Balance  ---------------------------------------------------
pub async fn balance<B: LedgerQueries>(
    claims: JwtClaims,
    api: web::Data<OrderApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let balance = api.balance(&claims.login).await?;
    Ok(HttpResponse::Ok().json(balance))
}

pub async fn withdraw<B: LedgerDatabase>(
    claims: JwtClaims,
    api: web::Data<OrderApi<B>>,
    body: web::Json<WithdrawalRequest>,
) -> Result<HttpResponse, ServerError> {
    let WithdrawalRequest { order, sum } = body.into_inner();
    let order_id = order.parse::<OrderId>().map_err(|_| ServerError::InvalidOrderFormat)?;
    debug!("💻️ {} withdraws {sum} against order [{order_id}]", claims.login);
    api.withdraw_points(&claims.login, order_id, sum).await?;
    Ok(HttpResponse::Ok().finish())
}

pub async fn withdrawals<B: LedgerQueries>(
    claims: JwtClaims,
    api: web::Data<OrderApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let withdrawals = api.withdrawals(&claims.login).await?;
    if withdrawals.is_empty() {
        return Ok(HttpResponse::NoContent().finish());
    }
    Ok(HttpResponse::Ok().json(withdrawals))
}

fn auth_cookie(token: String) -> Cookie<'static> {
    Cookie::build(AUTH_COOKIE, token).path("/").http_only(true).finish()
}
