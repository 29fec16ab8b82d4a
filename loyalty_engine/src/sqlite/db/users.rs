use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::OrderId,
    sqlite::db::is_unique_violation,
    traits::{LedgerError, UserApiError},
};

pub async fn insert_user(
    login: &str,
    password_hash: &str,
    conn: &mut SqliteConnection,
) -> Result<i64, UserApiError> {
    let result = sqlx::query_scalar("INSERT INTO users (login, password) VALUES ($1, $2) RETURNING id")
        .bind(login)
        .bind(password_hash)
        .fetch_one(conn)
        .await;
    match result {
        Ok(id) => {
            debug!("🧑️ User {login} created with id {id}");
            Ok(id)
        },
        Err(e) if is_unique_violation(&e) => Err(UserApiError::UserNotUnique(login.to_string())),
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_password_hash(
    login: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<String>, UserApiError> {
    let hash = sqlx::query_scalar("SELECT password FROM users WHERE login = $1")
        .bind(login)
        .fetch_optional(conn)
        .await?;
    Ok(hash)
}

/// Resolves a login to its internal user id. Callers on the write path have already authenticated
/// the login, so a miss is a backend inconsistency rather than a user error.
pub async fn user_id_for_login(login: &str, conn: &mut SqliteConnection) -> Result<i64, LedgerError> {
    let id: Option<i64> =
        sqlx::query_scalar("SELECT id FROM users WHERE login = $1").bind(login).fetch_optional(conn).await?;
    id.ok_or_else(|| LedgerError::UserNotFound(login.to_string()))
}

pub async fn user_id_for_order(
    order_id: OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<i64>, LedgerError> {
    let id = sqlx::query_scalar("SELECT user_id FROM orders WHERE id = $1")
        .bind(order_id)
        .fetch_optional(conn)
        .await?;
    Ok(id)
}
