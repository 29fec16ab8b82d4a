use chrono::{DateTime, Utc};
use lpg_common::Points;
use sqlx::SqliteConnection;

use crate::{
    db_types::{OrderId, UserBalance, WithdrawalRecord},
    traits::LedgerError,
};

/// Debits `amount` from the user's balance, guarding against overdraw in the same statement.
/// Returns `false` when the balance row is missing or does not cover the amount; SQLite's writer
/// lock serialises concurrent debits, so the loser of a race observes the debited balance.
pub async fn debit_balance(
    user_id: i64,
    amount: Points,
    conn: &mut SqliteConnection,
) -> Result<bool, LedgerError> {
    let result = sqlx::query(
        r#"
        UPDATE users_current_points
        SET points_out = points_out + $1,
            balance = balance - $1,
            updated_at = CURRENT_TIMESTAMP
        WHERE user_id = $2 AND balance >= $1
        "#,
    )
    .bind(amount)
    .bind(user_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Credits `amount` to the user's balance, creating the balance row on first accrual.
pub async fn credit_balance(
    user_id: i64,
    amount: Points,
    conn: &mut SqliteConnection,
) -> Result<(), LedgerError> {
    sqlx::query(
        r#"
        INSERT INTO users_current_points (user_id, points_in, points_out, balance)
        VALUES ($1, $2, 0, $2)
        ON CONFLICT (user_id)
        DO UPDATE SET points_in = users_current_points.points_in + $2,
                      balance = users_current_points.balance + $2,
                      updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(user_id)
    .bind(amount)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn insert_ledger_entry(
    order_id: OrderId,
    user_id: i64,
    flow_in: bool,
    amount: Points,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), LedgerError> {
    sqlx::query(
        "INSERT INTO orders_points (date_time, order_id, user_id, flow_in, points) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(at)
    .bind(order_id)
    .bind(user_id)
    .bind(flow_in)
    .bind(amount)
    .execute(conn)
    .await?;
    Ok(())
}

/// Whether the order already has its (single permitted) accrual entry.
pub async fn has_accrual_entry(order_id: OrderId, conn: &mut SqliteConnection) -> Result<bool, LedgerError> {
    let exists: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM orders_points WHERE order_id = $1 AND flow_in = 1 LIMIT 1")
            .bind(order_id)
            .fetch_optional(conn)
            .await?;
    Ok(exists.is_some())
}

/// The balance aggregate for `login`. Users without any ledger activity get zeroes.
pub async fn user_balance(login: &str, conn: &mut SqliteConnection) -> Result<UserBalance, LedgerError> {
    let balance = sqlx::query_as(
        r#"
        SELECT COALESCE(p.balance, 0) AS current,
               COALESCE(p.points_out, 0) AS withdrawn
        FROM users u
            LEFT JOIN users_current_points p ON p.user_id = u.id
        WHERE u.login = $1
        "#,
    )
    .bind(login)
    .fetch_optional(conn)
    .await?;
    Ok(balance.unwrap_or_default())
}

/// Every `out` ledger entry for `login`, oldest first.
pub async fn withdrawals(login: &str, conn: &mut SqliteConnection) -> Result<Vec<WithdrawalRecord>, LedgerError> {
    let records = sqlx::query_as(
        r#"
        SELECT op.order_id AS "order",
               op.points AS sum,
               op.date_time AS processed_at
        FROM orders_points op
            INNER JOIN users ON op.user_id = users.id
        WHERE users.login = $1 AND op.flow_in = 0
        ORDER BY op.date_time ASC
        "#,
    )
    .bind(login)
    .fetch_all(conn)
    .await?;
    Ok(records)
}
