use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{OrderId, OrderRecord, OrderStatus},
    sqlite::db::is_unique_violation,
    traits::LedgerError,
};

/// How many pending orders a single worker sweep picks up.
const PENDING_ORDERS_LIMIT: i64 = 1000;

/// Inserts a new order with status `New`, appending the matching history entry.
///
/// The insert runs inside an inner savepoint so that a unique-violation probe does not poison the
/// caller's transaction. On a collision the existing row's owner decides the error: the same user
/// gets [`LedgerError::OrderIdNotUnique`], anyone else [`LedgerError::OrderLoadedByAnotherUser`].
pub async fn create_order_as_new(
    order_id: OrderId,
    user_id: i64,
    uploaded_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), LedgerError> {
    sqlx::query("SAVEPOINT new_order").execute(&mut *conn).await?;
    let inserted = sqlx::query("INSERT INTO orders (id, user_id, uploaded_at) VALUES ($1, $2, $3)")
        .bind(order_id)
        .bind(user_id)
        .bind(uploaded_at)
        .execute(&mut *conn)
        .await;
    match inserted {
        Ok(_) => {
            sqlx::query("RELEASE SAVEPOINT new_order").execute(&mut *conn).await?;
        },
        Err(e) if is_unique_violation(&e) => {
            sqlx::query("ROLLBACK TO SAVEPOINT new_order").execute(&mut *conn).await?;
            let owner: i64 = sqlx::query_scalar("SELECT user_id FROM orders WHERE id = $1")
                .bind(order_id)
                .fetch_one(&mut *conn)
                .await?;
            return if owner == user_id {
                Err(LedgerError::OrderIdNotUnique(order_id))
            } else {
                Err(LedgerError::OrderLoadedByAnotherUser(order_id))
            };
        },
        Err(e) => return Err(e.into()),
    }
    debug!("📝️ Order [{order_id}] recorded for user #{user_id}");
    set_order_status(order_id, OrderStatus::New, uploaded_at, conn).await
}

/// Appends a history entry and moves the order's current status, in lock-step.
pub async fn set_order_status(
    order_id: OrderId,
    status: OrderStatus,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), LedgerError> {
    sqlx::query("INSERT INTO history_statuses (date_time, order_id, status_id) VALUES ($1, $2, $3)")
        .bind(at)
        .bind(order_id)
        .bind(status)
        .execute(&mut *conn)
        .await?;
    sqlx::query(
        r#"
        INSERT INTO current_statuses (order_id, status_id, date_time)
        VALUES ($1, $2, $3)
        ON CONFLICT (order_id)
        DO UPDATE SET status_id = $2, date_time = $3
        "#,
    )
    .bind(order_id)
    .bind(status)
    .bind(at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Order ids whose current status is `New` or `Processing`, oldest first.
pub async fn pending_orders(conn: &mut SqliteConnection) -> Result<Vec<OrderId>, LedgerError> {
    let ids = sqlx::query_scalar(
        r#"
        SELECT order_id FROM current_statuses
        WHERE status_id IN ($1, $2)
        ORDER BY date_time ASC
        LIMIT $3
        "#,
    )
    .bind(OrderStatus::New)
    .bind(OrderStatus::Processing)
    .bind(PENDING_ORDERS_LIMIT)
    .fetch_all(conn)
    .await?;
    Ok(ids)
}

/// Every order uploaded by `login`, newest upload first, with the accrual credited for it (zero
/// until the order is processed).
pub async fn order_list(login: &str, conn: &mut SqliteConnection) -> Result<Vec<OrderRecord>, LedgerError> {
    let records = sqlx::query_as(
        r#"
        SELECT orders.id AS number,
               current_statuses.status_id AS status,
               COALESCE(accruals.points, 0) AS accrual,
               orders.uploaded_at AS uploaded_at
        FROM orders
            INNER JOIN users ON orders.user_id = users.id
            INNER JOIN current_statuses ON orders.id = current_statuses.order_id
            LEFT JOIN orders_points accruals ON orders.id = accruals.order_id AND accruals.flow_in = 1
        WHERE users.login = $1
        ORDER BY orders.uploaded_at DESC
        "#,
    )
    .bind(login)
    .fetch_all(conn)
    .await?;
    Ok(records)
}
