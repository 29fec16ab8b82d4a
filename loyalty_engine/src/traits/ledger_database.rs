use lpg_common::Points;
use thiserror::Error;

use crate::db_types::{OrderId, OrderStatus};

/// The command side of the loyalty ledger.
///
/// Every method that touches more than one row runs in a single transaction: a failure anywhere
/// leaves no partial state behind. Balance arithmetic is never reconciled after the fact — the
/// `balance = Σ in − Σ out` invariant is maintained inside each `withdraw`/`accrue` transaction.
#[allow(async_fn_in_trait)]
pub trait LedgerDatabase {
    /// Record a new order for `login` with status `New` and a matching history entry.
    ///
    /// Submitting an order number that is already on file fails with
    /// [`LedgerError::OrderIdNotUnique`] when `login` owns it, and with
    /// [`LedgerError::OrderLoadedByAnotherUser`] when someone else does. Neither case leaves a
    /// duplicate order or history row behind.
    async fn submit_order(&self, order_id: OrderId, login: &str) -> Result<(), LedgerError>;

    /// Debit `amount` from the user's balance and record the spend against a fresh order.
    ///
    /// In one transaction: the balance row is checked and debited (losers of a concurrent race
    /// observe the already-debited balance), the order is created as in
    /// [`submit_order`](Self::submit_order), and an `out` ledger entry is appended. A failed order
    /// insert rolls the debit back.
    async fn withdraw(&self, login: &str, order_id: OrderId, amount: Points) -> Result<(), LedgerError>;

    /// Credit an accrual reported by the accrual authority and mark the order `Processed`.
    ///
    /// At most one `in` ledger entry ever exists per order; re-applying an accrual to an already
    /// credited order is a no-op, so repeated polling cannot double-credit.
    async fn accrue(&self, order_id: OrderId, amount: Points) -> Result<(), LedgerError>;

    /// Transition the order's current status, appending to the status history.
    async fn set_status(&self, order_id: OrderId, status: OrderStatus) -> Result<(), LedgerError>;

    /// Up to 1000 order ids whose current status is `New` or `Processing`, oldest first.
    ///
    /// This query is the accrual worker's sole work source; terminal transitions remove orders
    /// from it automatically.
    async fn pending_orders(&self) -> Result<Vec<OrderId>, LedgerError>;

    /// Close the backend connection.
    async fn close(&mut self) -> Result<(), LedgerError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Ledger database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} has already been uploaded by this user")]
    OrderIdNotUnique(OrderId),
    #[error("Order {0} has been uploaded by another user")]
    OrderLoadedByAnotherUser(OrderId),
    #[error("The balance does not cover the requested withdrawal")]
    OutOfBalance,
    #[error("The order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("No user with login {0} exists")]
    UserNotFound(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}
