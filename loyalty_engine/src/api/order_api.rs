use std::fmt::Debug;

use log::*;
use lpg_common::Points;

use crate::{
    api::OrderApiError,
    db_types::{OrderId, OrderRecord, UserBalance, WithdrawalRecord},
    helpers::luhn_valid,
    traits::{LedgerDatabase, LedgerQueries},
};

/// `OrderApi` is the policy layer between the HTTP handlers and the ledger store.
///
/// It applies the Luhn-10 gate to order numbers (when enabled) before anything reaches the store,
/// and otherwise delegates unchanged. It holds no per-order state between calls.
pub struct OrderApi<B> {
    db: B,
    check_order_id: bool,
}

impl<B: Debug> Debug for OrderApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderApi ({:?})", self.db)
    }
}

impl<B> OrderApi<B> {
    pub fn new(db: B, check_order_id: bool) -> Self {
        Self { db, check_order_id }
    }

    fn validate_order_id(&self, order_id: OrderId) -> Result<(), OrderApiError> {
        if self.check_order_id && !luhn_valid(order_id.value()) {
            debug!("🛃️ Order number [{order_id}] failed the checksum gate");
            return Err(OrderApiError::OrderFormat);
        }
        Ok(())
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderApi<B>
where B: LedgerDatabase
{
    /// Register an uploaded order number for `login`. The order starts out `New` and will be
    /// picked up by the accrual worker on its next sweep of pending orders.
    pub async fn load_order(&self, order_id: OrderId, login: &str) -> Result<(), OrderApiError> {
        self.validate_order_id(order_id)?;
        self.db.submit_order(order_id, login).await?;
        Ok(())
    }

    /// Spend `amount` of the user's points against a new order number.
    pub async fn withdraw_points(
        &self,
        login: &str,
        order_id: OrderId,
        amount: Points,
    ) -> Result<(), OrderApiError> {
        self.validate_order_id(order_id)?;
        if amount <= Points::default() {
            return Err(OrderApiError::InvalidAmount);
        }
        self.db.withdraw(login, order_id, amount).await?;
        Ok(())
    }
}

impl<B> OrderApi<B>
where B: LedgerQueries
{
    pub async fn order_list(&self, login: &str) -> Result<Vec<OrderRecord>, OrderApiError> {
        let orders = self.db.order_list(login).await?;
        Ok(orders)
    }

    pub async fn balance(&self, login: &str) -> Result<UserBalance, OrderApiError> {
        let balance = self.db.balance(login).await?;
        Ok(balance)
    }

    pub async fn withdrawals(&self, login: &str) -> Result<Vec<WithdrawalRecord>, OrderApiError> {
        let withdrawals = self.db.withdrawals(login).await?;
        Ok(withdrawals)
    }
}
