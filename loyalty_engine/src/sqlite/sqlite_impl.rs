//! `SqliteDatabase` is the concrete SQLite backend of the loyalty ledger.
//!
//! It implements every trait defined in the [`crate::traits`] module. Multi-row operations run
//! inside a single sqlx transaction; the low-level statements live in [`super::db`].
use std::fmt::Debug;

use chrono::Utc;
use log::*;
use lpg_common::Points;
use sqlx::SqlitePool;

use super::db::{ledger, new_pool, orders, users};
use crate::{
    db_types::{OrderId, OrderRecord, OrderStatus, UserBalance, WithdrawalRecord},
    traits::{LedgerDatabase, LedgerError, LedgerQueries, UserApiError, UserManagement},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates the connection pool and brings the schema up to date.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        sqlx::migrate!().run(&pool).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl UserManagement for SqliteDatabase {
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<(), UserApiError> {
        let mut conn = self.pool.acquire().await?;
        let _id = users::insert_user(login, password_hash, &mut conn).await?;
        Ok(())
    }

    async fn fetch_password_hash(&self, login: &str) -> Result<Option<String>, UserApiError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_password_hash(login, &mut conn).await
    }
}

impl LedgerDatabase for SqliteDatabase {
    async fn submit_order(&self, order_id: OrderId, login: &str) -> Result<(), LedgerError> {
        let mut tx = self.pool.begin().await?;
        let user_id = users::user_id_for_login(login, &mut tx).await?;
        orders::create_order_as_new(order_id, user_id, Utc::now(), &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order [{order_id}] accepted from {login}");
        Ok(())
    }

    /// Takes a withdrawal and, in a single atomic transaction,
    /// * debits the user's balance, failing with `OutOfBalance` if it does not cover `amount`,
    /// * creates the target order as `New` (with the same ownership semantics as `submit_order`),
    /// * appends the `out` ledger entry.
    ///
    /// Any failure rolls the whole transaction back, so the debit is never visible without its
    /// matching ledger entry and order row.
    async fn withdraw(&self, login: &str, order_id: OrderId, amount: Points) -> Result<(), LedgerError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let user_id = users::user_id_for_login(login, &mut tx).await?;
        if !ledger::debit_balance(user_id, amount, &mut tx).await? {
            return Err(LedgerError::OutOfBalance);
        }
        orders::create_order_as_new(order_id, user_id, now, &mut tx).await?;
        ledger::insert_ledger_entry(order_id, user_id, false, amount, now, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ {login} withdrew {amount} against order [{order_id}]");
        Ok(())
    }

    /// Credits an accrual and, in the same transaction, marks the order `Processed`.
    ///
    /// An order that already carries its `in` entry is left untouched: the accrual authority may
    /// legitimately report a terminal order more than once.
    async fn accrue(&self, order_id: OrderId, amount: Points) -> Result<(), LedgerError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let user_id = users::user_id_for_order(order_id, &mut tx)
            .await?
            .ok_or(LedgerError::OrderNotFound(order_id))?;
        if ledger::has_accrual_entry(order_id, &mut tx).await? {
            warn!("🗃️ Order [{order_id}] has already been credited. Skipping.");
            return Ok(());
        }
        ledger::credit_balance(user_id, amount, &mut tx).await?;
        ledger::insert_ledger_entry(order_id, user_id, true, amount, now, &mut tx).await?;
        orders::set_order_status(order_id, OrderStatus::Processed, now, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Credited {amount} to user #{user_id} for order [{order_id}]");
        Ok(())
    }

    async fn set_status(&self, order_id: OrderId, status: OrderStatus) -> Result<(), LedgerError> {
        let mut tx = self.pool.begin().await?;
        orders::set_order_status(order_id, status, Utc::now(), &mut tx).await?;
        tx.commit().await?;
        trace!("🗃️ Order [{order_id}] is now {status}");
        Ok(())
    }

    async fn pending_orders(&self) -> Result<Vec<OrderId>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        orders::pending_orders(&mut conn).await
    }

    async fn close(&mut self) -> Result<(), LedgerError> {
        self.pool.close().await;
        Ok(())
    }
}

impl LedgerQueries for SqliteDatabase {
    async fn order_list(&self, login: &str) -> Result<Vec<OrderRecord>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        orders::order_list(login, &mut conn).await
    }

    async fn balance(&self, login: &str) -> Result<UserBalance, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        ledger::user_balance(login, &mut conn).await
    }

    async fn withdrawals(&self, login: &str) -> Result<Vec<WithdrawalRecord>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        ledger::withdrawals(login, &mut conn).await
    }
}
