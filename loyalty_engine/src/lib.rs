//! Loyalty Points Engine
//!
//! The engine owns the durable ledger of the loyalty gateway: users, orders, order status
//! history, and the append-only points ledger with its materialised per-user balance.
//!
//! The library is divided into two main sections:
//! 1. Database management and control. SQLite is the supported backend. You should never need to
//!    access the database directly; use the public APIs instead. The exception is the data types
//!    used in the database, which are defined in the `db_types` module and are public.
//! 2. The policy APIs. [`OrderApi`] applies the order-number checksum gate and routes uploads,
//!    withdrawals and ledger queries into the store; [`AuthApi`] handles password hashing and
//!    verification on top of the user store.
//!
//! The backend is abstracted behind the traits in [`traits`], so the HTTP layer and the accrual
//! worker can be tested against mock stores.
mod api;
mod sqlite;

pub mod db_types;
pub mod helpers;
pub mod traits;

pub use api::{AuthApi, OrderApi, OrderApiError};
pub use sqlite::SqliteDatabase;
