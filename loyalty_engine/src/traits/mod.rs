//! Backend interface contracts for the loyalty ledger.
//!
//! The traits in this module define the behaviour a storage backend must expose to support the
//! gateway:
//!
//! * [`LedgerDatabase`] is the command side: order submission, withdrawals, accruals and status
//!   transitions, each executed as a single atomic transaction.
//! * [`LedgerQueries`] is the query side: order listings, balances and withdrawal histories.
//! * [`UserManagement`] covers user records and stored password hashes.
//!
//! The accrual worker and the HTTP handlers only ever see these traits, which keeps them testable
//! against mock backends.
mod ledger_database;
mod ledger_queries;
mod user_management;

pub use ledger_database::{LedgerDatabase, LedgerError};
pub use ledger_queries::LedgerQueries;
pub use user_management::{UserApiError, UserManagement};
