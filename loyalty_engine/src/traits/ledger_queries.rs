use crate::{
    db_types::{OrderRecord, UserBalance, WithdrawalRecord},
    traits::LedgerError,
};

/// Read-only views over the ledger, scoped to a single login.
#[allow(async_fn_in_trait)]
pub trait LedgerQueries {
    /// All orders uploaded by `login`, newest upload first. The `accrual` field of each row is the
    /// order's sole `in` ledger entry, or zero if none exists yet.
    async fn order_list(&self, login: &str) -> Result<Vec<OrderRecord>, LedgerError>;

    /// The user's current balance and lifetime withdrawn total. A user with no ledger activity
    /// has a zero balance rather than no balance.
    async fn balance(&self, login: &str) -> Result<UserBalance, LedgerError>;

    /// All `out` ledger entries for `login`, oldest first.
    async fn withdrawals(&self, login: &str) -> Result<Vec<WithdrawalRecord>, LedgerError>;
}
