use thiserror::Error;

use crate::traits::LedgerError;

#[derive(Debug, Clone, Error)]
pub enum OrderApiError {
    #[error("The order number failed checksum validation")]
    OrderFormat,
    #[error("The withdrawal amount must be positive")]
    InvalidAmount,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
