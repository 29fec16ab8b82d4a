use lpg_common::{Points, Secret};
use serde::Deserialize;

/// Register/login request body.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub login: String,
    pub password: Secret<String>,
}

/// Withdrawal request body. The order number is a decimal string, the sum a fractional number of
/// points.
#[derive(Debug, Clone, Deserialize)]
pub struct WithdrawalRequest {
    pub order: String,
    pub sum: Points,
}
