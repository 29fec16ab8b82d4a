use log::*;
use loyalty_engine::db_types::OrderId;
use lpg_common::Points;
use reqwest::{header::RETRY_AFTER, Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;

/// The status an order has with the accrual authority. `Registered` means the authority knows the
/// order but has not started working on it; the other three map directly onto the ledger's order
/// statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccrualStatus {
    Registered,
    Processing,
    Invalid,
    Processed,
}

/// One decoded response from the accrual authority. `accrual` is absent for non-terminal orders.
#[derive(Debug, Clone, Deserialize)]
pub struct AccrualRecord {
    pub order: OrderId,
    pub status: AccrualStatus,
    #[serde(default)]
    pub accrual: Points,
}

#[derive(Debug, Error)]
pub enum AccrualError {
    #[error("The accrual authority is rate limiting requests (retry after {retry_after}s)")]
    TooManyRequests { retry_after: u64 },
    #[error("The order is not registered with the accrual authority")]
    OrderNotRegistered,
    #[error("Accrual authority transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Unexpected response status from the accrual authority: {0}")]
    UnexpectedStatus(StatusCode),
}

/// The single operation the worker needs from the accrual authority.
#[allow(async_fn_in_trait)]
pub trait AccrualApi {
    async fn fetch(&self, order_id: OrderId) -> Result<AccrualRecord, AccrualError>;
}

pub struct AccrualClient {
    client: Client,
    base_url: String,
}

impl AccrualClient {
    /// `base` may omit the scheme, in which case plain http is assumed.
    pub fn new(base: &str) -> Self {
        let client = Client::new();
        Self { client, base_url: normalize_base_url(base) }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl AccrualApi for AccrualClient {
    async fn fetch(&self, order_id: OrderId) -> Result<AccrualRecord, AccrualError> {
        let url = format!("{}/api/orders/{order_id}", self.base_url);
        trace!("🔎️ Fetching accrual state from {url}");
        let response = self.client.get(&url).send().await?;
        match response.status() {
            StatusCode::OK => {
                let record = response.json::<AccrualRecord>().await?;
                trace!("🔎️ Order [{}] is {:?} upstream", record.order, record.status);
                Ok(record)
            },
            StatusCode::NO_CONTENT => Err(AccrualError::OrderNotRegistered),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = parse_retry_after(
                    response.headers().get(RETRY_AFTER).and_then(|v| v.to_str().ok()),
                );
                Err(AccrualError::TooManyRequests { retry_after })
            },
            status => Err(AccrualError::UnexpectedStatus(status)),
        }
    }
}

fn normalize_base_url(base: &str) -> String {
    let trimmed = base.trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

/// `Retry-After` as a whole second count. Anything missing or unparsable becomes 0, which the
/// worker treats as "use the default pause".
fn parse_retry_after(header: Option<&str>) -> u64 {
    header.and_then(|v| v.trim().parse::<u64>().ok()).unwrap_or(0)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn base_urls_get_a_scheme_when_missing() {
        assert_eq!(normalize_base_url("localhost:8181"), "http://localhost:8181");
        assert_eq!(normalize_base_url("http://accrual:9090/"), "http://accrual:9090");
        assert_eq!(normalize_base_url("https://accrual.example.com"), "https://accrual.example.com");
    }

    #[test]
    fn retry_after_parses_defensively() {
        assert_eq!(parse_retry_after(Some("2")), 2);
        assert_eq!(parse_retry_after(Some(" 60 ")), 60);
        assert_eq!(parse_retry_after(Some("soon")), 0);
        assert_eq!(parse_retry_after(Some("-1")), 0);
        assert_eq!(parse_retry_after(None), 0);
    }

    #[test]
    fn responses_decode_with_and_without_an_accrual() {
        let record: AccrualRecord =
            serde_json::from_str(r#"{"order":"79927398713","status":"PROCESSED","accrual":729.98}"#).unwrap();
        assert_eq!(record.order, "79927398713".parse().unwrap());
        assert_eq!(record.status, AccrualStatus::Processed);
        assert_eq!(record.accrual, Points::try_from(729.98).unwrap());

        let record: AccrualRecord =
            serde_json::from_str(r#"{"order":"79927398713","status":"REGISTERED"}"#).unwrap();
        assert_eq!(record.status, AccrualStatus::Registered);
        assert!(record.accrual.is_zero());
    }

    #[test]
    fn unknown_statuses_fail_to_decode() {
        let result = serde_json::from_str::<AccrualRecord>(r#"{"order":"1","status":"EXPLODED"}"#);
        assert!(result.is_err());
    }
}
