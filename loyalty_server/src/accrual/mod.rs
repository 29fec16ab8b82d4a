//! The accrual subsystem: a thin HTTP client for the external accrual authority, and the
//! background worker that drives pending orders through their status lifecycle.
pub mod client;
pub mod worker;

pub use client::{AccrualApi, AccrualClient, AccrualError, AccrualRecord, AccrualStatus};
pub use worker::start_accrual_worker;
