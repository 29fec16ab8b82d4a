use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use lpg_common::Points;
use serde::{de::Error as DeError, Deserialize, Deserializer, Serialize, Serializer};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------        OrderId        -------------------------------------------------------
/// An order number as supplied by the end user: a positive integer of up to 19 decimal digits.
///
/// Order numbers are JSON strings on the wire, but integers in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type)]
#[sqlx(transparent)]
pub struct OrderId(i64);

#[derive(Debug, Clone, Error)]
#[error("{0} is not a valid order number")]
pub struct OrderIdError(String);

impl FromStr for OrderId {
    type Err = OrderIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim().parse::<i64>().map_err(|_| OrderIdError(s.to_string()))?;
        if id <= 0 {
            return Err(OrderIdError(s.to_string()));
        }
        Ok(Self(id))
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl OrderId {
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl Serialize for OrderId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for OrderId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

//--------------------------------------      OrderStatus      -------------------------------------------------------
/// The lifecycle state of an order. `New` is assigned on upload; `Processing` and `Invalid` are
/// reported by the accrual authority; `Processed` is terminal and accompanies an accrual.
///
/// The discriminants are the ids seeded into the `status_kinds` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "UPPERCASE")]
#[repr(i32)]
pub enum OrderStatus {
    New = 1,
    Processing = 2,
    Invalid = 3,
    Processed = 4,
}

impl OrderStatus {
    /// Terminal orders are never polled again and their status never changes.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Invalid | OrderStatus::Processed)
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::New => write!(f, "NEW"),
            OrderStatus::Processing => write!(f, "PROCESSING"),
            OrderStatus::Invalid => write!(f, "INVALID"),
            OrderStatus::Processed => write!(f, "PROCESSED"),
        }
    }
}

//--------------------------------------        Order          -------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
pub struct Order {
    pub id: OrderId,
    pub user_id: i64,
    pub uploaded_at: DateTime<Utc>,
}

//--------------------------------------     OrderRecord       -------------------------------------------------------
/// A single row of a user's order listing: the order number, its current status, the accrual
/// credited for it (zero until the order is `Processed`), and the upload time.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderRecord {
    pub number: OrderId,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Points::is_zero")]
    pub accrual: Points,
    pub uploaded_at: DateTime<Utc>,
}

//--------------------------------------   WithdrawalRecord    -------------------------------------------------------
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WithdrawalRecord {
    pub order: OrderId,
    pub sum: Points,
    pub processed_at: DateTime<Utc>,
}

//--------------------------------------     UserBalance       -------------------------------------------------------
/// The materialised balance aggregate for one user. `current` is always the total of `in` ledger
/// entries minus the total of `out` entries, and never negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, FromRow)]
pub struct UserBalance {
    pub current: Points,
    pub withdrawn: Points,
}
