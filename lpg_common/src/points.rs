use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Neg, Sub, SubAssign},
};

use serde::{de::Error as DeError, Deserialize, Deserializer, Serialize, Serializer};
use sqlx::Type;
use thiserror::Error;

use crate::op;

//--------------------------------------       Points        ---------------------------------------------------------
/// A loyalty-points amount, stored as an integer number of centi-points (hundredths of a point).
///
/// The accrual authority and the client-facing JSON carry fractional point values, so `Points`
/// serialises as a plain JSON number (`729.98`), but all arithmetic and storage is integer to keep
/// ledger sums exact.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd)]
#[sqlx(transparent)]
pub struct Points(i64);

op!(binary Points, Add, add);
op!(binary Points, Sub, sub);
op!(inplace Points, SubAssign, sub_assign);
op!(unary Points, Neg, neg);

impl Sum for Points {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in points: {0}")]
pub struct PointsConversionError(String);

impl From<i64> for Points {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Points {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Points {}

impl TryFrom<f64> for Points {
    type Error = PointsConversionError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(PointsConversionError(format!("{value} is not a finite number")));
        }
        let centi = (value * 100.0).round();
        if centi.abs() > i64::MAX as f64 {
            return Err(PointsConversionError(format!("{value} is out of range")));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(centi as i64))
    }
}

impl Display for Points {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:0.2}pts", self.as_points())
    }
}

impl Points {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Whole points, e.g. `Points::from_points(500)` is 500.00 points.
    pub fn from_points(points: i64) -> Self {
        Self(points * 100)
    }

    pub fn as_points(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Serialize for Points {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_points())
    }
}

impl<'de> Deserialize<'de> for Points {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Points::try_from(value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn conversion_rounds_to_centi_points() {
        assert_eq!(Points::try_from(729.98).unwrap().value(), 72998);
        assert_eq!(Points::try_from(500.0).unwrap(), Points::from_points(500));
        assert_eq!(Points::try_from(0.004).unwrap().value(), 0);
        assert!(Points::try_from(f64::NAN).is_err());
        assert!(Points::try_from(f64::INFINITY).is_err());
    }

    #[test]
    fn arithmetic_is_exact() {
        let a = Points::try_from(0.1).unwrap();
        let b = Points::try_from(0.2).unwrap();
        assert_eq!(a + b, Points::try_from(0.3).unwrap());
        assert_eq!(Points::from_points(500) - Points::from_points(200), Points::from_points(300));
    }

    #[test]
    fn wire_format_is_a_plain_number() {
        let json = serde_json::to_string(&Points::try_from(729.98).unwrap()).unwrap();
        assert_eq!(json, "729.98");
        let back: Points = serde_json::from_str("500").unwrap();
        assert_eq!(back, Points::from_points(500));
    }

    #[test]
    fn display() {
        assert_eq!(Points::from_points(500).to_string(), "500.00pts");
        assert_eq!(Points::try_from(0.5).unwrap().to_string(), "0.50pts");
    }
}
