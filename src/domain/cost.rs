//! Session price in currency minor units.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ScrapeError;

/// Currency symbols a booking site may put in front of a price.
const CURRENCY_SYMBOLS: &[char] = &['£', '$', '€'];

/// Non-negative price held as pence (two decimal places).
///
/// Serialized as a decimal string (`"5.50"`) so JSON clients never see
/// binary floating point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cost(u32);

impl Cost {
    /// Zero cost.
    pub const ZERO: Self = Self(0);

    /// Creates a cost from minor units.
    #[must_use]
    pub const fn from_minor_units(pence: u32) -> Self {
        Self(pence)
    }

    /// Returns the cost in minor units.
    #[must_use]
    pub const fn minor_units(self) -> u32 {
        self.0
    }

    /// Parses a price such as `"£5.5"`, `"5.00"` or `" 12 "`, rounding to
    /// two decimal places.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::InvalidCost`] when the text is not a finite,
    /// non-negative decimal.
    pub fn parse(value: &str) -> Result<Self, ScrapeError> {
        let invalid = || ScrapeError::InvalidCost(value.to_string());

        let number = value.trim().trim_start_matches(CURRENCY_SYMBOLS).trim();
        let parsed: f64 = number.parse().map_err(|_| invalid())?;
        if !parsed.is_finite() || parsed < 0.0 {
            return Err(invalid());
        }

        let pence = (parsed * 100.0).round();
        if pence > f64::from(u32::MAX) {
            return Err(invalid());
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let pence = pence as u32;
        Ok(Self(pence))
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl FromStr for Cost {
    type Err = ScrapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Cost {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cost {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
