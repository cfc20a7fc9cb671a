//! Arbitrary-precision vote weights.
//!
//! The subgraph reports weights as base-10 integer strings scaled by
//! 10^18, which routinely exceed `u64`. They are held as a malachite
//! `Natural` and only converted for display.

use std::fmt;
use std::str::FromStr;

use malachite::Natural;
use serde::{Serialize, Serializer};

use crate::constants::WEIGHT_DECIMALS;
use crate::error::RecordError;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Weight(Natural);

impl Weight {
    pub fn zero() -> Self {
        Self(Natural::from(0u32))
    }

    /// Parse a scaled integer string such as `"1500000000000000000"`.
    pub fn parse(raw: &str) -> Result<Self, RecordError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RecordError::InvalidWeight(raw.to_string()));
        }
        Natural::from_str(trimmed)
            .map(Self)
            .map_err(|_| RecordError::InvalidWeight(raw.to_string()))
    }

    /// Parse, substituting zero for malformed input.
    pub fn parse_or_zero(raw: &str) -> Self {
        Self::parse(raw).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Falling back to zero weight");
            Self::zero()
        })
    }

    pub fn is_zero(&self) -> bool {
        self.0 == Natural::from(0u32)
    }

    pub fn add(&self, other: &Weight) -> Weight {
        Weight(self.0.clone() + other.0.clone())
    }

    /// `part / total` as basis points (hundredths of a percent), rounded
    /// half-up. Zero `total` yields zero.
    pub fn ratio_basis_points(part: &Weight, total: &Weight) -> u32 {
        Self::ratio_scaled(part, total, 10_000)
    }

    /// `part / total` as a whole percent, rounded half-up once from the
    /// exact ratio.
    pub fn ratio_percent(part: &Weight, total: &Weight) -> u32 {
        Self::ratio_scaled(part, total, 100)
    }

    /// `part / total * scale`, rounded half-up and capped at `scale`. Both
    /// operands carry the same 10^18 scale so it cancels and the division
    /// is exact integer arithmetic.
    fn ratio_scaled(part: &Weight, total: &Weight, scale: u32) -> u32 {
        if total.is_zero() {
            return 0;
        }
        let numerator = part.0.clone() * Natural::from(2 * scale) + total.0.clone();
        let denominator = total.0.clone() * Natural::from(2u32);
        let quotient = numerator / denominator;
        u32::try_from(&quotient).map_or(scale, |q| q.min(scale))
    }

    /// Render the unscaled decimal value, e.g. `1.5` for `1500000000000000000`.
    pub fn to_decimal_string(&self) -> String {
        let digits = self.0.to_string();
        let padded = if digits.len() <= WEIGHT_DECIMALS {
            format!("{digits:0>width$}", width = WEIGHT_DECIMALS + 1)
        } else {
            digits
        };
        let (int_part, frac_part) = padded.split_at(padded.len() - WEIGHT_DECIMALS);
        let frac_part = frac_part.trim_end_matches('0');
        if frac_part.is_empty() {
            int_part.to_string()
        } else {
            format!("{int_part}.{frac_part}")
        }
    }
}

impl Default for Weight {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Weight {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}
