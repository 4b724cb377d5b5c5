//! Exact satoshi amounts, fee rates and fee adjustment.
//!
//! All arithmetic is integer arithmetic in satoshis. Coin-unit values only ever exist as
//! decimal strings at the edges (config, CSV, node responses) and are parsed exactly.

use core::{fmt, iter::Sum, str::FromStr};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of satoshis in one coin.
pub const SATS_PER_COIN: u64 = 100_000_000;

const COIN_DECIMALS: usize = 8;

/// An amount of satoshis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct Amount(u64);

/// A fee rate expressed in satoshis per 1000 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct FeeRate(u64);

/// The inclusive range an operator-supplied fee multiplier must fall into.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FeeAdjustmentRange {
    min: f64,
    max: f64,
}

/// A validated fee multiplier, held in thousandths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeAdjustment(u64);

/// Errors produced when parsing or combining amounts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    /// The string is not a non-negative decimal number.
    #[error("invalid amount format")]
    InvalidFormat,

    /// The string carries more fractional digits than a satoshi can represent.
    #[error("amount has more than 8 fractional digits")]
    TooPrecise,

    /// The result does not fit into 64 bits of satoshis.
    #[error("amount overflow")]
    Overflow,

    /// A subtraction would go below zero.
    #[error("amount underflow")]
    Underflow,
}

/// Errors produced when validating a fee multiplier.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeeAdjustmentError {
    /// The configured range is empty or not finite.
    #[error("invalid fee adjustment range: min {min} max {max}")]
    InvalidRange {
        /// lower bound
        min: f64,
        /// upper bound
        max: f64,
    },

    /// The multiplier lies outside the configured range.
    #[error("fee adjustment {value} is out of range [{min}, {max}]")]
    OutOfRange {
        /// requested multiplier
        value: f64,
        /// lower bound
        min: f64,
        /// upper bound
        max: f64,
    },
}

impl Amount {
    /// The zero amount.
    pub const ZERO: Amount = Amount(0);

    /// Creates an amount from satoshis.
    pub const fn from_sat(sat: u64) -> Self {
        Self(sat)
    }

    /// Returns the amount in satoshis.
    pub const fn to_sat(self) -> u64 {
        self.0
    }

    /// Whether this is the zero amount.
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Parses a coin-unit decimal string such as `"0.02"` exactly.
    pub fn from_coin_str(s: &str) -> Result<Self, AmountError> {
        let s = s.trim();
        let (whole, frac) = match s.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (s, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(AmountError::InvalidFormat);
        }

        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(AmountError::InvalidFormat);
        }

        let frac = frac.trim_end_matches('0');
        if frac.len() > COIN_DECIMALS {
            return Err(AmountError::TooPrecise);
        }

        let whole = if whole.is_empty() {
            0
        } else {
            whole.parse::<u64>().map_err(|_| AmountError::Overflow)?
        };

        let frac_sat = frac
            .bytes()
            .chain(core::iter::repeat(b'0'))
            .take(COIN_DECIMALS)
            .fold(0u64, |acc, b| acc * 10 + u64::from(b - b'0'));

        whole
            .checked_mul(SATS_PER_COIN)
            .and_then(|sat| sat.checked_add(frac_sat))
            .map(Self)
            .ok_or(AmountError::Overflow)
    }

    /// Adds two amounts, failing on overflow.
    pub fn checked_add(self, rhs: Amount) -> Result<Amount, AmountError> {
        self.0.checked_add(rhs.0).map(Self).ok_or(AmountError::Overflow)
    }

    /// Subtracts `rhs`, failing when the result would be negative.
    pub fn checked_sub(self, rhs: Amount) -> Result<Amount, AmountError> {
        self.0.checked_sub(rhs.0).map(Self).ok_or(AmountError::Underflow)
    }

    /// Sums amounts, failing on overflow.
    pub fn checked_sum<I>(iter: I) -> Result<Amount, AmountError>
    where
        I: IntoIterator<Item = Amount>,
    {
        iter.into_iter().try_fold(Amount::ZERO, Amount::checked_add)
    }
}

impl fmt::Display for Amount {
    /// Formats the amount in coin units with all eight decimals, e.g. `0.02000000`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:08}", self.0 / SATS_PER_COIN, self.0 % SATS_PER_COIN)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_coin_str(s)
    }
}

impl Sum for Amount {
    /// Saturating sum; use [`Amount::checked_sum`] where overflow must be reported.
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        Self(iter.fold(0u64, |acc, a| acc.saturating_add(a.0)))
    }
}

impl From<Amount> for u64 {
    fn from(Amount(sat): Amount) -> Self {
        sat
    }
}

impl TryFrom<i64> for Amount {
    type Error = AmountError;

    fn try_from(sat: i64) -> Result<Self, Self::Error> {
        u64::try_from(sat).map(Self).map_err(|_| AmountError::Underflow)
    }
}

impl TryFrom<Amount> for i64 {
    type Error = AmountError;

    fn try_from(Amount(sat): Amount) -> Result<Self, Self::Error> {
        i64::try_from(sat).map_err(|_| AmountError::Overflow)
    }
}

impl FeeRate {
    /// Creates a fee rate from satoshis per 1000 bytes.
    pub const fn from_sat_per_kb(sat: u64) -> Self {
        Self(sat)
    }

    /// Returns the rate in satoshis per 1000 bytes.
    pub const fn to_sat_per_kb(self) -> u64 {
        self.0
    }

    /// Returns the fee for a transaction of `size` bytes, rounded up to the next satoshi.
    pub fn fee_for(self, size: usize) -> Amount {
        let size = size as u64;
        Amount(self.0.saturating_mul(size).div_ceil(1000))
    }
}

impl FeeAdjustmentRange {
    /// Creates a range, rejecting empty or non-finite bounds.
    pub fn new(min: f64, max: f64) -> Result<Self, FeeAdjustmentError> {
        if !min.is_finite() || !max.is_finite() || min <= 0.0 || min > max {
            return Err(FeeAdjustmentError::InvalidRange { min, max });
        }

        Ok(Self { min, max })
    }

    /// Returns the lower bound.
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Returns the upper bound.
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Validates `value` against this range.
    pub fn validate(&self, value: f64) -> Result<FeeAdjustment, FeeAdjustmentError> {
        if !(value >= self.min && value <= self.max) {
            return Err(FeeAdjustmentError::OutOfRange { value, min: self.min, max: self.max });
        }

        // value is finite and positive here, so the cast cannot wrap
        Ok(FeeAdjustment((value * 1000.0 + 0.5) as u64))
    }
}

impl FeeAdjustment {
    /// Returns the multiplier in thousandths.
    pub fn per_mille(self) -> u64 {
        self.0
    }

    /// Scales `fee` by this multiplier, rounding half up to the nearest satoshi.
    pub fn apply(self, fee: Amount) -> Result<Amount, AmountError> {
        fee.0
            .checked_mul(self.0)
            .map(|scaled| (scaled + 500) / 1000)
            .map(Amount)
            .ok_or(AmountError::Overflow)
    }
}
