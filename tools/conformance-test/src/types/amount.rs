use core::str::FromStr;

use derive_more::{Display, From, Into};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A type for representing token amounts held by or transferred between
/// wallets.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Eq,
    PartialEq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Display,
    From,
    Into,
)]
pub struct Amount(pub u128);

impl Amount {
    pub const fn zero() -> Self {
        Self(0)
    }

    pub fn checked_add(self, rhs: impl Into<Amount>) -> Result<Self, Error> {
        let rhs = rhs.into();
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or_else(|| Error::amount_overflow(self, rhs))
    }

    pub fn checked_sub(self, rhs: impl Into<Amount>) -> Result<Self, Error> {
        let rhs = rhs.into();
        self.0
            .checked_sub(rhs.0)
            .map(Self)
            .ok_or_else(|| Error::amount_overflow(self, rhs))
    }
}

impl From<u64> for Amount {
    fn from(v: u64) -> Self {
        Self(v.into())
    }
}

impl FromStr for Amount {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount = s.parse::<u128>().map_err(|e| {
            Error::generic(eyre::eyre!("invalid amount `{}`: {}", s, e))
        })?;
        Ok(Self(amount))
    }
}

// TOML has no 128-bit integers, so amounts are also accepted as strings.
impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AmountVisitor;

        impl<'de> Visitor<'de> for AmountVisitor {
            type Value = Amount;

            fn expecting(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "a non-negative integer amount")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
                Ok(Amount::from(v))
            }

            fn visit_u128<E: de::Error>(self, v: u128) -> Result<Amount, E> {
                Ok(Amount(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
                u64::try_from(v)
                    .map(Amount::from)
                    .map_err(|_| E::custom(format!("negative amount: {v}")))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
                v.parse::<u128>().map(Amount).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}

/// An amount of a given denomination owned by, or destined to, an address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletAmount {
    pub address: String,
    pub denom: String,
    pub amount: Amount,
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    #[test]
    fn checked_arithmetic() {
        let fund = Amount::from(10_000_000_000u64);

        assert_eq!(
            fund.checked_sub(1_000_000u64).unwrap(),
            Amount(9_999_000_000)
        );
        assert_eq!(fund.checked_add(Amount(1)).unwrap(), Amount(10_000_000_001));
        assert!(Amount(1).checked_sub(Amount(2)).is_err());
        assert!(Amount(u128::MAX).checked_add(Amount(1)).is_err());
    }

    #[test]
    fn parse_amount() {
        assert_eq!(Amount::from_str("42").unwrap(), Amount(42));
        assert!(Amount::from_str("-1").is_err());
    }

    #[test]
    fn deserialize_amount() {
        let amount: Amount = serde_json::from_str("1000000").unwrap();
        assert_eq!(amount, Amount(1_000_000));

        let amount: Amount = serde_json::from_str(r#""340282366920938463463374607431768211455""#).unwrap();
        assert_eq!(amount, Amount(u128::MAX));

        assert!(serde_json::from_str::<Amount>("-5").is_err());
    }
}
