/*!
   Timeout settings attached to an IBC transfer.

   Each bound is tracked explicitly as either disabled or set, so that a
   legitimately zero bound is never confused with an absent one.
*/

use core::fmt::{self, Display};
use core::time::Duration;

use serde::{Deserialize, Serialize};

/**
   A single timeout bound of a packet, either on the counterparty block
   height or on the counterparty block time.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutBound<T> {
    /// The packet never times out on this bound.
    Disabled,

    /// The packet times out once the counterparty advanced by the given
    /// offset, relative to its latest state known at send time.
    After(T),
}

impl<T: Copy> TimeoutBound<T> {
    pub fn offset(&self) -> Option<T> {
        match self {
            TimeoutBound::Disabled => None,
            TimeoutBound::After(offset) => Some(*offset),
        }
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, TimeoutBound::Disabled)
    }
}

/**
   Explicit timeout for a packet, with a height bound and a timestamp
   bound.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutSpec {
    pub height: TimeoutBound<u64>,

    #[serde(with = "timeout_duration")]
    pub timestamp: TimeoutBound<Duration>,
}

impl TimeoutSpec {
    /// Both bounds disabled: the packet can be relayed at any time.
    pub const fn disabled() -> Self {
        Self {
            height: TimeoutBound::Disabled,
            timestamp: TimeoutBound::Disabled,
        }
    }

    pub const fn height(blocks: u64) -> Self {
        Self {
            height: TimeoutBound::After(blocks),
            timestamp: TimeoutBound::Disabled,
        }
    }

    pub const fn timestamp(duration: Duration) -> Self {
        Self {
            height: TimeoutBound::Disabled,
            timestamp: TimeoutBound::After(duration),
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.height.is_disabled() && self.timestamp.is_disabled()
    }
}

impl Display for TimeoutSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.height, self.timestamp) {
            (TimeoutBound::Disabled, TimeoutBound::Disabled) => write!(f, "no timeout"),
            (TimeoutBound::After(h), TimeoutBound::Disabled) => write!(f, "{h} blocks"),
            (TimeoutBound::Disabled, TimeoutBound::After(t)) => write!(f, "{t:?}"),
            (TimeoutBound::After(h), TimeoutBound::After(t)) => write!(f, "{h} blocks or {t:?}"),
        }
    }
}

/**
   The timeout policy used when sending a transfer. With
   [`PacketTimeoutPolicy::ChainDefault`], the sending chain applies its own
   default timeout.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PacketTimeoutPolicy {
    #[default]
    ChainDefault,
    Custom(TimeoutSpec),
}

impl PacketTimeoutPolicy {
    /// Resolve the policy against the default timeout of the sending chain.
    pub fn resolve(&self, chain_default: &TimeoutSpec) -> TimeoutSpec {
        match self {
            PacketTimeoutPolicy::ChainDefault => *chain_default,
            PacketTimeoutPolicy::Custom(spec) => *spec,
        }
    }
}

impl Display for PacketTimeoutPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketTimeoutPolicy::ChainDefault => write!(f, "chain default timeout"),
            PacketTimeoutPolicy::Custom(spec) => write!(f, "{spec}"),
        }
    }
}

/// Options passed along with an IBC transfer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransferOptions {
    pub timeout: PacketTimeoutPolicy,
    pub memo: Option<String>,
}

mod timeout_duration {
    use core::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::TimeoutBound;

    #[derive(Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    enum Repr {
        Disabled,
        After(#[serde(with = "humantime_serde")] Duration),
    }

    pub fn serialize<S: Serializer>(
        bound: &TimeoutBound<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match bound {
            TimeoutBound::Disabled => Repr::Disabled,
            TimeoutBound::After(d) => Repr::After(*d),
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<TimeoutBound<Duration>, D::Error> {
        Ok(match Repr::deserialize(deserializer)? {
            Repr::Disabled => TimeoutBound::Disabled,
            Repr::After(d) => TimeoutBound::After(d),
        })
    }
}
