use core::fmt::{self, Display};
use std::collections::BTreeSet;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// An optional feature of a relayer that some scenarios depend on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// Relays timeouts of packets whose height bound expired.
    HeightTimeout,

    /// Relays timeouts of packets whose timestamp bound expired.
    TimestampTimeout,

    /// Can flush pending packets on demand.
    FlushPackets,
}

impl Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::HeightTimeout => write!(f, "height-timeout"),
            Capability::TimestampTimeout => write!(f, "timestamp-timeout"),
            Capability::FlushPackets => write!(f, "flush-packets"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        [
            Capability::HeightTimeout,
            Capability::TimestampTimeout,
            Capability::FlushPackets,
        ]
        .into_iter()
        .collect()
    }

    pub fn with(mut self, capability: Capability) -> Self {
        self.0.insert(capability);
        self
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }

    /// The capabilities of `self` that are missing from `other`.
    pub fn missing_from(&self, other: &CapabilitySet) -> CapabilitySet {
        self.0.difference(&other.0).copied().collect()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.iter().join(", "))
    }
}

/**
   Decide whether a scenario requiring `required` can run against a
   relayer advertising `available`. Returns the missing capabilities,
   which are empty when the scenario can run.
*/
pub fn check_capabilities(required: &CapabilitySet, available: &CapabilitySet) -> CapabilitySet {
    required.missing_from(available)
}
