//! Re-export of common constructs that are used by conformance tests.

pub use core::time::Duration;
pub use eyre::eyre;
pub use std::sync::Arc;
pub use tracing::{debug, error, info, warn};

pub use crate::bootstrap::init::init_test;
pub use crate::chain::blocks::wait_for_blocks;
pub use crate::chain::handle::{Chain, ChainRef};
pub use crate::error::{handle_generic_error, Error};
pub use crate::framework::chain_pair::RelayerSource;
pub use crate::framework::report::{ConformanceReport, ScenarioOutcome};
pub use crate::framework::runner::{run_chain_pair_conformance, ConformanceRun};
pub use crate::framework::scenario::{Scenario, ScenarioContext, ScenarioRegistry, TestCaseRun};
pub use crate::relayer::capability::{Capability, CapabilitySet};
pub use crate::relayer::handle::{InterchainBuilder, Relayer, RelayerRef};
pub use crate::types::amount::Amount;
pub use crate::types::config::{ChainConfig, ConformanceConfig, GasPrice};
pub use crate::types::id::{ChainId, ChannelId, PortId};
pub use crate::types::timeout::{PacketTimeoutPolicy, TimeoutSpec};
pub use crate::util::assert::*;
