/*!
   In-memory chains and relayer, for running the harness without any
   node or relayer process.
*/

pub mod chain;
pub mod interchain;
pub mod relayer;

use core::time::Duration;

use crate::types::config::{ChainConfig, GasPrice};
use crate::types::id::ChainId;
use crate::types::timeout::{TimeoutBound, TimeoutSpec};

/**
   The configuration of a mock chain, with a gas price of `0.025` in its
   native denom and a default timeout of 1000 blocks or 10 minutes.
*/
pub fn mock_chain_config(chain_id: ChainId, account_prefix: &str, denom: &str) -> ChainConfig {
    ChainConfig {
        chain_id,
        account_prefix: account_prefix.to_string(),
        denom: denom.to_string(),
        gas_price: GasPrice::new(0.025, denom.to_string()),
        default_timeout: TimeoutSpec {
            height: TimeoutBound::After(1000),
            timestamp: TimeoutBound::After(Duration::from_secs(600)),
        },
    }
}
