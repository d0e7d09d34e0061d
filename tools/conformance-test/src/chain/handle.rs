/*!
   The interface through which the harness drives a chain under test.
*/

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Error;
use crate::types::amount::{Amount, WalletAmount};
use crate::types::config::ChainConfig;
use crate::types::id::{ChainId, ChannelId};
use crate::types::packet::{PacketAcknowledgement, PacketTimeout};
use crate::types::timeout::TransferOptions;
use crate::types::transfer::TransferRecord;
use crate::types::wallet::Wallet;

/**
   A running chain. Every method that talks to the chain is a suspension
   point, and implementations must be safe to call from concurrent tasks.
*/
#[async_trait]
pub trait Chain: Send + Sync + 'static {
    fn config(&self) -> &ChainConfig;

    fn chain_id(&self) -> &ChainId {
        &self.config().chain_id
    }

    /// The latest committed block height.
    async fn height(&self) -> Result<u64, Error>;

    /**
       Create a new key named `key_name` and fund its account with
       `amount` of the native denom from the chain's faucet.
    */
    async fn create_funded_wallet(
        &self,
        key_name: &str,
        amount: Amount,
    ) -> Result<Arc<dyn Wallet>, Error>;

    /**
       Broadcast an ICS 020 transfer of `amount` over `channel_id`, signed
       by `key_name`, and wait for it to be committed.
    */
    async fn send_ibc_transfer(
        &self,
        channel_id: &ChannelId,
        key_name: &str,
        amount: &WalletAmount,
        options: &TransferOptions,
    ) -> Result<TransferRecord, Error>;

    async fn get_balance(&self, address: &str, denom: &str) -> Result<Amount, Error>;

    /// Fees paid in the native denom by a transaction that spent `gas_spent`.
    fn gas_fees_in_native_denom(&self, gas_spent: u64) -> Amount {
        self.config().gas_fees_in_native_denom(gas_spent)
    }

    /// Acknowledgements of packets sent by this chain, processed at `height`.
    async fn acknowledgements(&self, height: u64) -> Result<Vec<PacketAcknowledgement>, Error>;

    /// Timeouts of packets sent by this chain, processed at `height`.
    async fn timeouts(&self, height: u64) -> Result<Vec<PacketTimeout>, Error>;
}

pub type ChainRef = Arc<dyn Chain>;
