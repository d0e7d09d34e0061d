/*!
   The interface through which the harness drives a relayer, and the
   backend that brings up a chain pair together with its relayer.
*/

use std::sync::Arc;

use async_trait::async_trait;

use crate::chain::handle::ChainRef;
use crate::error::Error;
use crate::relayer::capability::CapabilitySet;
use crate::types::amount::Amount;
use crate::types::channel::ChannelOutput;
use crate::types::id::ChainId;

#[async_trait]
pub trait Relayer: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn capabilities(&self) -> CapabilitySet;

    /// Start relaying packets over the paths with the given names.
    async fn start_relayer(&self, paths: &[String]) -> Result<(), Error>;

    /// Stop relaying. Fails if the relayer was not running.
    async fn stop_relayer(&self) -> Result<(), Error>;

    /// The channels of the given chain known to the relayer.
    async fn get_channels(&self, chain_id: &ChainId) -> Result<Vec<ChannelOutput>, Error>;
}

pub type RelayerRef = Arc<dyn Relayer>;

/// A pair of chains connected by a relayer path.
#[derive(Clone)]
pub struct InterchainLink {
    pub chain_a: ChainRef,
    pub chain_b: ChainRef,
    pub path: String,
}

#[derive(Clone)]
pub struct InterchainBuildOptions {
    pub test_name: String,
    pub network_id: String,
    pub link: InterchainLink,

    /// Amount of native denom granted to the faucet of each chain.
    pub faucet_fund: Amount,
}

/**
   Full bring-up of a chain pair: network context, relayer link,
   both chains and the relayer itself, and funded faucets.

   The name and capabilities of the relayer to be built are known
   up front, so that scenarios can be gated before anything is started.
*/
#[async_trait]
pub trait InterchainBuilder: Send + Sync + 'static {
    fn relayer_name(&self) -> &str;

    fn relayer_capabilities(&self) -> CapabilitySet;

    async fn build(&self, options: &InterchainBuildOptions) -> Result<RelayerRef, Error>;
}
