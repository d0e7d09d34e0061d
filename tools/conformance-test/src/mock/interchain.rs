use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::chain::handle::Chain;
use crate::error::Error;
use crate::mock::chain::MockChain;
use crate::mock::relayer::MockRelayer;
use crate::relayer::capability::CapabilitySet;
use crate::relayer::handle::{InterchainBuildOptions, InterchainBuilder, Relayer, RelayerRef};
use crate::types::id::ChainId;

/**
   Brings up a pair of [`MockChain`]s with a [`MockRelayer`] between them:
   funds the faucets, opens a transfer channel, registers the relayer
   path and starts block production.
*/
pub struct MockInterchain {
    relayer: Arc<MockRelayer>,
    chains: Vec<Arc<MockChain>>,
}

impl MockInterchain {
    pub fn new(relayer: MockRelayer, chains: Vec<Arc<MockChain>>) -> Self {
        Self {
            relayer: Arc::new(relayer),
            chains,
        }
    }

    pub fn relayer(&self) -> &Arc<MockRelayer> {
        &self.relayer
    }

    fn chain(&self, chain_id: &ChainId) -> Result<Arc<MockChain>, Error> {
        self.chains
            .iter()
            .find(|chain| chain.chain_id() == chain_id)
            .cloned()
            .ok_or_else(|| {
                Error::configuration(format!("chain {chain_id} is not part of the interchain"))
            })
    }
}

#[async_trait]
impl InterchainBuilder for MockInterchain {
    fn relayer_name(&self) -> &str {
        self.relayer.name()
    }

    fn relayer_capabilities(&self) -> CapabilitySet {
        self.relayer.capabilities()
    }

    async fn build(&self, options: &InterchainBuildOptions) -> Result<RelayerRef, Error> {
        let chain_a = self.chain(options.link.chain_a.chain_id())?;
        let chain_b = self.chain(options.link.chain_b.chain_id())?;

        info!(
            test_name = %options.test_name,
            network_id = %options.network_id,
            chain_a = %chain_a.chain_id(),
            chain_b = %chain_b.chain_id(),
            "building mock interchain"
        );

        for chain in [&chain_a, &chain_b] {
            chain.fund_faucet(options.faucet_fund)?;
        }

        MockChain::open_transfer_channel(&chain_a, &chain_b)?;

        self.relayer
            .add_path(options.link.path.clone(), chain_a.clone(), chain_b.clone())?;

        chain_a.start()?;
        chain_b.start()?;

        let relayer: RelayerRef = self.relayer.clone();

        Ok(relayer)
    }
}
