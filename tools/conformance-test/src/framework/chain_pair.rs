/*!
   Bring-up of a chain pair with its relayer, and restart of the relayer
   around the setup of the scenarios of a run.
*/

use core::time::Duration;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::chain::handle::ChainRef;
use crate::error::Error;
use crate::relayer::capability::CapabilitySet;
use crate::relayer::channel::get_transfer_channel;
use crate::relayer::handle::{
    InterchainBuildOptions, InterchainBuilder, InterchainLink, Relayer, RelayerRef,
};
use crate::types::amount::Amount;
use crate::types::channel::ChannelBinding;
use crate::util::random::random_hex_string;
use crate::util::task_group::TaskGroup;

/// Where the relayer of a run comes from.
#[derive(Clone)]
pub enum RelayerSource {
    /// A relayer that is already connected to both chains.
    Existing(RelayerRef),

    /// A backend that brings up the chains and relayer from scratch.
    Build(Arc<dyn InterchainBuilder>),
}

impl RelayerSource {
    pub fn relayer_name(&self) -> String {
        match self {
            RelayerSource::Existing(relayer) => relayer.name().to_string(),
            RelayerSource::Build(builder) => builder.relayer_name().to_string(),
        }
    }

    pub fn capabilities(&self) -> CapabilitySet {
        match self {
            RelayerSource::Existing(relayer) => relayer.capabilities(),
            RelayerSource::Build(builder) => builder.relayer_capabilities(),
        }
    }
}

/**
   Return the relayer of the run, bringing up the chain pair first if
   no running relayer was supplied. The relayer link is registered under
   the first of `path_names`.
*/
pub async fn bootstrap_chain_pair(
    source: &RelayerSource,
    chain_a: &ChainRef,
    chain_b: &ChainRef,
    path_names: &[String],
    faucet_fund: Amount,
) -> Result<RelayerRef, Error> {
    let builder = match source {
        RelayerSource::Existing(relayer) => {
            info!(relayer = %relayer.name(), "reusing running relayer");
            return Ok(relayer.clone());
        }
        RelayerSource::Build(builder) => builder,
    };

    let path = path_names
        .first()
        .ok_or_else(|| Error::configuration("no relayer path supplied".to_string()))?;

    let options = InterchainBuildOptions {
        test_name: format!("conformance-{}-{}", chain_a.chain_id(), chain_b.chain_id()),
        network_id: random_hex_string(),
        link: InterchainLink {
            chain_a: chain_a.clone(),
            chain_b: chain_b.clone(),
            path: path.clone(),
        },
        faucet_fund,
    };

    info!(
        relayer = %builder.relayer_name(),
        chain_a = %chain_a.chain_id(),
        chain_b = %chain_b.chain_id(),
        %path,
        "bringing up chain pair"
    );

    builder.build(&options).await
}

/// A procedure to run before the relayer starts, given the discovered
/// channels.
pub type SetupHook<T> = Box<dyn FnOnce(ChannelBinding) -> BoxFuture<'static, Result<T, Error>> + Send>;

/**
   Restart the relayer, running every hook in between.

   The relayer is stopped first. Failing to stop it, typically because it
   was not running, is only logged. The transfer channel between the two
   chains is then discovered, and all hooks run concurrently against it.
   Once every hook finished, the relayer is started over `path_names` and
   given `grace_period` to set up.

   Returns the discovered channels and the result of each hook, in the
   order of `hooks`. Hook failures do not abort the restart.
*/
pub async fn restart_relayer_with_hooks<T: Send + 'static>(
    relayer: &dyn Relayer,
    chain_a: &ChainRef,
    chain_b: &ChainRef,
    path_names: &[String],
    hooks: Vec<(String, SetupHook<T>)>,
    grace_period: Duration,
) -> Result<(ChannelBinding, Vec<Result<T, Error>>), Error> {
    if path_names.is_empty() {
        return Err(Error::configuration(
            "at least one relayer path must be supplied".to_string(),
        ));
    }

    if let Err(e) = relayer.stop_relayer().await {
        warn!(relayer = %relayer.name(), "failed to stop relayer: {e}");
    }

    let channel = get_transfer_channel(relayer, chain_a.chain_id(), chain_b.chain_id()).await?;
    let channels: ChannelBinding = Arc::new(vec![channel]);

    let mut group = TaskGroup::new("pre-relayer-start hooks");

    for (name, hook) in hooks {
        group.spawn(name, hook(channels.clone()));
    }

    info!(hooks = group.len(), "running pre-relayer-start hooks");

    let results = group.join_settled().await;

    info!(relayer = %relayer.name(), paths = ?path_names, "starting relayer");

    relayer
        .start_relayer(path_names)
        .await
        .map_err(|e| Error::relayer_start(relayer.name().to_string(), e.into()))?;

    sleep(grace_period).await;

    Ok((channels, results))
}
