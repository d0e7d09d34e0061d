/*!
   An in-process relayer implementing the [`Relayer`] interface over
   [`MockChain`]s.
*/

use core::time::Duration;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use eyre::eyre;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::chain::handle::Chain;
use crate::error::Error;
use crate::mock::chain::MockChain;
use crate::relayer::capability::{Capability, CapabilitySet};
use crate::relayer::handle::Relayer;
use crate::types::channel::ChannelOutput;
use crate::types::id::ChainId;
use crate::util::mutex::MutexUtil;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RelayMode {
    /// Relay packets, acknowledgements and timeouts.
    #[default]
    Relay,

    /// Run without ever relaying anything.
    Silent,
}

#[derive(Clone)]
struct MockPath {
    chain_a: Arc<MockChain>,
    chain_b: Arc<MockChain>,
}

pub struct MockRelayer {
    name: String,
    capabilities: CapabilitySet,
    mode: RelayMode,
    relay_interval: Duration,
    chains: Mutex<HashMap<ChainId, Arc<MockChain>>>,
    paths: Mutex<HashMap<String, MockPath>>,
    relay_task: Mutex<Option<JoinHandle<()>>>,
}

impl MockRelayer {
    pub fn new(name: impl Into<String>, capabilities: CapabilitySet) -> Self {
        Self {
            name: name.into(),
            capabilities,
            mode: RelayMode::default(),
            relay_interval: Duration::from_millis(500),
            chains: Mutex::new(HashMap::new()),
            paths: Mutex::new(HashMap::new()),
            relay_task: Mutex::new(None),
        }
    }

    pub fn with_mode(mut self, mode: RelayMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_relay_interval(mut self, relay_interval: Duration) -> Self {
        self.relay_interval = relay_interval;
        self
    }

    /// Register a path between two chains, over all channels they share.
    pub fn add_path(
        &self,
        path: impl Into<String>,
        chain_a: Arc<MockChain>,
        chain_b: Arc<MockChain>,
    ) -> Result<(), Error> {
        {
            let mut chains = self.chains.acquire_mutex()?;
            chains.insert(chain_a.chain_id().clone(), chain_a.clone());
            chains.insert(chain_b.chain_id().clone(), chain_b.clone());
        }

        self.paths
            .acquire_mutex()?
            .insert(path.into(), MockPath { chain_a, chain_b });

        Ok(())
    }

    pub fn is_running(&self) -> Result<bool, Error> {
        Ok(self
            .relay_task
            .acquire_mutex()?
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false))
    }
}

impl Drop for MockRelayer {
    fn drop(&mut self) {
        if let Ok(mut task) = self.relay_task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
            }
        }
    }
}

/// Relay everything pending from `src` to `dst`.
fn relay_packets(
    src: &MockChain,
    dst: &MockChain,
    capabilities: &CapabilitySet,
) -> Result<(), Error> {
    for packet in src.pending_packets()? {
        if let Some(ack) = dst.written_ack(&packet)? {
            src.acknowledge_packet(&packet, ack)?;
            continue;
        }

        let (height_expired, timestamp_expired) = dst.is_expired(&packet)?;

        if height_expired || timestamp_expired {
            let can_relay_timeout = (height_expired
                && capabilities.contains(Capability::HeightTimeout))
                || (timestamp_expired && capabilities.contains(Capability::TimestampTimeout));

            if can_relay_timeout {
                debug!(chain_id = %src.chain_id(), %packet, "relaying timeout");
                src.timeout_packet(&packet)?;
            }

            continue;
        }

        debug!(
            src_chain_id = %src.chain_id(),
            dst_chain_id = %dst.chain_id(),
            %packet,
            "relaying packet"
        );

        let ack = dst.receive_packet(&packet)?;
        src.acknowledge_packet(&packet, ack)?;
    }

    Ok(())
}

#[async_trait]
impl Relayer for MockRelayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> CapabilitySet {
        self.capabilities.clone()
    }

    async fn start_relayer(&self, paths: &[String]) -> Result<(), Error> {
        let mut task = self.relay_task.acquire_mutex()?;

        if task.as_ref().map(|t| !t.is_finished()).unwrap_or(false) {
            return Err(Error::relayer_already_running(self.name.clone()));
        }

        let selected = {
            let known = self.paths.acquire_mutex()?;

            paths
                .iter()
                .map(|path| {
                    known
                        .get(path)
                        .cloned()
                        .ok_or_else(|| Error::unknown_path(self.name.clone(), path.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        info!(relayer = %self.name, ?paths, mode = ?self.mode, "starting mock relayer");

        let mode = self.mode;
        let relay_interval = self.relay_interval;
        let capabilities = self.capabilities.clone();
        let name = self.name.clone();

        *task = Some(tokio::spawn(async move {
            loop {
                if mode == RelayMode::Relay {
                    for path in &selected {
                        let result = relay_packets(&path.chain_a, &path.chain_b, &capabilities)
                            .and_then(|()| {
                                relay_packets(&path.chain_b, &path.chain_a, &capabilities)
                            });

                        if let Err(e) = result {
                            warn!(relayer = %name, "failed to relay packets: {e}");
                        }
                    }
                }

                sleep(relay_interval).await;
            }
        }));

        Ok(())
    }

    async fn stop_relayer(&self) -> Result<(), Error> {
        let task = self.relay_task.acquire_mutex()?.take();

        match task {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                info!(relayer = %self.name, "stopped mock relayer");
                Ok(())
            }
            _ => Err(Error::relayer_not_running(self.name.clone())),
        }
    }

    async fn get_channels(&self, chain_id: &ChainId) -> Result<Vec<ChannelOutput>, Error> {
        let chain = self
            .chains
            .acquire_mutex()?
            .get(chain_id)
            .cloned()
            .ok_or_else(|| {
                Error::generic(eyre!("relayer {} is not connected to {chain_id}", self.name))
            })?;

        chain.channels()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::ErrorDetail;
    use crate::mock::test_utils::connected_chains;

    #[test_log::test(tokio::test(start_paused = true))]
    async fn start_and_stop_are_checked() {
        let (chain_a, chain_b, _, _) = connected_chains().await;

        let relayer = MockRelayer::new("mock", CapabilitySet::all());
        relayer.add_path("a-b", chain_a, chain_b).unwrap();

        let err = relayer.stop_relayer().await.err().unwrap();
        assert!(matches!(err.detail(), ErrorDetail::RelayerNotRunning(_)));

        let err = relayer
            .start_relayer(&["unknown".to_string()])
            .await
            .err()
            .unwrap();
        assert!(matches!(err.detail(), ErrorDetail::UnknownPath(_)));

        relayer.start_relayer(&["a-b".to_string()]).await.unwrap();
        assert!(relayer.is_running().unwrap());

        let err = relayer
            .start_relayer(&["a-b".to_string()])
            .await
            .err()
            .unwrap();
        assert!(matches!(err.detail(), ErrorDetail::RelayerAlreadyRunning(_)));

        relayer.stop_relayer().await.unwrap();
        assert!(!relayer.is_running().unwrap());
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn lists_channels_of_known_chains() {
        let (chain_a, chain_b, channel_a, channel_b) = connected_chains().await;
        let chain_a_id = chain_a.chain_id().clone();

        let relayer = MockRelayer::new("mock", CapabilitySet::new());
        relayer.add_path("a-b", chain_a, chain_b).unwrap();

        let channels = relayer.get_channels(&chain_a_id).await.unwrap();

        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].channel_id, channel_a);
        assert_eq!(channels[0].counterparty.channel_id, channel_b);

        let unknown = "unknown-1".parse().unwrap();
        assert!(relayer.get_channels(&unknown).await.is_err());
    }
}
