/*!
   An in-memory chain implementing the [`Chain`] interface.

   The chain produces a block every `block_time`. State changes made by
   transactions and by the relayer are recorded at the height of the
   block being built, which is the latest committed height plus one, so
   that a poller that has seen height `h` committed never misses an
   event recorded at `h`.

   Transfers follow the ICS 020 rules: tokens leaving their source chain
   are escrowed and minted as vouchers on the receiving chain, vouchers
   returning to their source chain are burned and unescrowed, and the
   sender is refunded when its packet times out or fails.
*/

use core::time::Duration;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;
use eyre::eyre;
use sha2::{Digest, Sha256};
use subtle_encoding::{bech32, hex};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, trace};

use crate::chain::blocks::wait_for_height;
use crate::chain::handle::Chain;
use crate::error::{handle_generic_error, Error};
use crate::ibc::denom::{get_prefixed_denom, parse_denom_trace, DenomTrace};
use crate::types::amount::{Amount, WalletAmount};
use crate::types::channel::{ChannelCounterparty, ChannelOutput};
use crate::types::config::ChainConfig;
use crate::types::id::{ChainId, ChannelId, PortId};
use crate::types::packet::{
    FungibleTokenPacketData, Packet, PacketAcknowledgement, PacketTimeout,
};
use crate::types::timeout::{TimeoutBound, TransferOptions};
use crate::types::transfer::TransferRecord;
use crate::types::wallet::{Bech32Wallet, Wallet};
use crate::util::mutex::MutexUtil;

/// Block time of the first block, in nanoseconds since the Unix epoch.
const GENESIS_TIMESTAMP: u64 = 1_700_000_000_000_000_000;

const FAUCET_KEY: &str = "faucet";

const TRANSFER_BASE_GAS: u64 = 75_000;

const SUCCESS_ACK: &[u8] = br#"{"result":"AQ=="}"#;

/// The latest committed block of a chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainStatus {
    pub height: u64,

    /// Block time in nanoseconds since the Unix epoch.
    pub timestamp: u64,
}

struct SentPacket {
    packet: Packet,
    sender: String,
    denom: String,
    amount: Amount,
}

struct MockChainState {
    status: ChainStatus,
    balances: HashMap<(String, String), Amount>,
    keys: HashMap<String, Bech32Wallet>,
    faucet: Option<String>,
    channels: BTreeMap<ChannelId, ChannelOutput>,
    next_sequences: HashMap<ChannelId, u64>,
    denom_traces: HashMap<String, DenomTrace>,

    /// Sent packets that were neither acknowledged nor timed out yet.
    commitments: BTreeMap<(ChannelId, u64), SentPacket>,

    /// Acknowledgements written for received packets, by destination channel.
    written_acks: HashMap<(ChannelId, u64), Vec<u8>>,

    acknowledgements: BTreeMap<u64, Vec<PacketAcknowledgement>>,
    timeouts: BTreeMap<u64, Vec<PacketTimeout>>,
    tx_count: u64,
}

impl MockChainState {
    fn pending_height(&self) -> u64 {
        self.status.height + 1
    }

    fn balance(&self, address: &str, denom: &str) -> Amount {
        self.balances
            .get(&(address.to_string(), denom.to_string()))
            .copied()
            .unwrap_or_default()
    }

    fn mint(&mut self, address: &str, denom: &str, amount: Amount) -> Result<(), Error> {
        let balance = self.balance(address, denom).checked_add(amount)?;
        self.balances
            .insert((address.to_string(), denom.to_string()), balance);
        Ok(())
    }

    fn burn(
        &mut self,
        chain_id: &ChainId,
        address: &str,
        denom: &str,
        amount: Amount,
    ) -> Result<(), Error> {
        let balance = self.balance(address, denom);

        let remaining = balance.checked_sub(amount).map_err(|_| {
            Error::insufficient_funds(
                chain_id.clone(),
                address.to_string(),
                denom.to_string(),
                balance,
                amount,
            )
        })?;

        self.balances
            .insert((address.to_string(), denom.to_string()), remaining);
        Ok(())
    }

    fn move_funds(
        &mut self,
        chain_id: &ChainId,
        from: &str,
        to: &str,
        denom: &str,
        amount: Amount,
    ) -> Result<(), Error> {
        self.burn(chain_id, from, denom, amount)?;
        self.mint(to, denom, amount)
    }

    /// The full trace path of a denom held on this chain.
    fn full_denom_path(&self, denom: &str) -> Result<String, Error> {
        if denom.starts_with("ibc/") {
            self.denom_traces
                .get(denom)
                .map(DenomTrace::full_path)
                .ok_or_else(|| Error::generic(eyre!("unknown ibc denom {denom}")))
        } else {
            Ok(denom.to_string())
        }
    }

    fn next_tx_hash(&mut self, chain_id: &ChainId) -> Result<String, Error> {
        self.tx_count += 1;

        let mut hasher = Sha256::new();
        hasher.update(format!("{chain_id}/{}", self.tx_count).as_bytes());

        String::from_utf8(hex::encode_upper(hasher.finalize())).map_err(handle_generic_error)
    }
}

fn escrow_address(port_id: &PortId, channel_id: &ChannelId) -> String {
    format!("escrow/{port_id}/{channel_id}")
}

/// Whether a token with the given full denom path leaves its source chain
/// when sent over `port_id/channel_id`.
fn is_sender_source(port_id: &PortId, channel_id: &ChannelId, full_denom: &str) -> bool {
    !full_denom.starts_with(&format!("{port_id}/{channel_id}/"))
}

fn error_ack(reason: &str) -> Vec<u8> {
    serde_json::json!({ "error": reason }).to_string().into_bytes()
}

fn is_error_ack(ack: &[u8]) -> bool {
    serde_json::from_slice::<serde_json::Value>(ack)
        .map(|value| value.get("error").is_some())
        .unwrap_or(true)
}

pub struct MockChain {
    config: ChainConfig,
    block_time: Duration,
    started_at: Instant,
    state: Arc<Mutex<MockChainState>>,
    peers: Mutex<HashMap<ChannelId, Weak<MockChain>>>,
    block_producer: Mutex<Option<JoinHandle<()>>>,
}

impl MockChain {
    pub fn new(config: ChainConfig, block_time: Duration) -> Arc<Self> {
        let state = MockChainState {
            status: ChainStatus {
                height: 1,
                timestamp: GENESIS_TIMESTAMP,
            },
            balances: HashMap::new(),
            keys: HashMap::new(),
            faucet: None,
            channels: BTreeMap::new(),
            next_sequences: HashMap::new(),
            denom_traces: HashMap::new(),
            commitments: BTreeMap::new(),
            written_acks: HashMap::new(),
            acknowledgements: BTreeMap::new(),
            timeouts: BTreeMap::new(),
            tx_count: 0,
        };

        Arc::new(Self {
            config,
            block_time,
            started_at: Instant::now(),
            state: Arc::new(Mutex::new(state)),
            peers: Mutex::new(HashMap::new()),
            block_producer: Mutex::new(None),
        })
    }

    pub fn block_time(&self) -> Duration {
        self.block_time
    }

    /// Start producing blocks. Does nothing if blocks are already being
    /// produced.
    pub fn start(&self) -> Result<(), Error> {
        let mut producer = self.block_producer.acquire_mutex()?;

        if producer.is_some() {
            return Ok(());
        }

        let state = self.state.clone();
        let block_time = self.block_time;
        let started_at = self.started_at;
        let chain_id = self.config.chain_id.clone();

        *producer = Some(tokio::spawn(async move {
            let mut ticker = interval(block_time);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let Ok(mut guard) = state.lock() else {
                    return;
                };

                let elapsed = started_at.elapsed().as_nanos() as u64;

                guard.status = ChainStatus {
                    height: guard.status.height + 1,
                    timestamp: GENESIS_TIMESTAMP + elapsed,
                };

                trace!(%chain_id, height = guard.status.height, "produced block");
            }
        }));

        Ok(())
    }

    pub fn status(&self) -> Result<ChainStatus, Error> {
        Ok(self.state.acquire_mutex()?.status)
    }

    /// Create the faucet account, holding `amount` of the native denom.
    pub fn fund_faucet(&self, amount: Amount) -> Result<(), Error> {
        let faucet = self.derive_wallet(FAUCET_KEY);
        let address = faucet.formatted_address_with_prefix(&self.config.account_prefix);

        let mut state = self.state.acquire_mutex()?;

        state.mint(&address, &self.config.denom, amount)?;
        state.keys.insert(FAUCET_KEY.to_string(), faucet);
        state.faucet = Some(address);

        Ok(())
    }

    /**
       Open a transfer channel between two chains, returning the channel
       identifier allocated on each of them.
    */
    pub fn open_transfer_channel(
        chain_a: &Arc<MockChain>,
        chain_b: &Arc<MockChain>,
    ) -> Result<(ChannelId, ChannelId), Error> {
        let channel_a = chain_a.next_channel_id()?;
        let channel_b = chain_b.next_channel_id()?;

        chain_a.add_channel(&channel_a, &channel_b, chain_b)?;
        chain_b.add_channel(&channel_b, &channel_a, chain_a)?;

        debug!(
            chain_a = %chain_a.config.chain_id,
            chain_b = %chain_b.config.chain_id,
            %channel_a,
            %channel_b,
            "opened transfer channel"
        );

        Ok((channel_a, channel_b))
    }

    fn next_channel_id(&self) -> Result<ChannelId, Error> {
        let state = self.state.acquire_mutex()?;
        Ok(ChannelId::new(state.channels.len() as u64))
    }

    fn add_channel(
        &self,
        channel_id: &ChannelId,
        counterparty_channel_id: &ChannelId,
        counterparty: &Arc<MockChain>,
    ) -> Result<(), Error> {
        let mut state = self.state.acquire_mutex()?;
        let connection = format!("connection-{}", state.channels.len());

        state.channels.insert(
            channel_id.clone(),
            ChannelOutput {
                state: "STATE_OPEN".to_string(),
                ordering: "ORDER_UNORDERED".to_string(),
                version: "ics20-1".to_string(),
                port_id: PortId::transfer(),
                channel_id: channel_id.clone(),
                connection_hops: vec![connection],
                counterparty: ChannelCounterparty {
                    port_id: PortId::transfer(),
                    channel_id: counterparty_channel_id.clone(),
                },
            },
        );

        self.peers
            .acquire_mutex()?
            .insert(channel_id.clone(), Arc::downgrade(counterparty));

        Ok(())
    }

    pub fn channels(&self) -> Result<Vec<ChannelOutput>, Error> {
        Ok(self.state.acquire_mutex()?.channels.values().cloned().collect())
    }

    fn counterparty(&self, channel_id: &ChannelId) -> Result<Arc<MockChain>, Error> {
        self.peers
            .acquire_mutex()?
            .get(channel_id)
            .and_then(Weak::upgrade)
            .ok_or_else(|| Error::unknown_channel(self.config.chain_id.clone(), channel_id.clone()))
    }

    fn derive_wallet(&self, key_name: &str) -> Bech32Wallet {
        let mut hasher = Sha256::new();
        hasher.update(format!("{}/{key_name}", self.config.chain_id).as_bytes());

        Bech32Wallet::new(key_name, hasher.finalize()[..20].to_vec())
    }

    /// Packets sent by this chain that are still waiting to be relayed.
    pub fn pending_packets(&self) -> Result<Vec<Packet>, Error> {
        let state = self.state.acquire_mutex()?;

        Ok(state
            .commitments
            .values()
            .map(|sent| sent.packet.clone())
            .collect())
    }

    /// The acknowledgement written by this chain when it received a packet.
    pub fn written_ack(&self, packet: &Packet) -> Result<Option<Vec<u8>>, Error> {
        let state = self.state.acquire_mutex()?;

        Ok(state
            .written_acks
            .get(&(packet.destination_channel.clone(), packet.sequence))
            .cloned())
    }

    /// Whether `packet`, sent to this chain, can no longer be received
    /// because of its height bound and of its timestamp bound, respectively.
    pub fn is_expired(&self, packet: &Packet) -> Result<(bool, bool), Error> {
        let status = self.status()?;

        let height_expired = packet.timeout_height != 0 && status.height >= packet.timeout_height;
        let timestamp_expired =
            packet.timeout_timestamp != 0 && status.timestamp >= packet.timeout_timestamp;

        Ok((height_expired, timestamp_expired))
    }

    /**
       Receive a packet sent to this chain and write its acknowledgement.
       Application failures produce an error acknowledgement rather than
       an `Err`.
    */
    pub fn receive_packet(&self, packet: &Packet) -> Result<Vec<u8>, Error> {
        let mut state = self.state.acquire_mutex()?;
        let key = (packet.destination_channel.clone(), packet.sequence);

        if let Some(ack) = state.written_acks.get(&key) {
            return Ok(ack.clone());
        }

        let ack = match self.apply_received_tokens(&mut state, packet) {
            Ok(()) => SUCCESS_ACK.to_vec(),
            Err(e) => {
                debug!(chain_id = %self.config.chain_id, %packet, "packet receive failed: {e}");
                error_ack(&e.to_string())
            }
        };

        state.written_acks.insert(key, ack.clone());

        Ok(ack)
    }

    fn apply_received_tokens(
        &self,
        state: &mut MockChainState,
        packet: &Packet,
    ) -> Result<(), Error> {
        let data = FungibleTokenPacketData::from_bytes(&packet.data)?;
        let amount: Amount = data.amount.parse()?;

        let (prefix, _) = bech32::decode(&data.receiver)
            .map_err(|e| Error::generic(eyre!("invalid receiver {}: {e}", data.receiver)))?;

        if prefix != self.config.account_prefix {
            return Err(Error::generic(eyre!(
                "receiver {} does not have the account prefix {}",
                data.receiver,
                self.config.account_prefix
            )));
        }

        let source_prefix = format!("{}/{}/", packet.source_port, packet.source_channel);

        match data.denom.strip_prefix(&source_prefix) {
            // The token returns to this chain, where it was escrowed.
            Some(unprefixed) => {
                let denom = parse_denom_trace(unprefixed).ibc_denom()?;
                let escrow = escrow_address(&packet.destination_port, &packet.destination_channel);

                state.move_funds(&self.config.chain_id, &escrow, &data.receiver, &denom, amount)
            }
            None => {
                let prefixed = get_prefixed_denom(
                    &packet.destination_port,
                    &packet.destination_channel,
                    &data.denom,
                );

                let trace = parse_denom_trace(&prefixed);
                let denom = trace.ibc_denom()?;

                state.denom_traces.insert(denom.clone(), trace);
                state.mint(&data.receiver, &denom, amount)
            }
        }
    }

    fn refund(&self, state: &mut MockChainState, sent: &SentPacket) -> Result<(), Error> {
        let packet = &sent.packet;
        let full_denom = state.full_denom_path(&sent.denom)?;

        if is_sender_source(&packet.source_port, &packet.source_channel, &full_denom) {
            let escrow = escrow_address(&packet.source_port, &packet.source_channel);
            state.move_funds(
                &self.config.chain_id,
                &escrow,
                &sent.sender,
                &sent.denom,
                sent.amount,
            )
        } else {
            state.mint(&sent.sender, &sent.denom, sent.amount)
        }
    }

    fn take_commitment(
        &self,
        state: &mut MockChainState,
        packet: &Packet,
    ) -> Result<SentPacket, Error> {
        let sent = state
            .commitments
            .remove(&(packet.source_channel.clone(), packet.sequence))
            .ok_or_else(|| {
                Error::invalid_packet(format!(
                    "no commitment for packet {packet} on chain {}",
                    self.config.chain_id
                ))
            })?;

        if &sent.packet != packet {
            return Err(Error::invalid_packet(format!(
                "packet {packet} does not match its commitment"
            )));
        }

        Ok(sent)
    }

    /// Process the acknowledgement of a packet sent by this chain.
    pub fn acknowledge_packet(&self, packet: &Packet, ack: Vec<u8>) -> Result<(), Error> {
        let mut state = self.state.acquire_mutex()?;
        let sent = self.take_commitment(&mut state, packet)?;

        if is_error_ack(&ack) {
            self.refund(&mut state, &sent)?;
        }

        let height = state.pending_height();

        state
            .acknowledgements
            .entry(height)
            .or_default()
            .push(PacketAcknowledgement {
                packet: sent.packet,
                acknowledgement: ack,
            });

        Ok(())
    }

    /// Process the timeout of a packet sent by this chain.
    pub fn timeout_packet(&self, packet: &Packet) -> Result<(), Error> {
        let mut state = self.state.acquire_mutex()?;
        let sent = self.take_commitment(&mut state, packet)?;

        self.refund(&mut state, &sent)?;

        let height = state.pending_height();

        state
            .timeouts
            .entry(height)
            .or_default()
            .push(PacketTimeout {
                packet: sent.packet,
            });

        Ok(())
    }

    fn tx_poll_interval(&self) -> Duration {
        self.block_time / 10
    }

    async fn wait_for_commit(&self, height: u64) -> Result<(), Error> {
        wait_for_height(self, height, self.tx_poll_interval()).await?;
        Ok(())
    }
}

impl Drop for MockChain {
    fn drop(&mut self) {
        if let Ok(mut producer) = self.block_producer.lock() {
            if let Some(handle) = producer.take() {
                handle.abort();
            }
        }
    }
}

#[async_trait]
impl Chain for MockChain {
    fn config(&self) -> &ChainConfig {
        &self.config
    }

    async fn height(&self) -> Result<u64, Error> {
        Ok(self.status()?.height)
    }

    async fn create_funded_wallet(
        &self,
        key_name: &str,
        amount: Amount,
    ) -> Result<Arc<dyn Wallet>, Error> {
        let wallet = self.derive_wallet(key_name);
        let address = wallet.formatted_address_with_prefix(&self.config.account_prefix);

        let height = {
            let mut state = self.state.acquire_mutex()?;

            if state.keys.contains_key(key_name) {
                return Err(Error::generic(eyre!(
                    "key {key_name} already exists on chain {}",
                    self.config.chain_id
                )));
            }

            let faucet = state
                .faucet
                .clone()
                .ok_or_else(|| Error::faucet_not_funded(self.config.chain_id.clone()))?;

            state.move_funds(
                &self.config.chain_id,
                &faucet,
                &address,
                &self.config.denom,
                amount,
            )?;

            state.keys.insert(key_name.to_string(), wallet.clone());

            state.pending_height()
        };

        self.wait_for_commit(height).await?;

        Ok(Arc::new(wallet))
    }

    async fn send_ibc_transfer(
        &self,
        channel_id: &ChannelId,
        key_name: &str,
        amount: &WalletAmount,
        options: &TransferOptions,
    ) -> Result<TransferRecord, Error> {
        let counterparty = self.counterparty(channel_id)?;
        let counterparty_status = counterparty.status()?;

        let timeout = options.timeout.resolve(&self.config.default_timeout);

        let timeout_height = match timeout.height {
            TimeoutBound::Disabled => 0,
            TimeoutBound::After(blocks) => counterparty_status.height + blocks,
        };

        let timeout_timestamp = match timeout.timestamp {
            TimeoutBound::Disabled => 0,
            TimeoutBound::After(duration) => {
                counterparty_status.timestamp + duration.as_nanos() as u64
            }
        };

        let record = {
            let mut state = self.state.acquire_mutex()?;

            let wallet = state.keys.get(key_name).cloned().ok_or_else(|| {
                Error::unknown_key(self.config.chain_id.clone(), key_name.to_string())
            })?;

            let channel = state.channels.get(channel_id).cloned().ok_or_else(|| {
                Error::unknown_channel(self.config.chain_id.clone(), channel_id.clone())
            })?;

            let sender = wallet.formatted_address_with_prefix(&self.config.account_prefix);
            let full_denom = state.full_denom_path(&amount.denom)?;

            let data = FungibleTokenPacketData {
                denom: full_denom.clone(),
                amount: amount.amount.to_string(),
                sender: sender.clone(),
                receiver: amount.address.clone(),
                memo: options.memo.clone().unwrap_or_default(),
            }
            .to_bytes()?;

            let gas_spent = TRANSFER_BASE_GAS + 10 * data.len() as u64;
            let fees = self.config.gas_fees_in_native_denom(gas_spent);

            state.burn(
                &self.config.chain_id,
                &sender,
                &self.config.denom,
                fees,
            )?;

            if is_sender_source(&channel.port_id, channel_id, &full_denom) {
                let escrow = escrow_address(&channel.port_id, channel_id);
                state.move_funds(
                    &self.config.chain_id,
                    &sender,
                    &escrow,
                    &amount.denom,
                    amount.amount,
                )?;
            } else {
                state.burn(&self.config.chain_id, &sender, &amount.denom, amount.amount)?;
            }

            let sequence = state
                .next_sequences
                .entry(channel_id.clone())
                .or_insert(1);
            let packet_sequence = *sequence;
            *sequence += 1;

            let packet = Packet {
                sequence: packet_sequence,
                source_port: channel.port_id.clone(),
                source_channel: channel_id.clone(),
                destination_port: channel.counterparty.port_id.clone(),
                destination_channel: channel.counterparty.channel_id.clone(),
                data,
                timeout_height,
                timeout_timestamp,
            };

            state.commitments.insert(
                (channel_id.clone(), packet_sequence),
                SentPacket {
                    packet: packet.clone(),
                    sender,
                    denom: amount.denom.clone(),
                    amount: amount.amount,
                },
            );

            TransferRecord {
                height: state.pending_height(),
                tx_hash: state.next_tx_hash(&self.config.chain_id)?,
                gas_spent,
                packet,
            }
        };

        self.wait_for_commit(record.height).await?;

        Ok(record)
    }

    async fn get_balance(&self, address: &str, denom: &str) -> Result<Amount, Error> {
        Ok(self.state.acquire_mutex()?.balance(address, denom))
    }

    async fn acknowledgements(&self, height: u64) -> Result<Vec<PacketAcknowledgement>, Error> {
        let state = self.state.acquire_mutex()?;
        Ok(state.acknowledgements.get(&height).cloned().unwrap_or_default())
    }

    async fn timeouts(&self, height: u64) -> Result<Vec<PacketTimeout>, Error> {
        let state = self.state.acquire_mutex()?;
        Ok(state.timeouts.get(&height).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::chain::blocks::wait_for_blocks;
    use crate::chain::handle::ChainRef;
    use crate::error::ErrorDetail;
    use crate::mock::test_utils::{chain_config, connected_chains};
    use crate::types::timeout::{PacketTimeoutPolicy, TimeoutSpec};

    async fn funded_wallet(chain: &Arc<MockChain>, key_name: &str) -> Arc<dyn Wallet> {
        chain
            .create_funded_wallet(key_name, Amount(10_000_000_000))
            .await
            .unwrap()
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn produces_blocks() {
        let chain = MockChain::new(chain_config("xion-1", "xion", "uxion"), Duration::from_secs(1));
        chain.start().unwrap();

        let start = chain.status().unwrap();
        let chains: Vec<ChainRef> = vec![chain.clone()];
        wait_for_blocks(3, &chains, Duration::from_millis(100))
            .await
            .unwrap();

        let end = chain.status().unwrap();
        assert!(end.height >= start.height + 3);
        assert!(end.timestamp > start.timestamp);
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn funding_requires_faucet() {
        let chain = MockChain::new(chain_config("xion-1", "xion", "uxion"), Duration::from_secs(1));
        chain.start().unwrap();

        let err = chain
            .create_funded_wallet("user", Amount(1))
            .await
            .err()
            .unwrap();

        assert!(matches!(err.detail(), ErrorDetail::FaucetNotFunded(_)));
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn escrow_mint_and_refund() {
        let (chain_a, chain_b, channel_a, _) = connected_chains().await;

        let wallet = funded_wallet(&chain_a, "user").await;
        let sender = wallet.formatted_address_with_prefix("xion");
        let receiver = wallet.formatted_address_with_prefix("osmo");

        let send = |timeout| {
            let chain_a = chain_a.clone();
            let channel_a = channel_a.clone();
            let receiver = receiver.clone();
            async move {
                chain_a
                    .send_ibc_transfer(
                        &channel_a,
                        "user",
                        &WalletAmount {
                            address: receiver,
                            denom: "uxion".to_string(),
                            amount: Amount(1_000),
                        },
                        &TransferOptions {
                            timeout,
                            memo: None,
                        },
                    )
                    .await
                    .unwrap()
            }
        };

        let relayed = send(PacketTimeoutPolicy::ChainDefault).await;
        assert!(relayed.validate().is_ok());

        let fees = chain_a.gas_fees_in_native_denom(relayed.gas_spent);
        assert_eq!(
            chain_a.get_balance(&sender, "uxion").await.unwrap(),
            Amount(10_000_000_000 - 1_000).checked_sub(fees).unwrap()
        );

        let ack = chain_b.receive_packet(&relayed.packet).unwrap();
        chain_a.acknowledge_packet(&relayed.packet, ack).unwrap();

        let voucher = crate::ibc::denom::derive_ibc_denom(
            &relayed.packet.destination_port,
            &relayed.packet.destination_channel,
            "uxion",
        )
        .unwrap();

        assert_eq!(
            chain_b.get_balance(&receiver, &voucher).await.unwrap(),
            Amount(1_000)
        );

        let expiring = send(PacketTimeoutPolicy::Custom(TimeoutSpec::height(0))).await;
        assert_eq!(chain_b.is_expired(&expiring.packet).unwrap(), (true, false));

        let before = chain_a.get_balance(&sender, "uxion").await.unwrap();
        chain_a.timeout_packet(&expiring.packet).unwrap();

        assert_eq!(
            chain_a.get_balance(&sender, "uxion").await.unwrap(),
            before.checked_add(Amount(1_000)).unwrap()
        );

        // A packet ends its lifecycle only once.
        assert!(chain_a.timeout_packet(&expiring.packet).is_err());
        assert!(chain_a.pending_packets().unwrap().is_empty());
    }
}
