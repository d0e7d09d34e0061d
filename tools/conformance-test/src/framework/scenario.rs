/*!
   Conformance scenarios, and the registry of scenarios a run executes.

   A scenario pairs a setup procedure, which runs before the relayer is
   (re)started, with an assertion procedure, which runs after it. Both
   are trait objects so that alternate scenario sets can be registered
   alongside the built-in ones.
*/

use core::time::Duration;
use std::sync::Arc;

use async_trait::async_trait;
use itertools::Itertools;
use tokio::time::sleep;
use tracing::info;

use crate::chain::blocks::wait_for_blocks;
use crate::chain::handle::ChainRef;
use crate::error::{Error, ErrorDetail};
use crate::framework::balance::{check_balances, BalanceSnapshot};
use crate::framework::poll::{poll_for_ack, poll_for_timeout};
use crate::framework::transfer::send_transfers;
use crate::relayer::capability::{Capability, CapabilitySet};
use crate::types::channel::ChannelBinding;
use crate::types::config::ConformanceConfig;
use crate::types::id::ChainId;
use crate::types::packet::PacketLifecycle;
use crate::types::timeout::{PacketTimeoutPolicy, TimeoutSpec, TransferOptions};
use crate::types::transfer::{TransferDirection, TxCache};
use crate::types::wallet::Wallet;

#[async_trait]
pub trait ScenarioSetup: Send + Sync + 'static {
    /// Prepare the chains before the relayer starts, recording sent
    /// transfers in `run`.
    async fn setup(&self, ctx: &ScenarioContext, run: &mut TestCaseRun) -> Result<(), Error>;
}

#[async_trait]
pub trait ScenarioAssertion: Send + Sync + 'static {
    async fn assert(&self, ctx: &ScenarioContext, run: &TestCaseRun) -> Result<(), Error>;
}

#[derive(Clone)]
pub struct Scenario {
    pub name: String,
    pub required_capabilities: CapabilitySet,
    pub setup: Arc<dyn ScenarioSetup>,
    pub assertion: Arc<dyn ScenarioAssertion>,
}

impl Scenario {
    pub fn new(
        name: impl Into<String>,
        setup: impl ScenarioSetup,
        assertion: impl ScenarioAssertion,
    ) -> Self {
        Self {
            name: name.into(),
            required_capabilities: CapabilitySet::new(),
            setup: Arc::new(setup),
            assertion: Arc::new(assertion),
        }
    }

    pub fn requires(mut self, capability: Capability) -> Self {
        self.required_capabilities = self.required_capabilities.with(capability);
        self
    }

    /// The scenario name with spaces replaced by dashes, usable in key names.
    pub fn key_prefix(&self) -> String {
        self.name.split_whitespace().join("-")
    }
}

/// The scenarios of a conformance run, in execution and report order.
#[derive(Clone, Default)]
pub struct ScenarioRegistry {
    scenarios: Vec<Scenario>,
}

impl ScenarioRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a scenario. Scenario names must be unique.
    pub fn with_scenario(mut self, scenario: Scenario) -> Result<Self, Error> {
        if self.scenarios.iter().any(|s| s.name == scenario.name) {
            return Err(Error::duplicate_scenario(scenario.name));
        }

        self.scenarios.push(scenario);
        Ok(self)
    }

    /**
       The relayer conformance suite: plain relaying with the chain's
       default timeout, relaying without any timeout, and the expiry of
       a height timeout and of a timestamp timeout while the relayer is
       stopped.
    */
    pub fn relayer_conformance(config: &ConformanceConfig) -> Self {
        let scenarios = vec![
            Scenario::new(
                "relay packet",
                SendTransfers::new(PacketTimeoutPolicy::ChainDefault),
                ExpectPacketOutcome(PacketLifecycle::Acknowledged),
            ),
            Scenario::new(
                "no timeout",
                SendTransfers::new(PacketTimeoutPolicy::Custom(TimeoutSpec::disabled())),
                ExpectPacketOutcome(PacketLifecycle::Acknowledged),
            ),
            Scenario::new(
                "height timeout",
                SendTransfers::new(PacketTimeoutPolicy::Custom(TimeoutSpec::height(
                    config.height_timeout,
                )))
                .then_wait(TimeoutExpiry::Blocks(config.height_timeout_wait_blocks)),
                ExpectPacketOutcome(PacketLifecycle::TimedOut),
            )
            .requires(Capability::HeightTimeout),
            Scenario::new(
                "timestamp timeout",
                SendTransfers::new(PacketTimeoutPolicy::Custom(TimeoutSpec::timestamp(
                    config.timestamp_timeout,
                )))
                .then_wait(TimeoutExpiry::Elapsed(config.timestamp_timeout_wait)),
                ExpectPacketOutcome(PacketLifecycle::TimedOut),
            )
            .requires(Capability::TimestampTimeout),
        ];

        Self { scenarios }
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

/// Everything a scenario can access that is shared by the whole run.
#[derive(Clone)]
pub struct ScenarioContext {
    pub chain_a: ChainRef,
    pub chain_b: ChainRef,
    pub channels: ChannelBinding,
    pub config: Arc<ConformanceConfig>,
}

impl ScenarioContext {
    /// The sending and receiving chain of a transfer in `direction`.
    pub fn chains(&self, direction: TransferDirection) -> (&ChainRef, &ChainRef) {
        match direction {
            TransferDirection::SourceToDestination => (&self.chain_a, &self.chain_b),
            TransferDirection::DestinationToSource => (&self.chain_b, &self.chain_a),
        }
    }

    pub fn both_chains(&self) -> [ChainRef; 2] {
        [self.chain_a.clone(), self.chain_b.clone()]
    }
}

/// The wallets owned by one scenario, one funded on each chain.
#[derive(Clone, Debug)]
pub struct TestUsers {
    pub chain_a: Arc<dyn Wallet>,
    pub chain_b: Arc<dyn Wallet>,
}

impl TestUsers {
    /// The wallet sending transfers in `direction`. The same wallet,
    /// addressed with the receiving chain's prefix, receives them.
    pub fn sender(&self, direction: TransferDirection) -> &Arc<dyn Wallet> {
        match direction {
            TransferDirection::SourceToDestination => &self.chain_a,
            TransferDirection::DestinationToSource => &self.chain_b,
        }
    }
}

/// A scenario bound to one execution of the harness.
#[derive(Clone, Debug)]
pub struct TestCaseRun {
    pub scenario: String,
    pub users: TestUsers,
    pub balances_before: BalanceSnapshot,
    pub tx_cache: TxCache,
}

/// How a scenario lets the timeout of its transfers expire before the
/// relayer starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeoutExpiry {
    /// Wait for both chains to advance by the given number of blocks.
    Blocks(u64),

    /// Wait for the given wall-clock duration.
    Elapsed(Duration),
}

/// Send one transfer per bound channel in each direction.
#[derive(Clone, Debug)]
pub struct SendTransfers {
    pub options: TransferOptions,
    pub expiry: Option<TimeoutExpiry>,
}

impl SendTransfers {
    pub fn new(timeout: PacketTimeoutPolicy) -> Self {
        Self {
            options: TransferOptions {
                timeout,
                memo: None,
            },
            expiry: None,
        }
    }

    pub fn then_wait(mut self, expiry: TimeoutExpiry) -> Self {
        self.expiry = Some(expiry);
        self
    }
}

#[async_trait]
impl ScenarioSetup for SendTransfers {
    async fn setup(&self, ctx: &ScenarioContext, run: &mut TestCaseRun) -> Result<(), Error> {
        run.tx_cache = send_transfers(ctx, run, &self.options).await?;

        match self.expiry {
            Some(TimeoutExpiry::Blocks(blocks)) => {
                info!(scenario = %run.scenario, blocks, "waiting for packet timeout height");
                wait_for_blocks(blocks, &ctx.both_chains(), ctx.config.poll_interval).await?;
            }
            Some(TimeoutExpiry::Elapsed(duration)) => {
                info!(scenario = %run.scenario, ?duration, "waiting for packet timeout timestamp");
                sleep(duration).await;
            }
            None => {}
        }

        Ok(())
    }
}

/// Attach the scenario, direction and chains to an assertion failure.
/// Balance mismatches already carry them and are returned as they are.
fn assertion_error(
    scenario: &str,
    direction: TransferDirection,
    sender_chain_id: &ChainId,
    receiver_chain_id: &ChainId,
    e: Error,
) -> Error {
    if matches!(e.detail(), ErrorDetail::BalanceMismatch(_)) {
        return e;
    }

    Error::scenario_assertion(
        scenario.to_string(),
        direction,
        sender_chain_id.clone(),
        receiver_chain_id.clone(),
        e.into(),
    )
}

/**
   Expect every transfer of the scenario to end its lifecycle the given
   way on the sending chain, then check the balances of both wallets
   against that outcome.
*/
#[derive(Clone, Copy, Debug)]
pub struct ExpectPacketOutcome(pub PacketLifecycle);

#[async_trait]
impl ScenarioAssertion for ExpectPacketOutcome {
    async fn assert(&self, ctx: &ScenarioContext, run: &TestCaseRun) -> Result<(), Error> {
        let expected = self.0;

        for direction in TransferDirection::ALL {
            let (sender, receiver) = ctx.chains(direction);

            let wrap = |e: Error| {
                assertion_error(
                    &run.scenario,
                    direction,
                    sender.chain_id(),
                    receiver.chain_id(),
                    e,
                )
            };

            for record in run.tx_cache.records(direction) {
                let start_height = record.height;
                let max_height = record.height + ctx.config.poll_height_max;

                match expected {
                    PacketLifecycle::Acknowledged => {
                        poll_for_ack(
                            sender.as_ref(),
                            &record.packet,
                            start_height,
                            max_height,
                            ctx.config.poll_interval,
                        )
                        .await
                        .map_err(wrap)?;
                    }
                    PacketLifecycle::TimedOut => {
                        poll_for_timeout(
                            sender.as_ref(),
                            &record.packet,
                            start_height,
                            max_height,
                            ctx.config.poll_interval,
                        )
                        .await
                        .map_err(wrap)?;
                    }
                }
            }

            wait_for_blocks(
                ctx.config.settle_blocks,
                &ctx.both_chains(),
                ctx.config.poll_interval,
            )
            .await
            .map_err(wrap)?;

            check_balances(ctx, run, direction, expected)
                .await
                .map_err(wrap)?;
        }

        Ok(())
    }
}
