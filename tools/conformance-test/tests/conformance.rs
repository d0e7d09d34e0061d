use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use ibc_conformance_test::error::ErrorDetail;
use ibc_conformance_test::framework::balance::check_balances;
use ibc_conformance_test::framework::scenario::{
    ExpectPacketOutcome, ScenarioAssertion, ScenarioSetup, SendTransfers,
};
use ibc_conformance_test::framework::transfer::send_transfers;
use ibc_conformance_test::mock::chain::MockChain;
use ibc_conformance_test::mock::interchain::MockInterchain;
use ibc_conformance_test::mock::mock_chain_config;
use ibc_conformance_test::mock::relayer::{MockRelayer, RelayMode};
use ibc_conformance_test::prelude::*;
use ibc_conformance_test::types::packet::PacketLifecycle;
use ibc_conformance_test::types::timeout::TransferOptions;
use ibc_conformance_test::types::transfer::TransferDirection;

const PATH: &str = "xion-osmosis";

fn mock_chains() -> (Arc<MockChain>, Arc<MockChain>) {
    let block_time = Duration::from_secs(1);

    let chain_a = MockChain::new(
        mock_chain_config("xion-1".parse().unwrap(), "xion", "uxion"),
        block_time,
    );

    let chain_b = MockChain::new(
        mock_chain_config("osmosis-1".parse().unwrap(), "osmo", "uosmo"),
        block_time,
    );

    (chain_a, chain_b)
}

fn conformance_run(
    chain_a: &Arc<MockChain>,
    chain_b: &Arc<MockChain>,
    relayer: RelayerSource,
    registry: ScenarioRegistry,
) -> ConformanceRun {
    let chain_a: ChainRef = chain_a.clone();
    let chain_b: ChainRef = chain_b.clone();

    ConformanceRun {
        chain_a,
        chain_b,
        relayer,
        path_names: vec![PATH.to_string()],
        registry,
        config: ConformanceConfig::default(),
    }
}

fn build_source(
    chain_a: &Arc<MockChain>,
    chain_b: &Arc<MockChain>,
    relayer: MockRelayer,
) -> RelayerSource {
    let interchain = MockInterchain::new(relayer, vec![chain_a.clone(), chain_b.clone()]);
    RelayerSource::Build(Arc::new(interchain))
}

/// Counts how many times the setup of a scenario ran.
struct CountingSetup(Arc<AtomicUsize>);

#[async_trait]
impl ScenarioSetup for CountingSetup {
    async fn setup(&self, _ctx: &ScenarioContext, _run: &mut TestCaseRun) -> Result<(), Error> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct NoAssertion;

#[async_trait]
impl ScenarioAssertion for NoAssertion {
    async fn assert(&self, _ctx: &ScenarioContext, _run: &TestCaseRun) -> Result<(), Error> {
        Ok(())
    }
}

/// Sends more than the scenario wallets hold, and records whether the
/// failure came back as a transfer error.
struct OverspendingSetup(Arc<AtomicBool>);

#[async_trait]
impl ScenarioSetup for OverspendingSetup {
    async fn setup(&self, ctx: &ScenarioContext, run: &mut TestCaseRun) -> Result<(), Error> {
        let mut config = (*ctx.config).clone();
        config.transfer_amount = config.user_faucet_fund.checked_add(Amount(1))?;

        let ctx = ScenarioContext {
            config: Arc::new(config),
            ..ctx.clone()
        };

        let options = TransferOptions {
            timeout: PacketTimeoutPolicy::ChainDefault,
            memo: None,
        };

        let result = send_transfers(&ctx, run, &options).await;

        if let Err(e) = &result {
            self.0
                .store(matches!(e.detail(), ErrorDetail::Transfer(_)), Ordering::SeqCst);
        }

        run.tx_cache = result?;

        Ok(())
    }
}

/// Checks the balances of acknowledged transfers as if they had timed
/// out, and keeps the resulting mismatch.
struct TimedOutBalances(Arc<Mutex<Option<(ChainId, ChainId, Amount, Amount)>>>);

#[async_trait]
impl ScenarioAssertion for TimedOutBalances {
    async fn assert(&self, ctx: &ScenarioContext, run: &TestCaseRun) -> Result<(), Error> {
        ExpectPacketOutcome(PacketLifecycle::Acknowledged)
            .assert(ctx, run)
            .await?;

        let result = check_balances(
            ctx,
            run,
            TransferDirection::SourceToDestination,
            PacketLifecycle::TimedOut,
        )
        .await;

        if let Err(e) = &result {
            if let ErrorDetail::BalanceMismatch(mismatch) = e.detail() {
                *self.0.lock().unwrap() = Some((
                    mismatch.chain_id.clone(),
                    mismatch.counterparty_chain_id.clone(),
                    mismatch.expected,
                    mismatch.observed,
                ));
            }
        }

        result
    }
}

#[test_log::test(tokio::test(start_paused = true))]
async fn full_suite_passes_with_capable_relayer() {
    let (chain_a, chain_b) = mock_chains();
    let relayer = MockRelayer::new("mock", CapabilitySet::all());
    let registry = ScenarioRegistry::relayer_conformance(&ConformanceConfig::default());

    let run = conformance_run(
        &chain_a,
        &chain_b,
        build_source(&chain_a, &chain_b, relayer),
        registry,
    );

    let report = run_chain_pair_conformance(run).await.unwrap();

    assert_eq!(report.relayer, "mock");
    assert_eq!(report.scenarios.len(), 4);
    assert_eq!(report.passed(), 4, "{report}");
    assert!(report.is_success());

    for name in ["relay packet", "no timeout", "height timeout", "timestamp timeout"] {
        assert_eq!(report.outcome(name), Some(&ScenarioOutcome::Passed));
    }

    // Sent packets were all either acknowledged or timed out.
    for chain in [&chain_a, &chain_b] {
        assert!(chain.pending_packets().unwrap().is_empty());
    }
}

#[test_log::test(tokio::test(start_paused = true))]
async fn skip_scenarios_without_capability() {
    let (chain_a, chain_b) = mock_chains();

    let relayer = MockRelayer::new(
        "mock",
        CapabilitySet::new().with(Capability::TimestampTimeout),
    );

    let setups = Arc::new(AtomicUsize::new(0));

    let registry = ScenarioRegistry::relayer_conformance(&ConformanceConfig::default())
        .with_scenario(
            Scenario::new("flush packets", CountingSetup(setups.clone()), NoAssertion)
                .requires(Capability::FlushPackets),
        )
        .unwrap();

    let run = conformance_run(
        &chain_a,
        &chain_b,
        build_source(&chain_a, &chain_b, relayer),
        registry,
    );

    let report = run_chain_pair_conformance(run).await.unwrap();

    assert_eq!(report.scenarios.len(), 5);
    assert_eq!(report.passed(), 3, "{report}");
    assert_eq!(report.skipped(), 2);
    assert!(report.is_success());

    match report.outcome("height timeout") {
        Some(ScenarioOutcome::Skipped { missing }) => {
            assert!(missing.contains(Capability::HeightTimeout));
        }
        outcome => panic!("unexpected outcome: {outcome:?}"),
    }

    assert_eq!(setups.load(Ordering::SeqCst), 0);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn silent_relayer_fails_scenarios() {
    let (chain_a, chain_b) = mock_chains();

    let relayer = MockRelayer::new("silent", CapabilitySet::all()).with_mode(RelayMode::Silent);

    let registry = ScenarioRegistry::new()
        .with_scenario(Scenario::new(
            "relay packet",
            SendTransfers::new(PacketTimeoutPolicy::ChainDefault),
            ExpectPacketOutcome(PacketLifecycle::Acknowledged),
        ))
        .unwrap();

    let run = conformance_run(
        &chain_a,
        &chain_b,
        build_source(&chain_a, &chain_b, relayer),
        registry,
    );

    let report = run_chain_pair_conformance(run).await.unwrap();

    assert_eq!(report.failed(), 1);
    assert!(!report.is_success());

    match report.outcome("relay packet") {
        Some(ScenarioOutcome::Failed { reason }) => {
            assert!(reason.contains("scenario `relay packet`"), "{reason}");
        }
        outcome => panic!("unexpected outcome: {outcome:?}"),
    }

    let err = report.into_result().unwrap_err();
    assert!(matches!(err.detail(), ErrorDetail::Assertion(_)));
}

#[test_log::test(tokio::test(start_paused = true))]
async fn reuse_existing_relayer() -> Result<(), Error> {
    let (chain_a, chain_b) = mock_chains();

    for chain in [&chain_a, &chain_b] {
        chain.fund_faucet(Amount(10_000_000_000_000))?;
        chain.start()?;
    }

    MockChain::open_transfer_channel(&chain_a, &chain_b)?;

    let relayer = Arc::new(MockRelayer::new("existing", CapabilitySet::all()));
    relayer.add_path(PATH, chain_a.clone(), chain_b.clone())?;

    let registry = ScenarioRegistry::new().with_scenario(Scenario::new(
        "relay packet",
        SendTransfers::new(PacketTimeoutPolicy::ChainDefault),
        ExpectPacketOutcome(PacketLifecycle::Acknowledged),
    ))?;

    let source = RelayerSource::Existing(relayer.clone());
    let report =
        run_chain_pair_conformance(conformance_run(&chain_a, &chain_b, source, registry)).await?;

    assert_eq("relayer name", &report.relayer.as_str(), &"existing")?;
    assert_eq("passed scenarios", &report.passed(), &1)?;
    assert_gt("chain A height", &chain_a.height().await?, &1)?;

    // The relayer is stopped once the run is over.
    assert_not_eq("relayer running", &relayer.is_running()?, &true)?;

    Ok(())
}

#[test_log::test(tokio::test(start_paused = true))]
async fn fail_run_without_transfer_channel() {
    let (chain_a, chain_b) = mock_chains();

    let relayer = Arc::new(MockRelayer::new("existing", CapabilitySet::all()));
    relayer
        .add_path(PATH, chain_a.clone(), chain_b.clone())
        .unwrap();

    let setups = Arc::new(AtomicUsize::new(0));

    let registry = ScenarioRegistry::new()
        .with_scenario(Scenario::new(
            "counting",
            CountingSetup(setups.clone()),
            NoAssertion,
        ))
        .unwrap();

    let source = RelayerSource::Existing(relayer);

    let err = run_chain_pair_conformance(conformance_run(&chain_a, &chain_b, source, registry))
        .await
        .unwrap_err();

    assert!(matches!(err.detail(), ErrorDetail::ChannelDiscovery(_)));
    assert_eq!(setups.load(Ordering::SeqCst), 0);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn reject_run_without_paths() {
    let (chain_a, chain_b) = mock_chains();
    let relayer = MockRelayer::new("mock", CapabilitySet::all());

    let mut run = conformance_run(
        &chain_a,
        &chain_b,
        build_source(&chain_a, &chain_b, relayer),
        ScenarioRegistry::relayer_conformance(&ConformanceConfig::default()),
    );
    run.path_names.clear();

    let err = run_chain_pair_conformance(run).await.unwrap_err();

    assert!(matches!(err.detail(), ErrorDetail::Configuration(_)));
}

#[test_log::test(tokio::test(start_paused = true))]
async fn reject_invalid_config() {
    let (chain_a, chain_b) = mock_chains();
    let relayer = MockRelayer::new("mock", CapabilitySet::all());

    let mut run = conformance_run(
        &chain_a,
        &chain_b,
        build_source(&chain_a, &chain_b, relayer),
        ScenarioRegistry::new(),
    );
    run.config.poll_height_max = 0;

    let err = run_chain_pair_conformance(run).await.unwrap_err();

    assert!(matches!(err.detail(), ErrorDetail::Configuration(_)));
}

#[test_log::test(tokio::test(start_paused = true))]
async fn failed_setup_only_fails_its_scenario() {
    let (chain_a, chain_b) = mock_chains();
    let relayer = MockRelayer::new("mock", CapabilitySet::all());

    let transfer_failed = Arc::new(AtomicBool::new(false));

    let registry = ScenarioRegistry::new()
        .with_scenario(Scenario::new(
            "relay packet",
            SendTransfers::new(PacketTimeoutPolicy::ChainDefault),
            ExpectPacketOutcome(PacketLifecycle::Acknowledged),
        ))
        .unwrap()
        .with_scenario(Scenario::new(
            "overspend",
            OverspendingSetup(transfer_failed.clone()),
            NoAssertion,
        ))
        .unwrap();

    let run = conformance_run(
        &chain_a,
        &chain_b,
        build_source(&chain_a, &chain_b, relayer),
        registry,
    );

    let report = run_chain_pair_conformance(run).await.unwrap();

    assert_eq!(report.passed(), 1, "{report}");
    assert_eq!(report.failed(), 1, "{report}");
    assert_eq!(report.outcome("relay packet"), Some(&ScenarioOutcome::Passed));

    match report.outcome("overspend") {
        Some(ScenarioOutcome::Failed { reason }) => {
            assert!(reason.contains("scenario `overspend`"), "{reason}");
            assert!(reason.contains("transfer from"), "{reason}");
        }
        outcome => panic!("unexpected outcome: {outcome:?}"),
    }

    assert!(transfer_failed.load(Ordering::SeqCst));
}

#[test_log::test(tokio::test(start_paused = true))]
async fn balance_mismatch_reports_expected_and_observed() {
    let (chain_a, chain_b) = mock_chains();
    let relayer = MockRelayer::new("mock", CapabilitySet::all());

    let mismatch = Arc::new(Mutex::new(None));

    let registry = ScenarioRegistry::new()
        .with_scenario(Scenario::new(
            "wrong outcome",
            SendTransfers::new(PacketTimeoutPolicy::ChainDefault),
            TimedOutBalances(mismatch.clone()),
        ))
        .unwrap();

    let run = conformance_run(
        &chain_a,
        &chain_b,
        build_source(&chain_a, &chain_b, relayer),
        registry,
    );

    let report = run_chain_pair_conformance(run).await.unwrap();

    assert_eq!(report.failed(), 1, "{report}");

    match report.outcome("wrong outcome") {
        Some(ScenarioOutcome::Failed { reason }) => {
            assert!(reason.contains("expected to be"), "{reason}");
            assert!(reason.contains("observed"), "{reason}");
        }
        outcome => panic!("unexpected outcome: {outcome:?}"),
    }

    let (chain_id, counterparty_chain_id, expected, observed) =
        mismatch.lock().unwrap().clone().unwrap();

    assert_eq!(&chain_id, chain_a.chain_id());
    assert_eq!(&counterparty_chain_id, chain_b.chain_id());

    // The sender paid the transferred amount, which a timeout would have
    // refunded.
    let transfer_amount = ConformanceConfig::default().transfer_amount;
    assert_eq!(expected.checked_sub(observed).unwrap(), transfer_amount);
}
