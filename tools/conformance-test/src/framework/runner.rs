/*!
   The entry point of the harness: run the registered scenarios against a
   chain pair and its relayer.
*/

use std::sync::Arc;

use futures::FutureExt;
use tracing::{error, info, warn};

use crate::chain::handle::ChainRef;
use crate::error::Error;
use crate::framework::chain_pair::{
    bootstrap_chain_pair, restart_relayer_with_hooks, RelayerSource, SetupHook,
};
use crate::framework::report::{ConformanceReport, ScenarioOutcome, ScenarioReport, ScenarioState};
use crate::framework::scenario::{Scenario, ScenarioContext, ScenarioRegistry, TestCaseRun};
use crate::framework::transfer::prepare_test_case;
use crate::relayer::capability::check_capabilities;
use crate::types::config::ConformanceConfig;
use crate::util::task_group::TaskGroup;

pub struct ConformanceRun {
    pub chain_a: ChainRef,
    pub chain_b: ChainRef,
    pub relayer: RelayerSource,
    pub path_names: Vec<String>,
    pub registry: ScenarioRegistry,
    pub config: ConformanceConfig,
}

fn log_state(scenario: &str, state: ScenarioState) {
    info!(scenario, %state, "scenario state changed");
}

/**
   Run every scenario of the registry between the two chains.

   Errors concerning the whole run, such as an invalid configuration, a
   failed bring-up, a failed channel discovery or a relayer that cannot
   start, are returned as `Err`. Errors of a single scenario only fail
   that scenario in the returned report.
*/
pub async fn run_chain_pair_conformance(run: ConformanceRun) -> Result<ConformanceReport, Error> {
    let ConformanceRun {
        chain_a,
        chain_b,
        relayer,
        path_names,
        registry,
        config,
    } = run;

    config.validate()?;

    if path_names.is_empty() {
        return Err(Error::configuration(
            "at least one relayer path must be supplied".to_string(),
        ));
    }

    let config = Arc::new(config);
    let capabilities = relayer.capabilities();

    let mut outcomes: Vec<Option<ScenarioOutcome>> = vec![None; registry.len()];
    let mut pending: Vec<(usize, Scenario)> = Vec::new();

    for (index, scenario) in registry.scenarios().iter().enumerate() {
        log_state(&scenario.name, ScenarioState::Registered);

        let missing = check_capabilities(&scenario.required_capabilities, &capabilities);
        log_state(&scenario.name, ScenarioState::CapabilityChecked);

        if missing.is_empty() {
            log_state(&scenario.name, ScenarioState::SetupPending);
            pending.push((index, scenario.clone()));
        } else {
            warn!(
                scenario = %scenario.name,
                relayer = %relayer.relayer_name(),
                %missing,
                "skipping scenario, relayer lacks required capabilities"
            );

            log_state(&scenario.name, ScenarioState::Skipped);
            outcomes[index] = Some(ScenarioOutcome::Skipped { missing });
        }
    }

    let relayer = bootstrap_chain_pair(
        &relayer,
        &chain_a,
        &chain_b,
        &path_names,
        config.faucet_fund,
    )
    .await?;

    let hooks: Vec<(String, SetupHook<TestCaseRun>)> = pending
        .iter()
        .map(|(_, scenario)| {
            let chain_a = chain_a.clone();
            let chain_b = chain_b.clone();
            let config = config.clone();
            let scenario = scenario.clone();
            let name = scenario.name.clone();

            let hook: SetupHook<TestCaseRun> = Box::new(move |channels| {
                async move {
                    log_state(&scenario.name, ScenarioState::SetupRunning);

                    let ctx = ScenarioContext {
                        chain_a,
                        chain_b,
                        channels,
                        config,
                    };

                    let mut test_case =
                        prepare_test_case(&ctx, &scenario.name, &scenario.key_prefix()).await?;

                    scenario.setup.setup(&ctx, &mut test_case).await?;

                    Ok(test_case)
                }
                .boxed()
            });

            (name, hook)
        })
        .collect();

    let (channels, setups) = restart_relayer_with_hooks(
        relayer.as_ref(),
        &chain_a,
        &chain_b,
        &path_names,
        hooks,
        config.relayer_grace_period,
    )
    .await?;

    let ctx = ScenarioContext {
        chain_a: chain_a.clone(),
        chain_b: chain_b.clone(),
        channels,
        config: config.clone(),
    };

    let mut assertions = TaskGroup::new("scenario assertions");
    let mut asserted = Vec::new();

    for ((index, scenario), setup) in pending.into_iter().zip(setups) {
        match setup {
            Ok(test_case) => {
                log_state(&scenario.name, ScenarioState::RelayerRestarted);

                let ctx = ctx.clone();
                let name = scenario.name.clone();

                assertions.spawn(name, async move {
                    log_state(&scenario.name, ScenarioState::AssertionRunning);
                    scenario.assertion.assert(&ctx, &test_case).await
                });

                asserted.push(index);
            }
            Err(e) => {
                error!(scenario = %scenario.name, "scenario setup failed: {e}");

                log_state(&scenario.name, ScenarioState::Failed);
                outcomes[index] = Some(ScenarioOutcome::failed(&e));
            }
        }
    }

    for (index, result) in asserted.into_iter().zip(assertions.join_settled().await) {
        let name = &registry.scenarios()[index].name;

        let outcome = match result {
            Ok(()) => ScenarioOutcome::Passed,
            Err(e) => {
                error!(scenario = %name, "scenario assertion failed: {e}");
                ScenarioOutcome::failed(&e)
            }
        };

        log_state(name, outcome.state());
        outcomes[index] = Some(outcome);
    }

    if let Err(e) = relayer.stop_relayer().await {
        warn!(relayer = %relayer.name(), "failed to stop relayer after conformance run: {e}");
    }

    let scenarios = registry
        .scenarios()
        .iter()
        .zip(outcomes)
        .map(|(scenario, outcome)| ScenarioReport {
            name: scenario.name.clone(),
            outcome: outcome.unwrap_or_else(|| ScenarioOutcome::Failed {
                reason: "scenario did not run".to_string(),
            }),
        })
        .collect();

    let report = ConformanceReport {
        relayer: relayer.name().to_string(),
        chain_a: chain_a.chain_id().clone(),
        chain_b: chain_b.chain_id().clone(),
        scenarios,
    };

    info!(
        passed = report.passed(),
        failed = report.failed(),
        skipped = report.skipped(),
        "conformance run finished"
    );

    Ok(report)
}
