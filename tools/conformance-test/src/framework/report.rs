/*!
   Per-scenario results of a conformance run.
*/

use core::fmt::{self, Display};

use itertools::Itertools;
use serde::Serialize;

use crate::error::Error;
use crate::relayer::capability::CapabilitySet;
use crate::types::id::ChainId;

/// The states a scenario goes through during a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScenarioState {
    Registered,
    CapabilityChecked,
    Skipped,
    SetupPending,
    SetupRunning,
    RelayerRestarted,
    AssertionRunning,
    Passed,
    Failed,
}

impl ScenarioState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScenarioState::Passed | ScenarioState::Failed | ScenarioState::Skipped
        )
    }
}

impl Display for ScenarioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScenarioState::Registered => "registered",
            ScenarioState::CapabilityChecked => "capability-checked",
            ScenarioState::Skipped => "skipped",
            ScenarioState::SetupPending => "setup-pending",
            ScenarioState::SetupRunning => "setup-running",
            ScenarioState::RelayerRestarted => "relayer-restarted",
            ScenarioState::AssertionRunning => "assertion-running",
            ScenarioState::Passed => "passed",
            ScenarioState::Failed => "failed",
        };

        write!(f, "{name}")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScenarioOutcome {
    Passed,
    Failed { reason: String },
    Skipped { missing: CapabilitySet },
}

impl ScenarioOutcome {
    pub fn failed(e: &Error) -> Self {
        ScenarioOutcome::Failed {
            reason: e.to_string(),
        }
    }

    pub fn state(&self) -> ScenarioState {
        match self {
            ScenarioOutcome::Passed => ScenarioState::Passed,
            ScenarioOutcome::Failed { .. } => ScenarioState::Failed,
            ScenarioOutcome::Skipped { .. } => ScenarioState::Skipped,
        }
    }
}

impl Display for ScenarioOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioOutcome::Passed => write!(f, "PASSED"),
            ScenarioOutcome::Failed { reason } => write!(f, "FAILED: {reason}"),
            ScenarioOutcome::Skipped { missing } => {
                write!(f, "SKIPPED: relayer lacks capabilities {missing}")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub outcome: ScenarioOutcome,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConformanceReport {
    pub relayer: String,
    pub chain_a: ChainId,
    pub chain_b: ChainId,
    pub scenarios: Vec<ScenarioReport>,
}

impl ConformanceReport {
    pub fn outcome(&self, scenario: &str) -> Option<&ScenarioOutcome> {
        self.scenarios
            .iter()
            .find(|report| report.name == scenario)
            .map(|report| &report.outcome)
    }

    pub fn passed(&self) -> usize {
        self.count(|outcome| matches!(outcome, ScenarioOutcome::Passed))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, ScenarioOutcome::Failed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, ScenarioOutcome::Skipped { .. }))
    }

    fn count(&self, predicate: impl Fn(&ScenarioOutcome) -> bool) -> usize {
        self.scenarios
            .iter()
            .filter(|report| predicate(&report.outcome))
            .count()
    }

    /// A run succeeds when no scenario failed. Skipped scenarios do not count
    /// as failures.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn into_result(self) -> Result<Self, Error> {
        if self.is_success() {
            return Ok(self);
        }

        let failures = self
            .scenarios
            .iter()
            .filter_map(|report| match &report.outcome {
                ScenarioOutcome::Failed { reason } => Some(format!("{}: {reason}", report.name)),
                _ => None,
            })
            .join("; ");

        Err(Error::assertion(format!(
            "{} of {} conformance scenarios failed: {failures}",
            self.failed(),
            self.scenarios.len()
        )))
    }

    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self).map_err(|e| Error::generic(e.into()))
    }
}

impl Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "conformance of relayer {} between {} and {}:",
            self.relayer, self.chain_a, self.chain_b
        )?;

        for report in &self.scenarios {
            writeln!(f, "  {}: {}", report.name, report.outcome)?;
        }

        write!(
            f,
            "{} passed, {} failed, {} skipped",
            self.passed(),
            self.failed(),
            self.skipped()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::relayer::capability::Capability;

    fn report() -> ConformanceReport {
        ConformanceReport {
            relayer: "mock-relayer".to_string(),
            chain_a: "xion-1".parse().unwrap(),
            chain_b: "osmosis-1".parse().unwrap(),
            scenarios: vec![
                ScenarioReport {
                    name: "relay packet".to_string(),
                    outcome: ScenarioOutcome::Passed,
                },
                ScenarioReport {
                    name: "height timeout".to_string(),
                    outcome: ScenarioOutcome::Skipped {
                        missing: CapabilitySet::new().with(Capability::HeightTimeout),
                    },
                },
            ],
        }
    }

    #[test]
    fn skipped_scenarios_do_not_fail_the_run() {
        let report = report();

        assert_eq!(report.passed(), 1);
        assert_eq!(report.skipped(), 1);
        assert!(report.is_success());
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn failed_scenarios_fail_the_run() {
        let mut report = report();
        report.scenarios.push(ScenarioReport {
            name: "no timeout".to_string(),
            outcome: ScenarioOutcome::Failed {
                reason: "boom".to_string(),
            },
        });

        assert!(!report.is_success());

        let err = report.clone().into_result().unwrap_err();
        assert!(err.to_string().contains("no timeout: boom"));

        let display = report.to_string();
        assert!(display.contains("no timeout: FAILED: boom"));
        assert!(display.ends_with("1 passed, 1 failed, 1 skipped"));
    }

    #[test]
    fn json_report() {
        let json: serde_json::Value = serde_json::from_str(&report().to_json().unwrap()).unwrap();

        assert_eq!(json["scenarios"][0]["outcome"]["status"], "passed");
        assert_eq!(json["scenarios"][1]["outcome"]["status"], "skipped");
        assert_eq!(
            json["scenarios"][1]["outcome"]["missing"][0],
            "HeightTimeout"
        );
    }
}
