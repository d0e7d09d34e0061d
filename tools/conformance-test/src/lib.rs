// #![deny(warnings)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]
#![doc = include_str!("../README.md")]

//!
//! ## Overview
//!
//! The conformance harness checks that a relayer correctly relays ICS 020
//! token transfers between a pair of chains. A run goes through the
//! following phases:
//!
//! 1. Every registered [`Scenario`](crate::framework::scenario::Scenario) is
//!    checked against the capabilities advertised by the relayer. Scenarios
//!    requiring a missing capability are skipped.
//! 2. The chain pair and relayer are brought up, or an already running
//!    relayer is reused.
//! 3. The relayer is stopped, the transfer channel between the chains is
//!    discovered, and the setup of every remaining scenario runs
//!    concurrently: each scenario funds its own pair of wallets and sends
//!    transfers in both directions.
//! 4. The relayer is started again, and after a grace period the assertions
//!    of all scenarios run concurrently. They poll for the acknowledgement
//!    or timeout of each packet, then check the balances of the scenario
//!    wallets.
//!
//! ## Example
//!
//! ```rust
//! use ibc_conformance_test::prelude::*;
//!
//! async fn check_relayer(
//!     chain_a: ChainRef,
//!     chain_b: ChainRef,
//!     relayer: RelayerRef,
//! ) -> Result<(), Error> {
//!     let config = init_test()?;
//!
//!     let report = run_chain_pair_conformance(ConformanceRun {
//!         chain_a,
//!         chain_b,
//!         relayer: RelayerSource::Existing(relayer),
//!         path_names: vec!["conformance".to_string()],
//!         registry: ScenarioRegistry::relayer_conformance(&config),
//!         config,
//!     })
//!     .await?;
//!
//!     info!("{report}");
//!
//!     report.into_result().map(|_| ())
//! }
//! ```
//!
//! With the `mock` feature, the [`mock`] module provides in-memory chains
//! and a relayer that implement the same interfaces, and that can be used
//! to exercise the harness without running any node.

pub mod bootstrap;
pub mod chain;
pub mod error;
pub mod framework;
pub mod ibc;
#[cfg(feature = "mock")]
pub mod mock;
pub mod prelude;
pub mod relayer;
pub mod types;
pub mod util;
