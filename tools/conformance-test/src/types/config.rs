/*!
   Configuration of a conformance run and of the chains under test.
*/

use core::fmt::{self, Display};
use core::str::FromStr;
use core::time::Duration;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::amount::Amount;
use crate::types::id::ChainId;
use crate::types::timeout::TimeoutSpec;

/**
   Parameters of a conformance run. Every field has a default, so an
   empty TOML file is a valid configuration.
*/
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConformanceConfig {
    /// Amount granted to the faucet account of each chain on bring-up.
    #[serde(default = "default::faucet_fund")]
    pub faucet_fund: Amount,

    /// Amount funded into each scenario wallet.
    #[serde(default = "default::user_faucet_fund")]
    pub user_faucet_fund: Amount,

    /// Amount sent in each cross-chain transfer.
    #[serde(default = "default::transfer_amount")]
    pub transfer_amount: Amount,

    /// Number of blocks after the send height in which an acknowledgement
    /// or timeout must be observed.
    #[serde(default = "default::poll_height_max")]
    pub poll_height_max: u64,

    /// Interval between two queries while waiting for a chain to reach a
    /// block height.
    #[serde(default = "default::poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Time given to the relayer to set up before assertions run.
    #[serde(default = "default::relayer_grace_period", with = "humantime_serde")]
    pub relayer_grace_period: Duration,

    /// Blocks waited after a packet reached its end of life before balances
    /// are queried.
    #[serde(default = "default::settle_blocks")]
    pub settle_blocks: u64,

    /// Blocks waited after test wallets are funded.
    #[serde(default = "default::user_funding_blocks")]
    pub user_funding_blocks: u64,

    /// Height offset used by the height timeout scenario.
    #[serde(default = "default::height_timeout")]
    pub height_timeout: u64,

    /// Blocks the height timeout scenario waits for before the relayer
    /// starts.
    #[serde(default = "default::height_timeout_wait_blocks")]
    pub height_timeout_wait_blocks: u64,

    /// Time offset used by the timestamp timeout scenario.
    #[serde(default = "default::timestamp_timeout", with = "humantime_serde")]
    pub timestamp_timeout: Duration,

    /// Time the timestamp timeout scenario waits for before the relayer
    /// starts.
    #[serde(default = "default::timestamp_timeout_wait", with = "humantime_serde")]
    pub timestamp_timeout_wait: Duration,
}

pub mod default {
    use super::*;

    pub fn faucet_fund() -> Amount {
        Amount(10_000_000_000_000)
    }

    pub fn user_faucet_fund() -> Amount {
        Amount(10_000_000_000)
    }

    pub fn transfer_amount() -> Amount {
        Amount(1_000_000)
    }

    pub fn poll_height_max() -> u64 {
        50
    }

    pub fn poll_interval() -> Duration {
        Duration::from_millis(100)
    }

    pub fn relayer_grace_period() -> Duration {
        Duration::from_secs(5)
    }

    pub fn settle_blocks() -> u64 {
        5
    }

    pub fn user_funding_blocks() -> u64 {
        2
    }

    pub fn height_timeout() -> u64 {
        10
    }

    pub fn height_timeout_wait_blocks() -> u64 {
        15
    }

    pub fn timestamp_timeout() -> Duration {
        Duration::from_secs(1)
    }

    pub fn timestamp_timeout_wait() -> Duration {
        Duration::from_secs(15)
    }
}

impl Default for ConformanceConfig {
    fn default() -> Self {
        Self {
            faucet_fund: default::faucet_fund(),
            user_faucet_fund: default::user_faucet_fund(),
            transfer_amount: default::transfer_amount(),
            poll_height_max: default::poll_height_max(),
            poll_interval: default::poll_interval(),
            relayer_grace_period: default::relayer_grace_period(),
            settle_blocks: default::settle_blocks(),
            user_funding_blocks: default::user_funding_blocks(),
            height_timeout: default::height_timeout(),
            height_timeout_wait_blocks: default::height_timeout_wait_blocks(),
            timestamp_timeout: default::timestamp_timeout(),
            timestamp_timeout_wait: default::timestamp_timeout_wait(),
        }
    }
}

impl ConformanceConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.poll_height_max == 0 {
            return Err(Error::configuration(
                "`poll_height_max` must be greater than 0".to_string(),
            ));
        }

        if self.transfer_amount == Amount::zero() {
            return Err(Error::configuration(
                "`transfer_amount` must be greater than 0".to_string(),
            ));
        }

        if self.transfer_amount >= self.user_faucet_fund {
            return Err(Error::configuration(format!(
                "`transfer_amount` ({}) must be lower than `user_faucet_fund` ({})",
                self.transfer_amount, self.user_faucet_fund
            )));
        }

        if self.user_faucet_fund > self.faucet_fund {
            return Err(Error::configuration(format!(
                "`user_faucet_fund` ({}) cannot exceed `faucet_fund` ({})",
                self.user_faucet_fund, self.faucet_fund
            )));
        }

        Ok(())
    }
}

/// Load and validate a [`ConformanceConfig`] from a TOML file.
pub fn load(path: impl AsRef<Path>) -> Result<ConformanceConfig, Error> {
    let path = path.as_ref();
    let config_toml = std::fs::read_to_string(path).map_err(Error::io)?;

    let config = toml::from_str::<ConformanceConfig>(&config_toml)
        .map_err(|e| Error::config_decode(path.display().to_string(), e))?;

    config.validate()?;

    Ok(config)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GasPrice {
    pub price: f64,
    pub denom: String,
}

impl GasPrice {
    pub const fn new(price: f64, denom: String) -> Self {
        Self { price, denom }
    }
}

impl Display for GasPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.price, self.denom)
    }
}

impl FromStr for GasPrice {
    type Err = Error;

    fn from_str(price_in: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::configuration(format!("invalid gas price: {price_in}"));

        // The denomination starts at the first alphabetic character.
        let position = price_in.find(char::is_alphabetic).ok_or_else(invalid)?;
        let (price_str, denom) = price_in.split_at(position);

        let price = price_str.parse::<f64>().map_err(|_| invalid())?;

        if !price.is_finite() || price < 0.0 {
            return Err(invalid());
        }

        Ok(GasPrice {
            price,
            denom: denom.to_owned(),
        })
    }
}

/// Static configuration of a chain under test.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainConfig {
    pub chain_id: ChainId,

    /// The bech32 prefix of account addresses on this chain.
    pub account_prefix: String,

    /// The native denomination, used for transfers and fees.
    pub denom: String,

    pub gas_price: GasPrice,

    /// Timeout applied to packets sent without an explicit timeout.
    pub default_timeout: TimeoutSpec,
}

impl ChainConfig {
    /**
       Convert gas spent by a transaction into fees paid in the native
       denomination, rounding up.
    */
    pub fn gas_fees_in_native_denom(&self, gas_spent: u64) -> Amount {
        let fees = (gas_spent as f64 * self.gas_price.price).ceil();
        Amount(fees as u128)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;
    use test_log::test;

    use crate::types::timeout::TimeoutSpec;

    #[test]
    fn empty_config_uses_defaults() {
        let config: ConformanceConfig = toml::from_str("").unwrap();

        assert_eq!(config, ConformanceConfig::default());
        assert_eq!(config.user_faucet_fund, Amount(10_000_000_000));
        assert_eq!(config.transfer_amount, Amount(1_000_000));
        assert_eq!(config.poll_height_max, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_durations() {
        let config: ConformanceConfig = toml::from_str(
            r#"
            relayer_grace_period = "2s"
            timestamp_timeout_wait = "1m"
            "#,
        )
        .unwrap();

        assert_eq!(config.relayer_grace_period, Duration::from_secs(2));
        assert_eq!(config.timestamp_timeout_wait, Duration::from_secs(60));
    }

    #[test]
    fn reject_unknown_fields() {
        let err = toml::from_str::<ConformanceConfig>("poll_heigth_max = 3").unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn reject_invalid_values() {
        let config = ConformanceConfig {
            poll_height_max: 0,
            ..ConformanceConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ConformanceConfig {
            transfer_amount: config.user_faucet_fund,
            ..ConformanceConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_from_file() {
        let path = std::env::temp_dir().join(format!(
            "conformance-config-{}.toml",
            crate::util::random::random_u32()
        ));

        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "transfer_amount = 5000\nsettle_blocks = 1").unwrap();

        let config = load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.transfer_amount, Amount(5000));
        assert_eq!(config.settle_blocks, 1);
    }

    #[test]
    fn parse_gas_price() {
        let price = GasPrice::from_str("0.025uosmo").unwrap();
        assert_eq!(price, GasPrice::new(0.025, "uosmo".to_string()));

        assert!(GasPrice::from_str("0.025").is_err());
        assert!(GasPrice::from_str("uosmo").is_err());
    }

    #[test]
    fn fees_round_up() {
        let config = ChainConfig {
            chain_id: "osmosis-1".parse().unwrap(),
            account_prefix: "osmo".to_string(),
            denom: "uosmo".to_string(),
            gas_price: GasPrice::new(0.025, "uosmo".to_string()),
            default_timeout: TimeoutSpec::height(1000),
        };

        assert_eq!(config.gas_fees_in_native_denom(100_000), Amount(2500));
        assert_eq!(config.gas_fees_in_native_denom(100_001), Amount(2501));
        assert_eq!(config.gas_fees_in_native_denom(0), Amount(0));
    }
}
