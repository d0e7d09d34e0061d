/*!
   Functions for initializing each test at the beginning of a Rust test
   session.
*/

use std::env;
use std::sync::Once;

use tracing_subscriber::{
    self as ts,
    filter::{EnvFilter, LevelFilter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    Layer,
};

use crate::error::Error;
use crate::types::config::{load, ConformanceConfig};

static INIT: Once = Once::new();

fn env_flag(name: &str) -> bool {
    env::var(name).map(|val| val == "1").unwrap_or(false)
}

/**
   Initialize the test with a global logger and error handlers, and
   return the [`ConformanceConfig`] found at the path in the
   `CONFORMANCE_CONFIG` environment variable, or the default one.
*/
pub fn init_test() -> Result<ConformanceConfig, Error> {
    let no_color_log = env_flag("NO_COLOR_LOG");
    let json_log = env_flag("LOG_JSON");

    INIT.call_once(|| {
        if !no_color_log {
            // Installing fails only when a hook is already in place.
            let _ = color_eyre::install();
        }
        install_logger(!no_color_log, json_log);
    });

    match env::var("CONFORMANCE_CONFIG") {
        Ok(path) => load(path),
        Err(_) => Ok(ConformanceConfig::default()),
    }
}

/**
   Install the [`tracing_subscriber`] logger handlers so that logs will
   be displayed during test.
*/
pub fn install_logger(with_color: bool, json: bool) {
    // Use log level INFO by default if RUST_LOG is not set.
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let layer = if json {
        ts::fmt::layer().json().boxed()
    } else {
        ts::fmt::layer().with_ansi(with_color).boxed()
    };

    // Another subscriber may already be installed, e.g. by the test logger.
    let _ = ts::registry().with(env_filter).with(layer).try_init();
}
