//! Modbot station demo.
//!
//! Creates the six station tags, then loops: read every tag, rotate `Mode`,
//! bump `State`, write new `FaultMessage`/`StateName` strings. Stops on
//! SIGINT, SIGTERM or SIGABRT, or on the first tag failure.
//!
//! Environment:
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `PLCTAG_GATEWAY`, `PLCTAG_PATH`, ... | connection, see `ConnectionConfig::from_lookup` |
//! | `PLCTAG_POLL_INTERVAL_MS` | pause between cycles (default 0) |
//! | `PLCTAG_MAX_CYCLES` | stop after this many cycles (default unbounded) |
//! | `RUST_LOG` | log filter (default `info`) |
//!
//! Built without the `libplctag` feature, the demo runs against the
//! simulated engine.
//!
//! SIGPIPE needs no handler: the Rust runtime starts every binary with it
//! ignored.

use std::process::ExitCode;
use std::time::Duration;

use log::{error, info};
use plctag_client::{
    ConnectionConfig, ModbotRule, PollReport, Poller, Result, ShutdownToken, TagError, TagRegistry,
};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(report) => {
            info!(
                "done after {} cycles, {} tags destroyed",
                report.cycles, report.destroyed
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<PollReport> {
    let config = ConnectionConfig::from_env()?;
    let interval = env_number("PLCTAG_POLL_INTERVAL_MS")?.map(Duration::from_millis);
    let max_cycles = env_number("PLCTAG_MAX_CYCLES")?;

    let token = ShutdownToken::new();
    install_signal_handlers(&token)?;

    info!(
        "connecting to {} at {} (path {}, cpu {})",
        config.protocol, config.gateway, config.path, config.cpu
    );

    #[cfg(feature = "libplctag")]
    let mut engine = plctag_client::LibPlcTag::new();
    #[cfg(not(feature = "libplctag"))]
    let mut engine = plctag_client::SimulatedEngine::new();

    let registry = TagRegistry::open_all(&mut engine, &config, &ModbotRule::tag_specs())?;

    let mut poller = Poller::new(registry, ModbotRule::new(), token);
    if let Some(interval) = interval {
        poller = poller.with_interval(interval);
    }
    if let Some(max_cycles) = max_cycles {
        poller = poller.with_max_cycles(max_cycles);
    }
    poller.run()
}

fn env_number(key: &str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| TagError::invalid_parameter(key, format!("not a number: \"{value}\""))),
        Err(_) => Ok(None),
    }
}

#[cfg(unix)]
fn install_signal_handlers(token: &ShutdownToken) -> Result<()> {
    use signal_hook::consts::{SIGABRT, SIGINT, SIGTERM};

    for signal in [SIGINT, SIGTERM, SIGABRT] {
        signal_hook::flag::register(signal, token.flag()).map_err(|err| {
            TagError::invalid_parameter("signal", format!("cannot register {signal}: {err}"))
        })?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn install_signal_handlers(_token: &ShutdownToken) -> Result<()> {
    Ok(())
}
