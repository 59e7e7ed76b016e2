// Timeouts, topics, CLI options, logging
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::motor::mixer::{MixerConfig, SpeedFormula};

// Runtime loop frequency
pub const LOOP_HZ: u64 = 50;

// Command timeout for watchdog
pub const CMD_TIMEOUT: Duration = Duration::from_millis(250);

// Zenoh topics
pub const TOPIC_CMD_DRIVE: &str = "mecanum/cmd/drive"; // commands
pub const TOPIC_RT_WHEELS: &str = "mecanum/rt/wheels"; // mixed wheel powers
pub const TOPIC_HEALTH: &str = "mecanum/state/health"; // health status

/// Command line options for the runtime
#[derive(Debug, Clone, Parser)]
#[command(name = "mecanum-drive-runtime", version, about = "Mecanum base runtime")]
pub struct Options {
    /// Serial port of the Tetrix board; runs in simulation when omitted
    #[arg(long)]
    pub port: Option<String>,

    /// Look for the Tetrix board by USB id instead of passing --port
    #[arg(long, conflicts_with = "port")]
    pub discover: bool,

    /// Use the legacy board speed formula (sqrt(x² + 2y)) instead of the Euclidean norm
    #[arg(long)]
    pub legacy_speed: bool,

    /// Let out-of-range axes extrapolate instead of clamping them
    #[arg(long)]
    pub no_input_clamp: bool,
}

impl Options {
    pub fn mixer_config(&self) -> MixerConfig {
        let formula = if self.legacy_speed {
            SpeedFormula::LegacyDoubledY
        } else {
            SpeedFormula::Euclidean
        };
        MixerConfig::default()
            .with_speed_formula(formula)
            .with_input_clamp(!self.no_input_clamp)
    }

    pub fn simulated(&self) -> bool {
        self.port.is_none() && !self.discover
    }
}

/// Log filter from a `RUST_LOG`-style value, or `default` when it is unset or invalid
pub fn env_filter(env_value: Option<&str>, default: &str) -> EnvFilter {
    env_value
        .filter(|v| !v.trim().is_empty())
        .and_then(|v| EnvFilter::try_new(v).ok())
        .unwrap_or_else(|| EnvFilter::new(default))
}

/// Install the global subscriber (set RUST_LOG=debug to see wheel powers,
/// trace for mixer internals)
pub fn init_logging(default: &str) {
    let from_env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(from_env.as_deref(), default))
        .init();
}
