//! Parses the command line arguments and runs a simulation.
//!
//! Basic usage, sending 100 messages over a channel that loses and corrupts
//! one packet in ten:
//!
//! ```cargo run -- --messages 100 --loss 0.1 --corruption 0.1 --trace 2```

use crate::{
    config::{Config, ConfigError},
    logging::{self, LoggingError},
    shutdown::ExitStatus,
    sim::{ChannelConfig, ChannelConfigError, Report, Sim, SimConfig, SimError},
};
use clap::Parser;
use std::{path::PathBuf, time::Duration};
use thiserror::Error as ThisError;

/// Stores the different command line arguments.
#[derive(Debug, Parser)]
#[command(version, about = "Selective-Repeat ARQ over a simulated channel")]
pub struct Args {
    /// Number of messages the application offers
    #[arg(short, long, default_value_t = 20)]
    pub messages: usize,
    /// Probability that a packet is lost
    #[arg(short, long, default_value_t = 0.0)]
    pub loss: f64,
    /// Probability that a packet is corrupted
    #[arg(short, long, default_value_t = 0.0)]
    pub corruption: f64,
    /// Mean pause between two messages, in milliseconds
    #[arg(short, long, default_value_t = 10)]
    pub interval: u64,
    /// Trace level, from 0 (quiet) to 3 (every packet)
    #[arg(short, long, default_value_t = 0)]
    pub trace: u8,
    /// Maximum number of unacknowledged packets
    #[arg(short, long, default_value_t = Config::DEFAULT_WINDOW_SIZE)]
    pub window: u32,
    /// Size of the sequence number space, at least twice the window
    #[arg(short, long, default_value_t = Config::DEFAULT_SEQ_SPACE)]
    pub seqspace: u32,
    /// Retransmission timeout, in milliseconds
    #[arg(long, default_value_t = 16)]
    pub timeout: u64,
    /// Seed for every random decision in the simulation
    #[arg(long, default_value_t = 0xBAD5EED)]
    pub seed: u64,
    /// Give up after this many seconds
    #[arg(long, default_value_t = 60)]
    pub time_limit: u64,
    /// Write JSON trace events to a file under this directory instead of stderr
    #[arg(long, num_args = 0..=1, default_missing_value = "./logs")]
    pub log: Option<PathBuf>,
}

impl Args {
    /// Validates the arguments into a simulation setup.
    pub fn sim_config(&self) -> Result<SimConfig, CliError> {
        Ok(SimConfig {
            protocol: Config::new(
                self.window,
                self.seqspace,
                Duration::from_millis(self.timeout),
            )?,
            channel: ChannelConfig::new(self.loss, self.corruption)?,
            messages: self.messages,
            interval: Duration::from_millis(self.interval),
            seed: self.seed,
            time_limit: Duration::from_secs(self.time_limit),
        })
    }
}

/// Parses command line arguments, then runs the simulation they describe.
pub async fn initialize_from_arguments() -> Result<Report, CliError> {
    run(Args::parse()).await
}

pub async fn run(args: Args) -> Result<Report, CliError> {
    let config = args.sim_config()?;
    logging::init(args.trace, args.log.as_deref())?;

    let sim = Sim::new(config);
    let shutdown = sim.get_shutdown();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.shut_down_with_status(ExitStatus::Interrupted);
        }
    });
    Ok(sim.run().await?)
}

#[derive(Debug, ThisError)]
pub enum CliError {
    #[error("Invalid protocol parameters: {0}")]
    Config(#[from] ConfigError),
    #[error("Invalid channel parameters: {0}")]
    Channel(#[from] ChannelConfigError),
    #[error("{0}")]
    Logging(#[from] LoggingError),
    #[error("{0}")]
    Sim(#[from] SimError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_protocol() {
        let args = Args::parse_from(["sr-arq"]);
        let config = args.sim_config().unwrap();
        assert_eq!(config.protocol, Config::default());
        assert_eq!(config.channel, ChannelConfig::reliable());
        assert_eq!(config.messages, 20);
        assert!(args.log.is_none());
    }

    #[test]
    fn parses_channel_and_window() {
        let args = Args::parse_from([
            "sr-arq", "-m", "500", "-l", "0.2", "-c", "0.3", "-w", "8", "-s", "16", "--log",
        ]);
        let config = args.sim_config().unwrap();
        assert_eq!(config.messages, 500);
        assert_eq!(config.channel.loss(), 0.2);
        assert_eq!(config.channel.corruption(), 0.3);
        assert_eq!(config.protocol.window_size(), 8);
        assert_eq!(config.protocol.seq_space(), 16);
        assert_eq!(args.log, Some(PathBuf::from("./logs")));
    }

    #[test]
    fn rejects_inconsistent_window() {
        let args = Args::parse_from(["sr-arq", "--window", "8", "--seqspace", "12"]);
        assert!(matches!(
            args.sim_config(),
            Err(CliError::Config(ConfigError::SeqSpaceTooSmall { .. }))
        ));
        let args = Args::parse_from(["sr-arq", "--loss", "2"]);
        assert!(matches!(args.sim_config(), Err(CliError::Channel(_))));
    }
}
