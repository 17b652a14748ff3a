//! Various prebuilt simulation setups for testing, benchmarking, and examples.

use crate::{
    config::Config,
    shutdown::ExitStatus,
    sim::{ChannelConfig, Report, Sim, SimConfig},
};
use std::time::Duration;

async fn run_to_completion(config: SimConfig) -> Report {
    let report = Sim::new(config)
        .run()
        .await
        .expect("The simulation should not fail");
    assert_eq!(report.status, ExitStatus::Exited, "{report}");
    assert!(report.is_complete(), "{report}");
    assert_eq!(report.offered, config.messages);
    assert_eq!(
        report.accepted.len() as u64 + report.sender.window_full,
        config.messages as u64
    );
    report
}

/// Messages sent back to back over a channel that only delays.
pub async fn clean_channel() -> Report {
    let report = run_to_completion(SimConfig {
        messages: 50,
        ..Default::default()
    })
    .await;
    assert_eq!(report.channel.lost, 0);
    assert_eq!(report.channel.corrupted, 0);
    assert_eq!(report.sender.corrupted + report.receiver.corrupted, 0);
    report
}

/// One packet in five is lost.
pub async fn lossy_channel() -> Report {
    let report = run_to_completion(SimConfig {
        channel: ChannelConfig::new(0.2, 0.0).expect("valid probabilities"),
        messages: 100,
        ..Default::default()
    })
    .await;
    assert!(report.channel.lost > 0);
    assert!(report.sender.packets_resent > 0);
    report
}

/// Three packets in ten are garbled.
pub async fn corrupting_channel() -> Report {
    let report = run_to_completion(SimConfig {
        channel: ChannelConfig::new(0.0, 0.3).expect("valid probabilities"),
        messages: 100,
        ..Default::default()
    })
    .await;
    // Some garbled packets may still be in flight when the run ends
    let discarded = report.sender.corrupted + report.receiver.corrupted + report.malformed;
    assert!(discarded > 0);
    assert!(discarded <= report.channel.corrupted);
    report
}

/// A small sequence space, a busy application and a hostile channel, so the
/// sequence numbers come around many times.
pub async fn wraparound() -> Report {
    let protocol = Config::new(4, 8, Duration::from_millis(25)).expect("valid protocol");
    let report = run_to_completion(SimConfig {
        protocol,
        channel: ChannelConfig::new(0.15, 0.15).expect("valid probabilities"),
        messages: 300,
        interval: Duration::from_millis(2),
        ..Default::default()
    })
    .await;
    assert!(report.accepted.len() > 2 * protocol.seq_space() as usize);
    assert!(report.sender.window_full > 0);
    report
}
