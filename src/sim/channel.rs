//! A lossy, corrupting, delaying channel that never reorders.

use super::Inbound;
use crate::{packet::PACKET_OCTETS, shutdown::Shutdown};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use std::{ops::AddAssign, time::Duration};
use thiserror::Error as ThisError;
use tokio::{sync::mpsc, time::Instant};

/// The value a corrupted header field is overwritten with
const GARBLED_FIELD: i32 = 999999;

/// The fault model applied to every packet on the channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelConfig {
    loss: f64,
    corruption: f64,
    min_delay: Duration,
    max_delay: Duration,
}

impl ChannelConfig {
    pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(1);
    pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(10);

    /// Creates a channel that loses a packet with probability `loss` and
    /// corrupts a surviving one with probability `corruption`.
    pub fn new(loss: f64, corruption: f64) -> Result<Self, ChannelConfigError> {
        for (name, value) in [("loss", loss), ("corruption", corruption)] {
            if !(0.0..=1.0).contains(&value) {
                Err(ChannelConfigError::Probability { name, value })?
            }
        }
        Ok(Self {
            loss,
            corruption,
            ..Self::default()
        })
    }

    /// A channel that delivers everything intact.
    pub fn reliable() -> Self {
        Self::default()
    }

    /// Sets the range each packet's delay is drawn from.
    pub fn with_delay(self, min: Duration, max: Duration) -> Result<Self, ChannelConfigError> {
        if min > max {
            Err(ChannelConfigError::DelayRange { min, max })?
        }
        Ok(Self {
            min_delay: min,
            max_delay: max,
            ..self
        })
    }

    pub fn loss(&self) -> f64 {
        self.loss
    }

    pub fn corruption(&self) -> f64 {
        self.corruption
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            loss: 0.0,
            corruption: 0.0,
            min_delay: Self::DEFAULT_MIN_DELAY,
            max_delay: Self::DEFAULT_MAX_DELAY,
        }
    }
}

#[derive(Debug, ThisError, Clone, Copy, PartialEq)]
pub enum ChannelConfigError {
    #[error("The {name} probability must lie in [0, 1], got {value}")]
    Probability { name: &'static str, value: f64 },
    #[error("The minimum delay {min:?} exceeds the maximum delay {max:?}")]
    DelayRange { min: Duration, max: Duration },
}

/// Counters kept by the channel.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChannelStats {
    /// Packets handed to the channel
    pub transmitted: u64,
    pub lost: u64,
    pub corrupted: u64,
}

impl AddAssign for ChannelStats {
    fn add_assign(&mut self, other: Self) {
        self.transmitted += other.transmitted;
        self.lost += other.lost;
        self.corrupted += other.corrupted;
    }
}

/// A packet on its way to the peer.
#[derive(Debug)]
pub(crate) struct Transit {
    arrival: Instant,
    bytes: Vec<u8>,
}

/// The sending half of one direction of the channel. Decides the fate of
/// every packet put on it.
#[derive(Debug)]
pub(crate) struct Link {
    config: ChannelConfig,
    rng: SmallRng,
    last_arrival: Option<Instant>,
    transits: mpsc::UnboundedSender<Transit>,
    stats: ChannelStats,
}

impl Link {
    pub fn new(config: ChannelConfig, seed: u64, transits: mpsc::UnboundedSender<Transit>) -> Self {
        Self {
            config,
            rng: SmallRng::seed_from_u64(seed),
            last_arrival: None,
            transits,
            stats: ChannelStats::default(),
        }
    }

    pub fn stats(&self) -> ChannelStats {
        self.stats
    }

    pub fn transmit(&mut self, mut bytes: Vec<u8>) {
        self.stats.transmitted += 1;
        if self.rng.gen_bool(self.config.loss) {
            self.stats.lost += 1;
            tracing::debug!("Channel lost a packet");
            return;
        }
        if self.rng.gen_bool(self.config.corruption) {
            self.stats.corrupted += 1;
            tracing::debug!("Channel corrupted a packet");
            corrupt(&mut self.rng, &mut bytes);
        }

        let delay = self
            .rng
            .gen_range(self.config.min_delay..=self.config.max_delay);
        let mut arrival = Instant::now() + delay;
        // Never overtake the packet in front
        if let Some(last) = self.last_arrival {
            arrival = arrival.max(last);
        }
        self.last_arrival = Some(arrival);

        if self.transits.send(Transit { arrival, bytes }).is_err() {
            tracing::trace!("Channel closed, packet dropped");
        }
    }
}

/// Garbles a serialized packet: usually one payload byte, otherwise one of
/// the header fields.
fn corrupt(rng: &mut SmallRng, bytes: &mut [u8]) {
    let choice: f64 = rng.gen();
    if choice < 0.75 {
        let at = rng.gen_range(PACKET_OCTETS - crate::PAYLOAD_SIZE..PACKET_OCTETS);
        bytes[at] = bytes[at].wrapping_add(rng.gen_range(1..=u8::MAX));
    } else if choice < 0.875 {
        bytes[0..4].copy_from_slice(&GARBLED_FIELD.to_be_bytes());
    } else {
        bytes[4..8].copy_from_slice(&GARBLED_FIELD.to_be_bytes());
    }
}

/// Carries packets from one direction's [`Link`] to the peer's inbox once
/// their arrival time comes.
pub(crate) async fn run_link(
    mut transits: mpsc::UnboundedReceiver<Transit>,
    inbox: mpsc::UnboundedSender<Inbound>,
    mut shutdown: Shutdown,
) {
    loop {
        let transit = tokio::select! {
            _ = shutdown.wait_for_shutdown() => return,
            transit = transits.recv() => transit,
        };
        let Some(Transit { arrival, bytes }) = transit else {
            return;
        };
        tokio::select! {
            _ = shutdown.wait_for_shutdown() => return,
            _ = tokio::time::sleep_until(arrival) => {}
        }
        if inbox.send(Inbound::Packet(bytes)).is_err() {
            return;
        }
    }
}
