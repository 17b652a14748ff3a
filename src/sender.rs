//! The sending side of the protocol, endpoint A.
//!
//! The sender keeps up to `window_size` packets in flight. Acknowledgments are
//! recorded per sequence number so that they may arrive in any order, but the
//! window only slides past a contiguous run of acknowledged packets starting
//! at the oldest one. A single timer covers the whole window; when it goes off
//! only the packets not yet acknowledged are sent again.
//!
//! ```text
//!  oldest (front)                      next_seqnum
//!      │                                    │
//!  ────┼─────────┬──────────┬──────────┬────┼──────▶ seq space
//!      │ waiting │  acked   │ waiting  │    │
//!      │ <───────── in flight ────────────▶ │
//! ```

use crate::{
    checksum::is_corrupted,
    config::Config,
    endpoint::{ArqError, Endpoint, SendStatus},
    environment::{EndpointId, Environment},
    packet::{Header, Message, Packet, SeqNum},
    timer::RetransmitTimer,
};
use std::collections::VecDeque;

/// Counters kept by the [`Sender`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SenderStats {
    /// New packets handed to the channel
    pub packets_sent: u64,
    /// Packets sent again after a timeout
    pub packets_resent: u64,
    /// Send requests turned down because the window was full
    pub window_full: u64,
    /// Acknowledgments that marked a packet for the first time
    pub new_acks: u64,
    /// Acknowledgments for packets already acknowledged or no longer in flight
    pub duplicate_acks: u64,
    /// Packets discarded for failing the checksum or having the wrong shape
    pub corrupted: u64,
}

#[derive(Debug, Clone)]
pub struct Sender {
    window_size: usize,
    seq_space: SeqNum,
    /// Packets awaiting acknowledgment, oldest first
    window: VecDeque<Packet>,
    /// Indexed by sequence number
    acked: Vec<bool>,
    next_seqnum: SeqNum,
    timer: RetransmitTimer,
    stats: SenderStats,
}

impl Sender {
    pub fn new(config: &Config) -> Self {
        let window_size = config.window_size() as usize;
        Self {
            window_size,
            seq_space: config.seq_space(),
            window: VecDeque::with_capacity(window_size),
            acked: vec![false; config.seq_space() as usize],
            next_seqnum: 0,
            timer: RetransmitTimer::new(EndpointId::A, config.timeout()),
            stats: SenderStats::default(),
        }
    }

    pub fn stats(&self) -> SenderStats {
        self.stats
    }

    /// The sequence number the next accepted message will get.
    pub fn next_seqnum(&self) -> SeqNum {
        self.next_seqnum
    }

    /// The sequence numbers in flight, oldest first.
    pub fn in_flight(&self) -> impl Iterator<Item = SeqNum> + '_ {
        self.window.iter().filter_map(Packet::seqnum)
    }

    /// Whether an acknowledgment for `seqnum` has been recorded.
    pub fn is_acked(&self, seqnum: SeqNum) -> bool {
        self.acked.get(seqnum as usize).copied().unwrap_or(false)
    }

    pub fn is_timer_running(&self) -> bool {
        self.timer.is_armed()
    }

    fn oldest(&self) -> Option<SeqNum> {
        self.window.front().and_then(Packet::seqnum)
    }

    /// Whether `seqnum` names one of the packets currently in flight.
    fn is_outstanding(&self, seqnum: SeqNum) -> bool {
        match self.oldest() {
            Some(oldest) if seqnum < self.seq_space => {
                let offset = (seqnum + self.seq_space - oldest) % self.seq_space;
                (offset as usize) < self.window.len()
            }
            _ => false,
        }
    }

    /// Drops the acknowledged prefix of the window.
    fn slide(&mut self) {
        while let Some(oldest) = self.oldest() {
            if !self.acked[oldest as usize] {
                break;
            }
            // The number comes around again after wrapping and must start
            // out unacknowledged.
            self.acked[oldest as usize] = false;
            self.window.pop_front();
        }
    }
}

impl Endpoint for Sender {
    fn id(&self) -> EndpointId {
        EndpointId::A
    }

    fn on_send_request(
        &mut self,
        env: &mut impl Environment,
        message: Message,
    ) -> Result<SendStatus, ArqError> {
        if self.window.len() == self.window_size {
            self.stats.window_full += 1;
            tracing::info!(outstanding = self.window.len(), "Window is full, message dropped");
            return Ok(SendStatus::WindowFull);
        }

        let seqnum = self.next_seqnum;
        debug_assert!(!self.acked[seqnum as usize]);
        let packet = Packet::data(seqnum, message.into_payload());
        self.window.push_back(packet);
        tracing::debug!(seqnum, "Sending packet");
        env.send_to_channel(EndpointId::A, packet);
        self.stats.packets_sent += 1;

        if self.window.len() == 1 {
            self.timer.start(env)?;
        }
        self.next_seqnum = (self.next_seqnum + 1) % self.seq_space;
        Ok(SendStatus::Accepted(seqnum))
    }

    fn on_packet_arrival(
        &mut self,
        env: &mut impl Environment,
        packet: Packet,
    ) -> Result<(), ArqError> {
        if is_corrupted(&packet) {
            self.stats.corrupted += 1;
            tracing::debug!("Corrupted acknowledgment discarded");
            return Ok(());
        }
        let acknum = match packet.header {
            Header::Ack { acknum } => acknum,
            Header::Data { seqnum } => {
                self.stats.corrupted += 1;
                tracing::warn!(seqnum, "Data packet arrived at the sender, discarded");
                return Ok(());
            }
        };

        if !self.is_outstanding(acknum) || self.acked[acknum as usize] {
            self.stats.duplicate_acks += 1;
            tracing::debug!(acknum, "Duplicate acknowledgment ignored");
            return Ok(());
        }

        self.acked[acknum as usize] = true;
        self.stats.new_acks += 1;
        tracing::debug!(acknum, "Packet acknowledged");

        if self.oldest() == Some(acknum) {
            self.timer.stop(env);
            self.slide();
            tracing::debug!(
                outstanding = self.window.len(),
                oldest = ?self.oldest(),
                "Window slid"
            );
            if !self.window.is_empty() {
                self.timer.start(env)?;
            }
        }
        Ok(())
    }

    fn on_timer_expiry(&mut self, env: &mut impl Environment) -> Result<(), ArqError> {
        if !self.timer.expire() {
            tracing::warn!("Timer expired while stopped, ignored");
            return Ok(());
        }
        if self.window.is_empty() {
            return Ok(());
        }

        tracing::debug!(outstanding = self.window.len(), "Timeout");
        for packet in self.window.iter() {
            let Some(seqnum) = packet.seqnum() else {
                continue;
            };
            if !self.acked[seqnum as usize] {
                tracing::debug!(seqnum, "Resending packet");
                env.send_to_channel(EndpointId::A, *packet);
                self.stats.packets_resent += 1;
            }
        }
        self.timer.start(env)?;
        Ok(())
    }

    fn outstanding(&self) -> usize {
        self.window.len()
    }
}
