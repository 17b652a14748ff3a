//! The receiving side of the protocol, endpoint B.
//!
//! Packets that arrive ahead of a gap are held in a slot per sequence number
//! until the gap is filled, then handed to the application in order. Every
//! intact packet is acknowledged on its own, duplicates included: the sender
//! counts on a per-packet acknowledgment to stop resending it.

use crate::{
    checksum::is_corrupted,
    config::Config,
    endpoint::{ArqError, Endpoint, SendStatus},
    environment::{EndpointId, Environment},
    packet::{Header, Message, Packet, Payload, SeqNum},
};

/// Counters kept by the [`Receiver`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReceiverStats {
    /// Intact data packets, duplicates included
    pub packets_received: u64,
    /// Payloads handed to the application
    pub delivered: u64,
    /// Packets that were already buffered or delivered
    pub duplicates: u64,
    /// Packets discarded for failing the checksum or having the wrong shape
    pub corrupted: u64,
}

#[derive(Debug, Clone)]
pub struct Receiver {
    window_size: SeqNum,
    seq_space: SeqNum,
    /// The next sequence number owed to the application
    expected: SeqNum,
    /// Indexed by sequence number. A slot holds a payload iff it was received
    /// and not delivered yet.
    slots: Vec<Option<Payload>>,
    stats: ReceiverStats,
}

impl Receiver {
    pub fn new(config: &Config) -> Self {
        Self {
            window_size: config.window_size(),
            seq_space: config.seq_space(),
            expected: 0,
            slots: vec![None; config.seq_space() as usize],
            stats: ReceiverStats::default(),
        }
    }

    pub fn stats(&self) -> ReceiverStats {
        self.stats
    }

    pub fn expected(&self) -> SeqNum {
        self.expected
    }

    /// The sequence numbers received out of order and not yet delivered.
    pub fn buffered(&self) -> impl Iterator<Item = SeqNum> + '_ {
        (0..self.window_size)
            .map(|offset| (self.expected + offset) % self.seq_space)
            .filter(|&seqnum| self.slots[seqnum as usize].is_some())
    }

    /// Whether `seqnum` falls in `[expected, expected + window_size)`.
    fn in_window(&self, seqnum: SeqNum) -> bool {
        (seqnum + self.seq_space - self.expected) % self.seq_space < self.window_size
    }

    fn drain(&mut self, env: &mut impl Environment) {
        while let Some(payload) = self.slots[self.expected as usize].take() {
            tracing::debug!(seqnum = self.expected, "Delivering payload");
            env.deliver_to_application(EndpointId::B, payload);
            self.stats.delivered += 1;
            self.expected = (self.expected + 1) % self.seq_space;
        }
    }
}

impl Endpoint for Receiver {
    fn id(&self) -> EndpointId {
        EndpointId::B
    }

    fn on_send_request(
        &mut self,
        _env: &mut impl Environment,
        _message: Message,
    ) -> Result<SendStatus, ArqError> {
        Err(ArqError::Unidirectional(EndpointId::B))
    }

    fn on_packet_arrival(
        &mut self,
        env: &mut impl Environment,
        packet: Packet,
    ) -> Result<(), ArqError> {
        if is_corrupted(&packet) {
            self.stats.corrupted += 1;
            tracing::debug!("Corrupted packet discarded");
            return Ok(());
        }
        let seqnum = match packet.header {
            Header::Data { seqnum } if seqnum < self.seq_space => seqnum,
            header => {
                self.stats.corrupted += 1;
                tracing::warn!(?header, "Unexpected packet arrived at the receiver, discarded");
                return Ok(());
            }
        };
        self.stats.packets_received += 1;

        if !self.in_window(seqnum) {
            // Already delivered. Its acknowledgment must have been lost.
            self.stats.duplicates += 1;
            tracing::debug!(seqnum, "Packet already delivered");
        } else if self.slots[seqnum as usize].is_some() {
            self.stats.duplicates += 1;
            tracing::debug!(seqnum, "Packet already buffered");
        } else {
            tracing::debug!(seqnum, "Packet received");
            self.slots[seqnum as usize] = Some(packet.payload);
            self.drain(env);
        }

        tracing::debug!(acknum = seqnum, "Sending acknowledgment");
        env.send_to_channel(EndpointId::B, Packet::ack(seqnum));
        Ok(())
    }

    fn on_timer_expiry(&mut self, _env: &mut impl Environment) -> Result<(), ArqError> {
        tracing::warn!("The receiver has no timer, expiry ignored");
        Ok(())
    }

    fn outstanding(&self) -> usize {
        0
    }
}
