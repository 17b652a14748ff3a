//! The [`Endpoint`] trait and supporting types.

use crate::{
    environment::{EndpointId, Environment},
    packet::{Message, Packet, SeqNum},
    timer::TimerError,
};
use thiserror::Error as ThisError;

/// One side of the protocol, driven by three kinds of events.
///
/// Each handler runs to completion before the next event is delivered.
/// Packet arrivals and timer expiries may interleave in any order, and no
/// handler relies on another having just run.
pub trait Endpoint {
    fn id(&self) -> EndpointId;

    /// The local application has a message for the peer.
    fn on_send_request(
        &mut self,
        env: &mut impl Environment,
        message: Message,
    ) -> Result<SendStatus, ArqError>;

    /// A packet came in from the channel. It may be corrupted.
    fn on_packet_arrival(
        &mut self,
        env: &mut impl Environment,
        packet: Packet,
    ) -> Result<(), ArqError>;

    /// The endpoint's timer went off.
    fn on_timer_expiry(&mut self, env: &mut impl Environment) -> Result<(), ArqError>;

    /// The number of packets still waiting for an acknowledgment.
    fn outstanding(&self) -> usize;
}

/// What became of a send request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// The message went out with the given sequence number.
    Accepted(SeqNum),
    /// The window was full. The message was dropped and it is up to the
    /// application to offer it again later.
    WindowFull,
}

impl SendStatus {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SendStatus::Accepted(_))
    }
}

#[derive(Debug, ThisError, Clone, Copy, PartialEq, Eq)]
pub enum ArqError {
    #[error("{0}")]
    Timer(#[from] TimerError),
    #[error("Endpoint {0} does not send application data")]
    Unidirectional(EndpointId),
}
