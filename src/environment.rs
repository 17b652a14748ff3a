//! What an endpoint may ask of the world around it.

use crate::packet::{Packet, Payload};
use std::{fmt, time::Duration};

/// Names one of the two peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointId {
    /// The sending side
    A,
    /// The receiving side
    B,
}

impl EndpointId {
    /// The endpoint on the other end of the channel.
    pub const fn peer(self) -> Self {
        match self {
            EndpointId::A => EndpointId::B,
            EndpointId::B => EndpointId::A,
        }
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointId::A => f.write_str("A"),
            EndpointId::B => f.write_str("B"),
        }
    }
}

/// The calls an endpoint makes on its environment.
///
/// Every call is fire-and-forget. The environment is free to drop, corrupt or
/// delay the packets it is handed.
pub trait Environment {
    /// Hands a packet to the channel toward the peer.
    fn send_to_channel(&mut self, from: EndpointId, packet: Packet);

    /// Delivers an in-order payload to the local application.
    fn deliver_to_application(&mut self, at: EndpointId, payload: Payload);

    /// Arms the endpoint's single timer.
    fn start_timer(&mut self, at: EndpointId, duration: Duration);

    /// Disarms the endpoint's single timer.
    fn stop_timer(&mut self, at: EndpointId);
}

/// One call made on a [`Recorder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Send(EndpointId, Packet),
    Deliver(EndpointId, Payload),
    StartTimer(EndpointId, Duration),
    StopTimer(EndpointId),
}

/// An [`Environment`] that only remembers what it was asked to do.
#[derive(Debug, Default, Clone)]
pub struct Recorder {
    actions: Vec<Action>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every action still recorded.
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn take(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.actions)
    }

    /// Removes the sent packets and returns them. Other actions stay
    /// recorded.
    pub fn take_sent(&mut self) -> Vec<Packet> {
        let mut sent = Vec::new();
        self.actions.retain(|action| match action {
            Action::Send(_, packet) => {
                sent.push(*packet);
                false
            }
            _ => true,
        });
        sent
    }

    /// Removes the delivered payloads and returns them. Other actions stay
    /// recorded.
    pub fn take_delivered(&mut self) -> Vec<Payload> {
        let mut delivered = Vec::new();
        self.actions.retain(|action| match action {
            Action::Deliver(_, payload) => {
                delivered.push(*payload);
                false
            }
            _ => true,
        });
        delivered
    }
}

impl Environment for Recorder {
    fn send_to_channel(&mut self, from: EndpointId, packet: Packet) {
        self.actions.push(Action::Send(from, packet));
    }

    fn deliver_to_application(&mut self, at: EndpointId, payload: Payload) {
        self.actions.push(Action::Deliver(at, payload));
    }

    fn start_timer(&mut self, at: EndpointId, duration: Duration) {
        self.actions.push(Action::StartTimer(at, duration));
    }

    fn stop_timer(&mut self, at: EndpointId) {
        self.actions.push(Action::StopTimer(at));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_delivered_keeps_the_rest() {
        let mut env = Recorder::new();
        env.deliver_to_application(EndpointId::B, [b'a'; 20]);
        env.send_to_channel(EndpointId::B, Packet::ack(0));
        env.deliver_to_application(EndpointId::B, [b'b'; 20]);

        assert_eq!(env.take_delivered(), vec![[b'a'; 20], [b'b'; 20]]);
        assert_eq!(
            env.actions(),
            &[Action::Send(EndpointId::B, Packet::ack(0))]
        );
        assert!(env.take_delivered().is_empty());
        assert_eq!(env.take_sent(), vec![Packet::ack(0)]);
        assert!(env.actions().is_empty());
    }

    #[test]
    fn take_sent_keeps_the_timer() {
        let mut env = Recorder::new();
        env.send_to_channel(EndpointId::A, Packet::data(0, [0; 20]));
        env.start_timer(EndpointId::A, Duration::from_millis(16));

        assert_eq!(env.take_sent(), vec![Packet::data(0, [0; 20])]);
        assert_eq!(
            env.take(),
            vec![Action::StartTimer(EndpointId::A, Duration::from_millis(16))]
        );
    }
}
