//! A Selective-Repeat ARQ data plane, and a simulator to run it in.
//!
//! Two endpoints exchange fixed-size messages over a channel that may lose,
//! corrupt and delay packets, but never reorders them. Endpoint
//! [`A`](EndpointId::A) runs the [`Sender`] and endpoint
//! [`B`](EndpointId::B) runs the [`Receiver`].
//!
//! # Organization
//! - [`Packet`] and [`Message`] make up the data model, and [`checksum`]
//!   guards it
//! - [`Sender`] and [`Receiver`] implement the protocol as [`Endpoint`]s
//!   reacting to send requests, packet arrivals and timer expiries
//! - [`Environment`] is everything an endpoint can ask of the world around it:
//!   transmit a packet, deliver a payload, arm or disarm its timer
//! - [`Sim`] provides the actual simulation
//!
//! # Driving an endpoint by hand
//!
//! Endpoints do no I/O of their own. Any [`Environment`] can drive them, which
//! makes it easy to step through an exchange one event at a time:
//!
//! ```
//! use sr_arq::*;
//!
//! let config = Config::default();
//! let mut sender = Sender::new(&config);
//! let mut receiver = Receiver::new(&config);
//! let mut env = Recorder::new();
//!
//! sender.on_send_request(&mut env, Message::filled(b'a')).unwrap();
//! let packet = env.take_sent().remove(0);
//! receiver.on_packet_arrival(&mut env, packet).unwrap();
//! assert_eq!(env.take_delivered(), vec![[b'a'; PAYLOAD_SIZE]]);
//!
//! let ack = env.take_sent().remove(0);
//! sender.on_packet_arrival(&mut env, ack).unwrap();
//! assert_eq!(sender.outstanding(), 0);
//! ```

pub mod checksum;

pub mod config;
pub use config::Config;

pub mod packet;
pub use packet::{Header, Message, Packet, Payload, SeqNum, PAYLOAD_SIZE};

pub mod environment;
pub use environment::{Action, EndpointId, Environment, Recorder};

pub mod timer;

pub mod endpoint;
pub use endpoint::{ArqError, Endpoint, SendStatus};

pub mod sender;
pub use sender::Sender;

pub mod receiver;
pub use receiver::Receiver;

pub mod shutdown;
pub use shutdown::{ExitStatus, Shutdown};

pub mod sim;
pub use sim::{Report, Sim, SimConfig};

pub mod simulations;

pub mod cli;
pub mod logging;
