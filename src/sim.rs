//! Runs the two endpoints against a simulated channel.
//!
//! Each endpoint lives in its own task and owns all of its state. Events for
//! an endpoint arrive through a single inbox and are handled one at a time,
//! so no handler ever observes another one half-way through.
//!
//! ```text
//!  application ──▶ [A inbox] ──▶ Sender ──▶ link A→B ──▶ [B inbox] ──▶ Receiver
//!                      ▲                                                   │
//!                      └────────────────── link B→A ◀──────────────────────┘
//! ```

mod application;
pub use application::nth_message;

mod channel;
pub use channel::{ChannelConfig, ChannelConfigError, ChannelStats};
use channel::{run_link, Link};

use crate::{
    config::Config,
    endpoint::{ArqError, Endpoint},
    environment::{EndpointId, Environment},
    packet::{Message, Packet, Payload},
    receiver::{Receiver, ReceiverStats},
    sender::{Sender, SenderStats},
    shutdown::{ExitStatus, Shutdown},
};
use std::{fmt, time::Duration};
use thiserror::Error as ThisError;
use tokio::{
    sync::mpsc,
    task::{JoinError, JoinSet},
    time::Instant,
};
use tracing::Instrument;

/// An event bound for one endpoint.
#[derive(Debug)]
pub(crate) enum Inbound {
    /// The application wants this sent
    Message(Message),
    /// A serialized packet came off the channel
    Packet(Vec<u8>),
    /// The application has nothing more to send
    Finished,
}

/// Everything needed to set up a simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimConfig {
    pub protocol: Config,
    pub channel: ChannelConfig,
    /// How many messages the application offers
    pub messages: usize,
    /// The mean pause between two messages
    pub interval: Duration,
    /// Seeds every random decision in the simulation
    pub seed: u64,
    /// How long the simulation may run before it is cut short
    pub time_limit: Duration,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            protocol: Config::default(),
            channel: ChannelConfig::default(),
            messages: 20,
            interval: Duration::from_millis(10),
            seed: 0xBAD5EED,
            time_limit: Duration::from_secs(60),
        }
    }
}

/// A struct used to coordinate a simulation.
///
/// # Examples
///
/// ```
/// use sr_arq::{ExitStatus, Sim, SimConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let report = Sim::new(SimConfig::default()).run().await.unwrap();
/// assert_eq!(report.status, ExitStatus::Exited);
/// assert!(report.in_order());
/// # }
/// ```
#[derive(Debug)]
pub struct Sim {
    config: SimConfig,
    shutdown: Shutdown,
}

impl Sim {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            shutdown: Shutdown::new(),
        }
    }

    /// Gets an active [`Shutdown`] that can be used to shut down the sim.
    pub fn get_shutdown(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Runs the simulation until the application's messages are all
    /// acknowledged, the time limit passes, or someone shuts it down.
    pub async fn run(self) -> Result<Report, SimError> {
        let SimConfig {
            protocol,
            channel,
            messages,
            interval,
            seed,
            time_limit,
        } = self.config;
        let shutdown = self.shutdown;
        let start = Instant::now();
        tracing::info!(messages, ?channel, "Simulation starting");

        let (a_inbox, a_events) = mpsc::unbounded_channel();
        let (b_inbox, b_events) = mpsc::unbounded_channel();
        let (a_transits, a_link) = mpsc::unbounded_channel();
        let (b_transits, b_link) = mpsc::unbounded_channel();

        let mut links = JoinSet::new();
        links.spawn(run_link(a_link, b_inbox, shutdown.clone()));
        links.spawn(run_link(b_link, a_inbox.clone(), shutdown.clone()));

        let sender = tokio::spawn(
            drive(
                Sender::new(&protocol),
                TaskEnvironment::new(Link::new(channel, seed, a_transits)),
                a_events,
                shutdown.clone(),
            )
            .instrument(tracing::info_span!("endpoint", id = %EndpointId::A)),
        );
        let receiver = tokio::spawn(
            drive(
                Receiver::new(&protocol),
                TaskEnvironment::new(Link::new(channel, seed.wrapping_add(1), b_transits)),
                b_events,
                shutdown.clone(),
            )
            .instrument(tracing::info_span!("endpoint", id = %EndpointId::B)),
        );
        let application = tokio::spawn(application::offer(
            messages,
            interval,
            seed.wrapping_add(2),
            a_inbox,
            shutdown.clone(),
        ));

        let mut waiter = shutdown.clone();
        let status = match tokio::time::timeout(time_limit, waiter.wait_for_shutdown()).await {
            Ok(status) => status,
            Err(_) => {
                shutdown.shut_down_with_status(ExitStatus::TimedOut);
                // Someone else may have gotten there first
                shutdown.status().unwrap_or(ExitStatus::TimedOut)
            }
        };

        let offered = application.await?;
        let sender = sender.await??;
        let receiver = receiver.await??;
        while let Some(result) = links.join_next().await {
            result?;
        }

        let mut channel = sender.channel;
        channel += receiver.channel;
        let report = Report {
            status,
            offered,
            accepted: sender.accepted,
            delivered: receiver.delivered,
            sender: sender.endpoint.stats(),
            receiver: receiver.endpoint.stats(),
            channel,
            malformed: sender.malformed + receiver.malformed,
            elapsed: start.elapsed(),
        };
        tracing::info!(?status, elapsed = ?report.elapsed, "Simulation finished");
        Ok(report)
    }
}

/// The environment of an endpoint task.
#[derive(Debug)]
struct TaskEnvironment {
    link: Link,
    delivered: Vec<Payload>,
    deadline: Option<Instant>,
}

impl TaskEnvironment {
    fn new(link: Link) -> Self {
        Self {
            link,
            delivered: Vec::new(),
            deadline: None,
        }
    }
}

impl Environment for TaskEnvironment {
    fn send_to_channel(&mut self, _from: EndpointId, packet: Packet) {
        self.link.transmit(packet.serialize());
    }

    fn deliver_to_application(&mut self, _at: EndpointId, payload: Payload) {
        self.delivered.push(payload);
    }

    fn start_timer(&mut self, _at: EndpointId, duration: Duration) {
        self.deadline = Some(Instant::now() + duration);
    }

    fn stop_timer(&mut self, _at: EndpointId) {
        self.deadline = None;
    }
}

/// What an endpoint task leaves behind.
struct Outcome<E> {
    endpoint: E,
    accepted: Vec<Message>,
    delivered: Vec<Payload>,
    channel: ChannelStats,
    malformed: u64,
}

/// Runs an endpoint until the simulation shuts down. A failing handler
/// brings the whole simulation down with it.
async fn drive<E: Endpoint>(
    endpoint: E,
    env: TaskEnvironment,
    events: mpsc::UnboundedReceiver<Inbound>,
    shutdown: Shutdown,
) -> Result<Outcome<E>, SimError> {
    let id = endpoint.id();
    let result = handle_events(endpoint, env, events, shutdown.clone()).await;
    if let Err(e) = &result {
        tracing::error!("Endpoint {} failed: {}", id, e);
        shutdown.shut_down_with_status(ExitStatus::Failed);
    }
    result.map_err(|source| SimError::Endpoint { id, source })
}

async fn handle_events<E: Endpoint>(
    mut endpoint: E,
    mut env: TaskEnvironment,
    mut events: mpsc::UnboundedReceiver<Inbound>,
    shutdown: Shutdown,
) -> Result<Outcome<E>, ArqError> {
    let mut waiter = shutdown.clone();
    let mut accepted = Vec::new();
    let mut malformed = 0;
    let mut finished = false;

    loop {
        let deadline = env.deadline;
        tokio::select! {
            biased;
            _ = waiter.wait_for_shutdown() => break,
            event = events.recv() => match event {
                Some(Inbound::Message(message)) => {
                    if endpoint.on_send_request(&mut env, message)?.is_accepted() {
                        accepted.push(message);
                    }
                }
                Some(Inbound::Packet(bytes)) => match Packet::parse(&bytes) {
                    Ok(packet) => endpoint.on_packet_arrival(&mut env, packet)?,
                    Err(e) => {
                        malformed += 1;
                        tracing::debug!("Malformed packet discarded: {}", e);
                    }
                },
                Some(Inbound::Finished) => finished = true,
                None => break,
            },
            _ = expiry(deadline) => {
                env.deadline = None;
                endpoint.on_timer_expiry(&mut env)?;
            }
        }

        if finished && endpoint.outstanding() == 0 {
            shutdown.shut_down();
            break;
        }
    }

    Ok(Outcome {
        endpoint,
        accepted,
        channel: env.link.stats(),
        delivered: env.delivered,
        malformed,
    })
}

async fn expiry(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// The results of a simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub status: ExitStatus,
    /// Messages the application offered to the sender
    pub offered: usize,
    /// Messages the sender took on, in order
    pub accepted: Vec<Message>,
    /// Payloads the receiver handed to its application, in order
    pub delivered: Vec<Payload>,
    pub sender: SenderStats,
    pub receiver: ReceiverStats,
    /// Both directions of the channel
    pub channel: ChannelStats,
    /// Packets that arrived too garbled to parse
    pub malformed: u64,
    /// Simulated time from start to finish
    pub elapsed: Duration,
}

impl Report {
    /// Whether the receiver delivered exactly the accepted messages, in
    /// order. A run that was cut short may still be missing a suffix.
    pub fn in_order(&self) -> bool {
        self.delivered.len() <= self.accepted.len()
            && self
                .delivered
                .iter()
                .zip(self.accepted.iter())
                .all(|(delivered, accepted)| delivered == accepted.data())
    }

    /// Whether every accepted message was delivered, in order.
    pub fn is_complete(&self) -> bool {
        self.in_order() && self.delivered.len() == self.accepted.len()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Simulation {:?} after {:?}", self.status, self.elapsed)?;
        writeln!(f, "  messages offered:            {}", self.offered)?;
        writeln!(f, "  messages accepted:           {}", self.accepted.len())?;
        writeln!(f, "  rejected, window full:       {}", self.sender.window_full)?;
        writeln!(f, "  messages delivered at B:     {}", self.delivered.len())?;
        writeln!(f, "  packets sent by A:           {}", self.sender.packets_sent)?;
        writeln!(f, "  packets resent by A:         {}", self.sender.packets_resent)?;
        writeln!(f, "  new ACKs received at A:      {}", self.sender.new_acks)?;
        writeln!(f, "  duplicate ACKs at A:         {}", self.sender.duplicate_acks)?;
        writeln!(f, "  packets received at B:       {}", self.receiver.packets_received)?;
        writeln!(f, "  duplicates at B:             {}", self.receiver.duplicates)?;
        writeln!(
            f,
            "  corrupted discarded (A/B):   {}/{}",
            self.sender.corrupted, self.receiver.corrupted
        )?;
        writeln!(f, "  malformed discarded:         {}", self.malformed)?;
        writeln!(f, "  channel transmissions:       {}", self.channel.transmitted)?;
        writeln!(f, "  channel losses:              {}", self.channel.lost)?;
        write!(f, "  channel corruptions:         {}", self.channel.corrupted)
    }
}

#[derive(Debug, ThisError)]
pub enum SimError {
    #[error("Endpoint {id} failed: {source}")]
    Endpoint { id: EndpointId, source: ArqError },
    #[error("A simulation task panicked or was cancelled: {0}")]
    Join(#[from] JoinError),
}
