//! The application at A, offering messages at random intervals.

use super::Inbound;
use crate::{packet::Message, shutdown::Shutdown};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use std::time::Duration;
use tokio::sync::mpsc;

/// The `index`th message: twenty copies of a letter, cycling through the
/// alphabet.
pub fn nth_message(index: usize) -> Message {
    Message::filled(b'a' + (index % 26) as u8)
}

/// Offers `messages` messages to the sender, each after a pause drawn
/// uniformly from `[0, 2 * interval]`, then says it is finished. Returns how
/// many messages were offered.
pub(crate) async fn offer(
    messages: usize,
    interval: Duration,
    seed: u64,
    sender: mpsc::UnboundedSender<Inbound>,
    mut shutdown: Shutdown,
) -> usize {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut offered = 0;
    for index in 0..messages {
        let pause = interval.mul_f64(rng.gen_range(0.0..=2.0));
        tokio::select! {
            _ = shutdown.wait_for_shutdown() => return offered,
            _ = tokio::time::sleep(pause) => {}
        }
        if sender.send(Inbound::Message(nth_message(index))).is_err() {
            return offered;
        }
        offered += 1;
    }
    tracing::debug!(offered, "Application finished offering messages");
    // The sender may already be gone if the simulation was cut short
    let _ = sender.send(Inbound::Finished);
    offered
}
