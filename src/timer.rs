//! The sender's single retransmission timer.
//!
//! The environment owns the clock; [`RetransmitTimer`] mirrors whether the
//! environment's timer is armed so that the sender can never hold two of
//! them. Starting an armed timer is a logic error and is reported as one.
//! Stopping a stopped timer does nothing.

use crate::environment::{EndpointId, Environment};
use std::time::Duration;
use thiserror::Error as ThisError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetransmitTimer {
    owner: EndpointId,
    duration: Duration,
    armed: bool,
}

impl RetransmitTimer {
    pub fn new(owner: EndpointId, duration: Duration) -> Self {
        Self {
            owner,
            duration,
            armed: false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Arms the timer for one timeout period.
    pub fn start(&mut self, env: &mut impl Environment) -> Result<(), TimerError> {
        if self.armed {
            Err(TimerError::AlreadyRunning(self.owner))?
        }
        self.armed = true;
        env.start_timer(self.owner, self.duration);
        Ok(())
    }

    /// Disarms the timer if it is armed.
    pub fn stop(&mut self, env: &mut impl Environment) {
        if self.armed {
            self.armed = false;
            env.stop_timer(self.owner);
        }
    }

    /// Records that the environment's timer went off. Returns whether the
    /// timer was armed at the time, which it should have been.
    pub fn expire(&mut self) -> bool {
        std::mem::replace(&mut self.armed, false)
    }
}

#[derive(Debug, ThisError, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    #[error("The timer of endpoint {0} was started while already running")]
    AlreadyRunning(EndpointId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{Action, Recorder};

    const TIMEOUT: Duration = Duration::from_millis(16);

    #[test]
    fn start_then_stop() {
        let mut env = Recorder::new();
        let mut timer = RetransmitTimer::new(EndpointId::A, TIMEOUT);
        timer.start(&mut env).unwrap();
        assert!(timer.is_armed());
        timer.stop(&mut env);
        assert!(!timer.is_armed());
        assert_eq!(
            env.take(),
            vec![
                Action::StartTimer(EndpointId::A, TIMEOUT),
                Action::StopTimer(EndpointId::A)
            ]
        );
    }

    #[test]
    fn double_start_is_an_error() {
        let mut env = Recorder::new();
        let mut timer = RetransmitTimer::new(EndpointId::A, TIMEOUT);
        timer.start(&mut env).unwrap();
        assert_eq!(
            timer.start(&mut env),
            Err(TimerError::AlreadyRunning(EndpointId::A))
        );
        assert_eq!(env.take().len(), 1);
    }

    #[test]
    fn stop_is_idempotent() {
        let mut env = Recorder::new();
        let mut timer = RetransmitTimer::new(EndpointId::A, TIMEOUT);
        timer.stop(&mut env);
        timer.stop(&mut env);
        assert!(env.actions().is_empty());
    }

    #[test]
    fn expiry_disarms_without_stopping() {
        let mut env = Recorder::new();
        let mut timer = RetransmitTimer::new(EndpointId::A, TIMEOUT);
        assert!(!timer.expire());
        timer.start(&mut env).unwrap();
        env.take();
        assert!(timer.expire());
        assert!(!timer.is_armed());
        timer.stop(&mut env);
        assert!(env.actions().is_empty());
        timer.start(&mut env).unwrap();
    }
}
