//! Protocol constants shared by both endpoints.

use std::time::Duration;
use thiserror::Error as ThisError;

/// The parameters that shape the protocol.
///
/// Both endpoints must be built from the same configuration: the receiver's
/// notion of the window has to agree with the sender's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    window_size: u32,
    seq_space: u32,
    timeout: Duration,
}

impl Config {
    /// The maximum number of buffered, unacknowledged packets.
    pub const DEFAULT_WINDOW_SIZE: u32 = 6;
    /// The modulus of sequence numbers. Must be at least twice the window.
    pub const DEFAULT_SEQ_SPACE: u32 = 12;
    /// The retransmission timeout, 16 simulated time units.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(16);

    /// Creates a validated configuration.
    pub fn new(window_size: u32, seq_space: u32, timeout: Duration) -> Result<Self, ConfigError> {
        if window_size == 0 {
            Err(ConfigError::EmptyWindow)?
        }
        // Sequence numbers travel in a signed 32-bit field next to a negative
        // sentinel, so they must stay non-negative once cast.
        if seq_space > i32::MAX as u32 {
            Err(ConfigError::SeqSpaceTooLarge(seq_space))?
        }
        if (seq_space as u64) < 2 * window_size as u64 {
            Err(ConfigError::SeqSpaceTooSmall {
                seq_space,
                window_size,
            })?
        }
        if timeout.is_zero() {
            Err(ConfigError::ZeroTimeout)?
        }
        Ok(Self {
            window_size,
            seq_space,
            timeout,
        })
    }

    pub fn window_size(&self) -> u32 {
        self.window_size
    }

    pub fn seq_space(&self) -> u32 {
        self.seq_space
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_size: Self::DEFAULT_WINDOW_SIZE,
            seq_space: Self::DEFAULT_SEQ_SPACE,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, ThisError, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("The window must hold at least one packet")]
    EmptyWindow,
    #[error("A sequence space of {seq_space} cannot disambiguate a window of {window_size}; it must be at least twice the window")]
    SeqSpaceTooSmall { seq_space: u32, window_size: u32 },
    #[error("A sequence space of {0} does not fit the packet header")]
    SeqSpaceTooLarge(u32),
    #[error("The retransmission timeout must be longer than zero")]
    ZeroTimeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let default = Config::default();
        assert_eq!(
            Config::new(
                default.window_size(),
                default.seq_space(),
                default.timeout()
            ),
            Ok(default)
        );
    }

    #[test]
    fn rejects_small_sequence_space() {
        assert_eq!(
            Config::new(6, 11, Config::DEFAULT_TIMEOUT),
            Err(ConfigError::SeqSpaceTooSmall {
                seq_space: 11,
                window_size: 6
            })
        );
        assert!(Config::new(6, 12, Config::DEFAULT_TIMEOUT).is_ok());
        assert!(Config::new(6, 13, Config::DEFAULT_TIMEOUT).is_ok());
    }

    #[test]
    fn rejects_degenerate_values() {
        assert_eq!(
            Config::new(0, 12, Config::DEFAULT_TIMEOUT),
            Err(ConfigError::EmptyWindow)
        );
        assert_eq!(
            Config::new(6, 12, Duration::ZERO),
            Err(ConfigError::ZeroTimeout)
        );
        assert_eq!(
            Config::new(6, u32::MAX, Config::DEFAULT_TIMEOUT),
            Err(ConfigError::SeqSpaceTooLarge(u32::MAX))
        );
    }
}
