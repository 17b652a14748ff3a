//! Messages, packets and their wire format.

use crate::checksum::{compute_checksum, Checksum};
use thiserror::Error as ThisError;

/// The number of bytes in every message and packet payload
pub const PAYLOAD_SIZE: usize = 20;

/// The number of bytes in a serialized packet
pub const PACKET_OCTETS: usize = 12 + PAYLOAD_SIZE;

/// Fills the header field that a packet does not use
pub const NOT_IN_USE: i32 = -1;

/// The fill byte of acknowledgment payloads
const ACK_FILL: u8 = b'0';

pub type Payload = [u8; PAYLOAD_SIZE];

/// A sequence number, always taken modulo the configured sequence space.
pub type SeqNum = u32;

/// An opaque, fixed-size message handed down by the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Message {
    data: Payload,
}

impl Message {
    pub const fn new(data: Payload) -> Self {
        Self { data }
    }

    /// A message made of one repeated byte.
    pub const fn filled(byte: u8) -> Self {
        Self::new([byte; PAYLOAD_SIZE])
    }

    pub fn data(&self) -> &Payload {
        &self.data
    }

    pub fn into_payload(self) -> Payload {
        self.data
    }
}

impl From<Payload> for Message {
    fn from(data: Payload) -> Self {
        Self::new(data)
    }
}

impl TryFrom<&[u8]> for Message {
    type Error = ParseError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let data = bytes
            .try_into()
            .map_err(|_| ParseError::PayloadLength(bytes.len()))?;
        Ok(Self::new(data))
    }
}

/// Says which of the two roles a packet plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Header {
    /// Carries application data from A to B
    Data { seqnum: SeqNum },
    /// Acknowledges a single data packet, from B to A
    Ack { acknum: SeqNum },
}

impl Header {
    /// The `(seqnum, acknum)` fields as they appear on the wire, with the
    /// unused one set to [`NOT_IN_USE`].
    pub fn fields(&self) -> (i32, i32) {
        match *self {
            Header::Data { seqnum } => (seqnum as i32, NOT_IN_USE),
            Header::Ack { acknum } => (NOT_IN_USE, acknum as i32),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Packet {
    pub header: Header,
    pub checksum: Checksum,
    pub payload: Payload,
}

impl Packet {
    /// Creates a data packet with a valid checksum.
    pub fn data(seqnum: SeqNum, payload: Payload) -> Self {
        Self::new(Header::Data { seqnum }, payload)
    }

    /// Creates a pure acknowledgment with a valid checksum.
    pub fn ack(acknum: SeqNum) -> Self {
        Self::new(Header::Ack { acknum }, [ACK_FILL; PAYLOAD_SIZE])
    }

    fn new(header: Header, payload: Payload) -> Self {
        let mut packet = Self {
            header,
            checksum: 0,
            payload,
        };
        packet.checksum = compute_checksum(&packet);
        packet
    }

    pub fn seqnum(&self) -> Option<SeqNum> {
        match self.header {
            Header::Data { seqnum } => Some(seqnum),
            Header::Ack { .. } => None,
        }
    }

    pub fn acknum(&self) -> Option<SeqNum> {
        match self.header {
            Header::Ack { acknum } => Some(acknum),
            Header::Data { .. } => None,
        }
    }

    /// Serializes the packet into its 32-byte wire form.
    pub fn serialize(&self) -> Vec<u8> {
        let (seqnum, acknum) = self.header.fields();
        let mut out = Vec::with_capacity(PACKET_OCTETS);
        out.extend_from_slice(&seqnum.to_be_bytes());
        out.extend_from_slice(&acknum.to_be_bytes());
        out.extend_from_slice(&self.checksum.to_be_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    /// Parses a packet from its wire form.
    ///
    /// The checksum is carried over as-is. Whether it matches is for the
    /// receiving endpoint to decide.
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        if bytes.len() < PACKET_OCTETS {
            Err(ParseError::HeaderTooShort)?
        }
        let seqnum = read_i32(bytes, 0);
        let acknum = read_i32(bytes, 4);
        let checksum = read_i32(bytes, 8);
        let payload: Payload = bytes[12..PACKET_OCTETS]
            .try_into()
            .map_err(|_| ParseError::PayloadLength(bytes.len() - 12))?;

        let header = match (seqnum, acknum) {
            (NOT_IN_USE, NOT_IN_USE) => Err(ParseError::NoFieldInUse)?,
            (NOT_IN_USE, acknum) if acknum >= 0 => Header::Ack {
                acknum: acknum as SeqNum,
            },
            (seqnum, NOT_IN_USE) if seqnum >= 0 => Header::Data {
                seqnum: seqnum as SeqNum,
            },
            (seqnum, acknum) if seqnum >= 0 && acknum >= 0 => Err(ParseError::BothFieldsInUse)?,
            (seqnum, acknum) => Err(ParseError::NegativeField(seqnum.min(acknum)))?,
        };

        Ok(Self {
            header,
            checksum,
            payload,
        })
    }
}

fn read_i32(bytes: &[u8], at: usize) -> i32 {
    i32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

#[derive(Debug, ThisError, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    #[error("Too few bytes to constitute a packet")]
    HeaderTooShort,
    #[error("Expected a 20 byte payload, found {0} bytes")]
    PayloadLength(usize),
    #[error("Neither the sequence number nor the acknowledgment number is in use")]
    NoFieldInUse,
    #[error("Both the sequence number and the acknowledgment number are in use")]
    BothFieldsInUse,
    #[error("A header field holds the negative value {0}")]
    NegativeField(i32),
}
