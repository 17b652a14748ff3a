//! The integrity check shared by both endpoints.
//!
//! The checksum is the plain sum of every payload byte and both header
//! fields, with the unused field contributing its sentinel value. It is the
//! only integrity signal in the protocol: a packet that fails it is dropped by
//! whichever endpoint receives it, and no negative acknowledgment is sent.

use crate::packet::Packet;

pub type Checksum = i32;

/// Computes the checksum a packet should carry.
pub fn compute_checksum(packet: &Packet) -> Checksum {
    let (seqnum, acknum) = packet.header.fields();
    packet
        .payload
        .iter()
        .fold(0i32, |sum, &byte| sum.wrapping_add(byte as i32))
        .wrapping_add(seqnum)
        .wrapping_add(acknum)
}

/// Whether the checksum carried by the packet disagrees with its contents.
pub fn is_corrupted(packet: &Packet) -> bool {
    packet.checksum != compute_checksum(packet)
}
