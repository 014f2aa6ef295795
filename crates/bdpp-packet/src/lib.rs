//! Packets for the Bidirectional Packet Protocol (BDPP).
//!
//! A packet is a fixed-capacity buffer laid out exactly as it travels on the
//! wire, minus separator and escape bytes:
//! - 1 byte of flags (usage + processing bits)
//! - 1 byte of packed indexes (packet index low nibble, stream high nibble)
//! - 2 bytes little-endian payload length
//! - the payload
//!
//! The [`wire`] module adds and strips the separator/escape layer.

pub mod error;
pub mod flags;
pub mod header;
pub mod message;
pub mod packet;
pub mod reader;
pub mod wire;
pub mod writer;

#[cfg(feature = "async")]
pub mod codec;

#[cfg(feature = "async")]
pub use codec::BdppCodec;
pub use error::{PacketError, Result};
pub use flags::{
    ContentKind, MessagePosition, Ownership, PacketFlags, MAX_APP_PACKETS, MAX_DRIVER_PACKETS,
    MAX_PACKET_DATA_SIZE, MAX_RX_PACKETS, MAX_STREAMS, SMALL_PACKET_DATA_SIZE,
};
pub use header::{PacketHeader, HEADER_SIZE};
pub use message::{packetize, MessageAssembler};
pub use packet::Packet;
pub use reader::PacketReader;
pub use wire::{encode_packet, WireDecoder, WireEvent, WireStats};
pub use writer::PacketWriter;
