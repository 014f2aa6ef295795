//! `tokio_util` codec for host-side async tooling.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::error::PacketError;
use crate::flags::DONE;
use crate::packet::Packet;
use crate::wire::{encode_packet, WireDecoder, WireEvent, WireStats};

/// Frames packets on an async byte stream.
///
/// Decoding drops malformed frames the same way the interrupt-side framer
/// does, so a `FramedRead` never ends on one corrupt frame.
#[derive(Debug, Default)]
pub struct BdppCodec {
    decoder: WireDecoder,
    target: Option<Packet>,
}

impl BdppCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> WireStats {
        self.decoder.stats()
    }
}

impl Decoder for BdppCodec {
    type Item = Packet;
    type Error = PacketError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Packet>, PacketError> {
        let mut consumed = 0usize;
        let mut complete = None;

        for &byte in src.iter() {
            consumed += 1;
            if self.target.is_none() {
                self.target = Some(Packet::try_create_rx()?);
            }
            let Some(target) = self.target.as_mut() else {
                continue;
            };
            match self.decoder.push(byte, target) {
                WireEvent::Pending => {}
                WireEvent::Complete => {
                    complete = self.target.take();
                    break;
                }
                WireEvent::Discarded(err) => {
                    warn!(error = %err, "dropping malformed frame");
                }
            }
        }

        src.advance(consumed);
        Ok(complete.map(|mut packet| {
            packet.set_flags(DONE);
            packet
        }))
    }
}

impl Encoder<Packet> for BdppCodec {
    type Error = PacketError;

    fn encode(&mut self, packet: Packet, dst: &mut BytesMut) -> Result<(), PacketError> {
        encode_packet(&packet, dst);
        Ok(())
    }
}

impl Encoder<&Packet> for BdppCodec {
    type Error = PacketError;

    fn encode(&mut self, packet: &Packet, dst: &mut BytesMut) -> Result<(), PacketError> {
        encode_packet(packet, dst);
        Ok(())
    }
}
