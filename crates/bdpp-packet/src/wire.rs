//! Wire adapter: separator/escape framing around packets.
//!
//! Matches the UART-DMA engine's default framing, so the counterpart firmware
//! sees the same byte stream whether the hardware or this code escapes it:
//! ```text
//! 0xC0  escape(header ‖ payload)  0xC0
//!        0xC0 -> 0xDB 0xDC
//!        0xDB -> 0xDB 0xDD
//! ```

use bytes::{BufMut, BytesMut};
use tracing::trace;

use crate::error::PacketError;
use crate::flags::Ownership;
use crate::header::HEADER_SIZE;
use crate::packet::Packet;

/// Frame delimiter.
pub const SEPARATOR: u8 = 0xC0;
/// Escape introducer.
pub const ESCAPE: u8 = 0xDB;
/// Escaped form of [`SEPARATOR`] (follows [`ESCAPE`]).
pub const ESCAPED_SEPARATOR: u8 = 0xDC;
/// Escaped form of [`ESCAPE`] (follows [`ESCAPE`]).
pub const ESCAPED_ESCAPE: u8 = 0xDD;

/// Encode one packet (header and valid payload) as a delimited frame.
pub fn encode_packet(packet: &Packet, dst: &mut BytesMut) {
    encode_frame(packet.wire_bytes(), dst);
}

/// Escape `raw` and wrap it in separators.
pub fn encode_frame(raw: &[u8], dst: &mut BytesMut) {
    dst.reserve(encoded_len(raw));
    dst.put_u8(SEPARATOR);
    for &b in raw {
        match b {
            SEPARATOR => dst.put_slice(&[ESCAPE, ESCAPED_SEPARATOR]),
            ESCAPE => dst.put_slice(&[ESCAPE, ESCAPED_ESCAPE]),
            _ => dst.put_u8(b),
        }
    }
    dst.put_u8(SEPARATOR);
}

/// Size of `raw` once escaped and delimited.
pub fn encoded_len(raw: &[u8]) -> usize {
    let escapes = raw
        .iter()
        .filter(|&&b| b == SEPARATOR || b == ESCAPE)
        .count();
    raw.len() + escapes + 2
}

/// Outcome of feeding one byte to the [`WireDecoder`].
#[derive(Debug)]
pub enum WireEvent {
    /// Byte consumed, no frame boundary yet.
    Pending,
    /// The target packet now holds a complete, validated packet.
    Complete,
    /// A malformed frame was dropped; the target packet was cleared.
    Discarded(PacketError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    /// Waiting for the first separator after start-up.
    Hunting,
    /// Inside a frame, storing bytes.
    Receiving,
    /// Dropping bytes of a bad frame until the next separator.
    Skipping,
}

/// Frame counters kept by a decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WireStats {
    pub frames: u64,
    pub discarded: u64,
}

/// Incremental receive framer.
///
/// Bytes are unescaped straight into the target packet's buffer, the way the
/// DMA engine fills an armed descriptor. Any violation drops the frame and
/// resynchronizes on the next separator.
#[derive(Debug)]
pub struct WireDecoder {
    state: DecodeState,
    escaped: bool,
    filled: usize,
    wire_flags: u8,
    stats: WireStats,
}

impl Default for WireDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl WireDecoder {
    pub fn new() -> Self {
        Self {
            state: DecodeState::Hunting,
            escaped: false,
            filled: 0,
            wire_flags: 0,
            stats: WireStats::default(),
        }
    }

    pub fn stats(&self) -> WireStats {
        self.stats
    }

    /// Feed one byte from the link into `target`.
    pub fn push(&mut self, byte: u8, target: &mut Packet) -> WireEvent {
        match self.state {
            DecodeState::Hunting | DecodeState::Skipping => {
                if byte == SEPARATOR {
                    self.begin_frame();
                }
                WireEvent::Pending
            }
            DecodeState::Receiving => self.receive(byte, target),
        }
    }

    fn begin_frame(&mut self) {
        self.state = DecodeState::Receiving;
        self.escaped = false;
        self.filled = 0;
    }

    fn receive(&mut self, byte: u8, target: &mut Packet) -> WireEvent {
        if byte == SEPARATOR {
            if self.escaped {
                // The separator still opens the next frame.
                self.begin_frame();
                return self.discard(PacketError::InvalidEscape(byte), target);
            }
            if self.filled == 0 {
                return WireEvent::Pending;
            }
            let event = self.finish(target);
            self.begin_frame();
            return event;
        }

        let byte = if self.escaped {
            self.escaped = false;
            match byte {
                ESCAPED_SEPARATOR => SEPARATOR,
                ESCAPED_ESCAPE => ESCAPE,
                other => {
                    self.state = DecodeState::Skipping;
                    return self.discard(PacketError::InvalidEscape(other), target);
                }
            }
        } else if byte == ESCAPE {
            self.escaped = true;
            return WireEvent::Pending;
        } else {
            byte
        };

        let raw = target.raw_mut();
        if self.filled >= raw.len() {
            let capacity = raw.len() - HEADER_SIZE;
            self.state = DecodeState::Skipping;
            return self.discard(PacketError::FrameOverflow { capacity }, target);
        }
        if self.filled == 0 {
            // The flag byte carries local processing state; keep it aside.
            self.wire_flags = byte;
        } else {
            raw[self.filled] = byte;
        }
        self.filled += 1;
        WireEvent::Pending
    }

    fn finish(&mut self, target: &mut Packet) -> WireEvent {
        if self.filled < HEADER_SIZE {
            let err = PacketError::RuntFrame {
                len: self.filled,
                min: HEADER_SIZE,
            };
            return self.discard(err, target);
        }

        let raw = target.raw_mut();
        let act_size = usize::from(u16::from_le_bytes([raw[2], raw[3]]));
        let actual = self.filled - HEADER_SIZE;
        if act_size != actual {
            let err = PacketError::LengthMismatch {
                header: act_size,
                actual,
            };
            return self.discard(err, target);
        }
        let class_capacity = Ownership::from_flags(self.wire_flags).capacity();
        if act_size > class_capacity {
            let err = PacketError::LengthExceedsCapacity {
                len: act_size,
                capacity: class_capacity,
            };
            return self.discard(err, target);
        }

        target.merge_received_flags(self.wire_flags);
        self.stats.frames += 1;
        trace!(
            stream = target.stream_index(),
            len = act_size,
            "frame received"
        );
        WireEvent::Complete
    }

    fn discard(&mut self, err: PacketError, target: &mut Packet) -> WireEvent {
        self.stats.discarded += 1;
        self.filled = 0;
        self.escaped = false;
        target.reset_for_rx();
        WireEvent::Discarded(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::{APP_OWNED, COMMAND, DONE, FIRST, FOR_RX, LAST, READY, RESPONSE};

    fn decode_all(decoder: &mut WireDecoder, bytes: &[u8]) -> (Vec<Packet>, Vec<PacketError>) {
        let mut done = Vec::new();
        let mut errors = Vec::new();
        let mut target = Packet::create_rx();
        for &b in bytes {
            match decoder.push(b, &mut target) {
                WireEvent::Pending => {}
                WireEvent::Complete => {
                    done.push(std::mem::replace(&mut target, Packet::create_rx()));
                }
                WireEvent::Discarded(err) => errors.push(err),
            }
        }
        (done, errors)
    }

    #[test]
    fn escapes_reserved_bytes() {
        let mut buf = BytesMut::new();
        encode_frame(&[0x01, SEPARATOR, 0x02, ESCAPE, 0x03], &mut buf);
        assert_eq!(
            buf.as_ref(),
            &[0xC0, 0x01, 0xDB, 0xDC, 0x02, 0xDB, 0xDD, 0x03, 0xC0]
        );
        assert_eq!(encoded_len(&[0x01, SEPARATOR, 0x02, ESCAPE, 0x03]), 9);
    }

    #[test]
    fn decodes_packet_with_reserved_payload_bytes() {
        let mut p = Packet::create_app_tx(COMMAND | FIRST | LAST, 1, 3);
        p.append(&[SEPARATOR, ESCAPE, 0x00, SEPARATOR]);
        let mut wire = BytesMut::new();
        encode_packet(&p, &mut wire);

        let mut decoder = WireDecoder::new();
        let (packets, errors) = decode_all(&mut decoder, &wire);
        assert!(errors.is_empty());
        assert_eq!(packets.len(), 1);

        let rx = &packets[0];
        assert_eq!(rx.data(), &[SEPARATOR, ESCAPE, 0x00, SEPARATOR]);
        assert_eq!(rx.stream_index(), 3);
        assert_eq!(rx.packet_index(), 1);
        assert_eq!(
            rx.flags().bits(),
            COMMAND | FIRST | LAST | FOR_RX | READY | APP_OWNED
        );
        assert_eq!(decoder.stats().frames, 1);
    }

    #[test]
    fn back_to_back_frames_share_separators() {
        let mut a = Packet::create_driver_tx(RESPONSE, 0, 2);
        a.append(b"two");
        let mut b = Packet::create_driver_tx(RESPONSE, 1, 5);
        b.append(b"five");

        let mut wire = BytesMut::new();
        encode_packet(&a, &mut wire);
        encode_packet(&b, &mut wire);

        let (packets, errors) = decode_all(&mut WireDecoder::new(), &wire);
        assert!(errors.is_empty());
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].data(), b"two");
        assert_eq!(packets[1].data(), b"five");
        assert_eq!(packets[1].stream_index(), 5);
    }

    #[test]
    fn leading_noise_is_skipped_until_separator() {
        let mut p = Packet::create_driver_tx(COMMAND, 0, 1);
        p.append(b"ok");
        let mut wire = BytesMut::from(&b"garbage"[..]);
        encode_packet(&p, &mut wire);

        let (packets, errors) = decode_all(&mut WireDecoder::new(), &wire);
        assert!(errors.is_empty());
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].data(), b"ok");
    }

    #[test]
    fn oversized_driver_length_is_discarded() {
        // Driver-owned header claiming 33 bytes, followed by 33 bytes.
        let mut raw = vec![COMMAND, 0x10, 33, 0];
        raw.extend_from_slice(&[0xAA; 33]);
        let mut wire = BytesMut::new();
        encode_frame(&raw, &mut wire);

        let mut decoder = WireDecoder::new();
        let (packets, errors) = decode_all(&mut decoder, &wire);
        assert!(packets.is_empty());
        assert!(matches!(
            errors.as_slice(),
            [PacketError::LengthExceedsCapacity {
                len: 33,
                capacity: 32
            }]
        ));
        assert_eq!(decoder.stats().discarded, 1);
    }

    #[test]
    fn length_mismatch_is_discarded_and_next_frame_survives() {
        let mut wire = BytesMut::new();
        encode_frame(&[COMMAND, 0x00, 5, 0, 1, 2], &mut wire);
        let mut good = Packet::create_driver_tx(COMMAND, 0, 4);
        good.append(b"fine");
        encode_packet(&good, &mut wire);

        let (packets, errors) = decode_all(&mut WireDecoder::new(), &wire);
        assert!(matches!(
            errors.as_slice(),
            [PacketError::LengthMismatch {
                header: 5,
                actual: 2
            }]
        ));
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].data(), b"fine");
        assert_eq!(packets[0].stream_index(), 4);
    }

    #[test]
    fn invalid_escape_resyncs_on_next_separator() {
        let mut wire = BytesMut::from(&[SEPARATOR, COMMAND, ESCAPE, 0x42, 0x00, 0x00][..]);
        let mut good = Packet::create_driver_tx(COMMAND, 0, 0);
        good.append(b"x");
        encode_packet(&good, &mut wire);

        let (packets, errors) = decode_all(&mut WireDecoder::new(), &wire);
        assert!(matches!(errors.as_slice(), [PacketError::InvalidEscape(0x42)]));
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].data(), b"x");
    }

    #[test]
    fn runt_frame_is_discarded() {
        let wire = [SEPARATOR, COMMAND, 0x00, SEPARATOR];
        let (packets, errors) = decode_all(&mut WireDecoder::new(), &wire);
        assert!(packets.is_empty());
        assert!(matches!(
            errors.as_slice(),
            [PacketError::RuntFrame { len: 2, min: 4 }]
        ));
    }

    #[test]
    fn overflow_of_armed_buffer_is_discarded() {
        let mut raw = vec![APP_OWNED, 0x00, 0x00, 0x10];
        raw.extend_from_slice(&[0x11; 4096]);
        let mut wire = BytesMut::new();
        encode_frame(&raw, &mut wire);

        let (packets, errors) = decode_all(&mut WireDecoder::new(), &wire);
        assert!(packets.is_empty());
        assert!(matches!(
            errors.as_slice(),
            [PacketError::FrameOverflow { capacity: 4072 }]
        ));
    }

    #[test]
    fn discarded_frame_clears_target() {
        let mut decoder = WireDecoder::new();
        let mut target = Packet::create_rx();
        for &b in &[SEPARATOR, COMMAND, 0x35, 9, 0, 1, SEPARATOR] {
            let _ = decoder.push(b, &mut target);
        }
        assert!(target.is_empty());
        assert_eq!(target.stream_index(), 0);
        assert!(target.is_flag_clear(DONE));
    }
}
