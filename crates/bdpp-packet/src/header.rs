use bytes::{BufMut, BytesMut};

use crate::error::{PacketError, Result};
use crate::flags::PacketFlags;

/// Header: flags (1) + packed indexes (1) + payload length (2) = 4 bytes.
pub const HEADER_SIZE: usize = 4;

const PACKET_INDEX_BITS: u8 = 0x0F;
const STREAM_INDEX_BITS: u8 = 0xF0;

/// The fixed header in front of every packet payload.
///
/// Wire format (before escaping):
/// ```text
/// ┌─────────┬──────────────────────┬─────────────┬──────────────────┐
/// │ Flags   │ Indexes              │ Length      │ Payload          │
/// │ (1B)    │ stream<<4 | packet   │ (2B LE)     │ (Length bytes)   │
/// └─────────┴──────────────────────┴─────────────┴──────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub flags: PacketFlags,
    pub packet_index: u8,
    pub stream_index: u8,
    pub act_size: u16,
}

impl PacketHeader {
    /// Pack a packet and stream index into one byte. Only the low nibble of
    /// each index is kept.
    pub const fn pack_indexes(packet_index: u8, stream_index: u8) -> u8 {
        (packet_index & PACKET_INDEX_BITS) | ((stream_index << 4) & STREAM_INDEX_BITS)
    }

    pub const fn unpack_indexes(indexes: u8) -> (u8, u8) {
        (indexes & PACKET_INDEX_BITS, indexes >> 4)
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let len = self.act_size.to_le_bytes();
        [
            self.flags.bits(),
            Self::pack_indexes(self.packet_index, self.stream_index),
            len[0],
            len[1],
        ]
    }

    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(HEADER_SIZE);
        dst.put_u8(self.flags.bits());
        dst.put_u8(Self::pack_indexes(self.packet_index, self.stream_index));
        dst.put_u16_le(self.act_size);
    }

    /// Parse a header from the first [`HEADER_SIZE`] bytes of `src`.
    pub fn parse(src: &[u8]) -> Result<Self> {
        if src.len() < HEADER_SIZE {
            return Err(PacketError::RuntFrame {
                len: src.len(),
                min: HEADER_SIZE,
            });
        }
        let (packet_index, stream_index) = Self::unpack_indexes(src[1]);
        Ok(Self {
            flags: PacketFlags::from_bits(src[0]),
            packet_index,
            stream_index,
            act_size: u16::from_le_bytes([src[2], src[3]]),
        })
    }

    /// Reject lengths the sender's ownership class could never have produced.
    pub fn validate_length(&self) -> Result<()> {
        let capacity = self.flags.ownership().capacity();
        let len = usize::from(self.act_size);
        if len > capacity {
            return Err(PacketError::LengthExceedsCapacity { len, capacity });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::{APP_OWNED, COMMAND, FIRST, LAST, READY};

    #[test]
    fn index_packing_is_invertible() {
        for packet in 0..16u8 {
            for stream in 0..16u8 {
                let packed = PacketHeader::pack_indexes(packet, stream);
                assert_eq!(PacketHeader::unpack_indexes(packed), (packet, stream));
            }
        }
    }

    #[test]
    fn pack_masks_out_of_range_indexes() {
        assert_eq!(PacketHeader::pack_indexes(0x1F, 0x12), 0x2F);
    }

    #[test]
    fn encode_layout() {
        let header = PacketHeader {
            flags: PacketFlags::from_bits(COMMAND | FIRST | LAST | READY | APP_OWNED),
            packet_index: 1,
            stream_index: 3,
            act_size: 0x0203,
        };
        let mut buf = BytesMut::new();
        header.encode(&mut buf);

        assert_eq!(buf.as_ref(), &[0x9D, 0x31, 0x03, 0x02]);
        assert_eq!(header.to_bytes(), [0x9D, 0x31, 0x03, 0x02]);
        assert_eq!(PacketHeader::parse(&buf).unwrap(), header);
    }

    #[test]
    fn parse_short_input() {
        let err = PacketHeader::parse(&[0x01, 0x02]).unwrap_err();
        assert!(matches!(err, PacketError::RuntFrame { len: 2, min: 4 }));
    }

    #[test]
    fn validate_length_by_ownership_class() {
        let driver = PacketHeader::parse(&[0x01, 0x00, 33, 0]).unwrap();
        assert!(matches!(
            driver.validate_length(),
            Err(PacketError::LengthExceedsCapacity {
                len: 33,
                capacity: 32
            })
        ));

        let app = PacketHeader::parse(&[0x81, 0x00, 33, 0]).unwrap();
        assert!(app.validate_length().is_ok());

        let oversized = PacketHeader::parse(&[0x81, 0x00, 0xE9, 0x0F]).unwrap();
        assert_eq!(oversized.act_size, 4073);
        assert!(oversized.validate_length().is_err());
    }
}
