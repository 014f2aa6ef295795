/// Errors that can occur while building, framing or parsing packets.
#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    /// DMA-capable memory could not be obtained for a packet buffer.
    #[error("packet buffer allocation failed ({size} bytes)")]
    AllocationFailure { size: usize },

    /// A header claims more payload than its ownership class can hold.
    #[error("payload length {len} exceeds capacity {capacity}")]
    LengthExceedsCapacity { len: usize, capacity: usize },

    /// A frame ended before a complete header was received.
    #[error("runt frame ({len} bytes, header needs {min})")]
    RuntFrame { len: usize, min: usize },

    /// The header length disagrees with the number of payload bytes framed.
    #[error("header length {header} does not match framed payload of {actual} bytes")]
    LengthMismatch { header: usize, actual: usize },

    /// An escape byte was followed by something other than a valid escape code.
    #[error("invalid escape sequence (0xDB 0x{0:02X})")]
    InvalidEscape(u8),

    /// More bytes arrived than the receiving buffer can hold.
    #[error("frame overflows receive buffer of {capacity} bytes")]
    FrameOverflow { capacity: usize },

    /// Packets of a multi-packet message arrived out of order.
    #[error("stream {stream}: {reason}")]
    MessageSequence { stream: u8, reason: &'static str },

    /// An I/O error occurred while reading or writing packets.
    #[error("packet I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The byte stream closed before a complete packet was received.
    #[error("connection closed (incomplete packet)")]
    ConnectionClosed,
}

impl PacketError {
    /// Whether this error describes malformed framing from the peer.
    ///
    /// Protocol violations cost one frame; the receive path keeps running.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::LengthExceedsCapacity { .. }
                | Self::RuntFrame { .. }
                | Self::LengthMismatch { .. }
                | Self::InvalidEscape(_)
                | Self::FrameOverflow { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PacketError>;
