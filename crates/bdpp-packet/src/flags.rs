//! Packet flag bits and protocol limits.
//!
//! The low nibble of the flag byte describes usage (content kind and message
//! position) and travels to the peer. The high nibble drives local processing.

/// Maximum payload of an app-owned packet.
pub const MAX_PACKET_DATA_SIZE: usize = 4072;
/// Maximum payload of a driver-owned (small) packet.
pub const SMALL_PACKET_DATA_SIZE: usize = 32;
/// Number of driver-owned small packets.
pub const MAX_DRIVER_PACKETS: usize = 16;
/// Number of app-owned packets circulating through the RX free pool.
pub const MAX_APP_PACKETS: usize = 16;
/// Number of logical streams multiplexed over the link.
pub const MAX_STREAMS: usize = 16;
/// Number of packets armed for DMA reception at once.
pub const MAX_RX_PACKETS: usize = 4;

/// Packet contains printable data.
pub const PRINT: u8 = 0x00;
/// Packet contains a command or request.
pub const COMMAND: u8 = 0x01;
/// Packet contains a response.
pub const RESPONSE: u8 = 0x02;
/// Packet is the first part of a message.
pub const FIRST: u8 = 0x04;
/// Packet is a middle part of a message (neither first nor last).
pub const MIDDLE: u8 = 0x00;
/// Packet is the last part of a message.
pub const LAST: u8 = 0x08;
/// Packet is queued for transmission or armed for reception.
pub const READY: u8 = 0x10;
/// Packet was transmitted or received.
pub const DONE: u8 = 0x20;
/// Packet is for reception, not transmission.
pub const FOR_RX: u8 = 0x40;
/// Packet is owned by the driver.
pub const DRIVER_OWNED: u8 = 0x00;
/// Packet is owned by the application.
pub const APP_OWNED: u8 = 0x80;

/// Flag bits that describe packet usage.
pub const USAGE_BITS: u8 = 0x0F;
/// Flag bits that affect packet processing.
pub const PROCESS_BITS: u8 = 0xF0;

const CONTENT_BITS: u8 = COMMAND | RESPONSE;
const POSITION_BITS: u8 = FIRST | LAST;

/// Processing bits that may change after construction. Ownership never does.
pub(crate) const MUTABLE_BITS: u8 = READY | DONE | FOR_RX;

/// Who may free a packet's buffer; also fixes its capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ownership {
    Driver,
    App,
}

impl Ownership {
    pub const fn capacity(self) -> usize {
        match self {
            Ownership::Driver => SMALL_PACKET_DATA_SIZE,
            Ownership::App => MAX_PACKET_DATA_SIZE,
        }
    }

    pub const fn flag(self) -> u8 {
        match self {
            Ownership::Driver => DRIVER_OWNED,
            Ownership::App => APP_OWNED,
        }
    }

    pub const fn from_flags(flags: u8) -> Self {
        if flags & APP_OWNED != 0 {
            Ownership::App
        } else {
            Ownership::Driver
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Print,
    Command,
    Response,
}

impl ContentKind {
    pub const fn flag(self) -> u8 {
        match self {
            ContentKind::Print => PRINT,
            ContentKind::Command => COMMAND,
            ContentKind::Response => RESPONSE,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ContentKind::Print => "PRINT",
            ContentKind::Command => "COMMAND",
            ContentKind::Response => "RESPONSE",
        }
    }
}

/// Where a packet sits in a multi-packet message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagePosition {
    First,
    Middle,
    Last,
    /// The whole message fits in one packet (FIRST and LAST both set).
    Only,
}

impl MessagePosition {
    pub const fn flag(self) -> u8 {
        match self {
            MessagePosition::First => FIRST,
            MessagePosition::Middle => MIDDLE,
            MessagePosition::Last => LAST,
            MessagePosition::Only => FIRST | LAST,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MessagePosition::First => "FIRST",
            MessagePosition::Middle => "MIDDLE",
            MessagePosition::Last => "LAST",
            MessagePosition::Only => "ONLY",
        }
    }
}

/// The flag byte of a packet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PacketFlags(u8);

impl PacketFlags {
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Build usage bits from a content kind and message position.
    pub const fn usage(kind: ContentKind, position: MessagePosition) -> u8 {
        kind.flag() | position.flag()
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// True when any bit of `flag` is set.
    pub const fn is_set(self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    /// True when every bit of `flag` is set.
    pub const fn contains(self, flag: u8) -> bool {
        self.0 & flag == flag
    }

    pub fn insert(&mut self, flag: u8) {
        self.0 |= flag;
    }

    pub fn remove(&mut self, flag: u8) {
        self.0 &= !flag;
    }

    pub const fn usage_bits(self) -> u8 {
        self.0 & USAGE_BITS
    }

    pub const fn processing_bits(self) -> u8 {
        self.0 & PROCESS_BITS
    }

    /// Content classification. The reserved combination `COMMAND | RESPONSE`
    /// reads as a response.
    pub const fn content(self) -> ContentKind {
        match self.0 & CONTENT_BITS {
            PRINT => ContentKind::Print,
            COMMAND => ContentKind::Command,
            _ => ContentKind::Response,
        }
    }

    pub const fn position(self) -> MessagePosition {
        match self.0 & POSITION_BITS {
            FIRST => MessagePosition::First,
            LAST => MessagePosition::Last,
            MIDDLE => MessagePosition::Middle,
            _ => MessagePosition::Only,
        }
    }

    pub const fn ownership(self) -> Ownership {
        Ownership::from_flags(self.0)
    }

    pub const fn is_for_rx(self) -> bool {
        self.0 & FOR_RX != 0
    }
}

impl std::fmt::Display for PacketFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}|{}", self.content().name(), self.position().name())?;
        for (bit, name) in [(READY, "READY"), (DONE, "DONE"), (FOR_RX, "FOR_RX")] {
            if self.is_set(bit) {
                write!(f, "|{name}")?;
            }
        }
        match self.ownership() {
            Ownership::App => write!(f, "|APP"),
            Ownership::Driver => write!(f, "|DRIVER"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_and_processing_nibbles_are_disjoint() {
        assert_eq!(USAGE_BITS & PROCESS_BITS, 0);
        assert_eq!(USAGE_BITS | PROCESS_BITS, 0xFF);
        for bit in [COMMAND, RESPONSE, FIRST, LAST] {
            assert_eq!(bit & PROCESS_BITS, 0);
        }
        for bit in [READY, DONE, FOR_RX, APP_OWNED] {
            assert_eq!(bit & USAGE_BITS, 0);
        }
    }

    #[test]
    fn position_decoding() {
        assert_eq!(PacketFlags::from_bits(FIRST).position(), MessagePosition::First);
        assert_eq!(PacketFlags::from_bits(LAST).position(), MessagePosition::Last);
        assert_eq!(PacketFlags::from_bits(MIDDLE).position(), MessagePosition::Middle);
        assert_eq!(
            PacketFlags::from_bits(FIRST | LAST).position(),
            MessagePosition::Only
        );
    }

    #[test]
    fn content_decoding() {
        assert_eq!(PacketFlags::from_bits(PRINT).content(), ContentKind::Print);
        assert_eq!(
            PacketFlags::from_bits(COMMAND | FIRST | READY).content(),
            ContentKind::Command
        );
        assert_eq!(
            PacketFlags::from_bits(RESPONSE | LAST).content(),
            ContentKind::Response
        );
    }

    #[test]
    fn ownership_capacity() {
        assert_eq!(Ownership::Driver.capacity(), 32);
        assert_eq!(Ownership::App.capacity(), 4072);
        assert_eq!(Ownership::from_flags(APP_OWNED | READY), Ownership::App);
        assert_eq!(Ownership::from_flags(FOR_RX | DONE), Ownership::Driver);
    }

    #[test]
    fn display_lists_set_bits() {
        let flags = PacketFlags::from_bits(COMMAND | FIRST | LAST | READY | APP_OWNED);
        assert_eq!(flags.to_string(), "COMMAND|ONLY|READY|APP");
    }
}
