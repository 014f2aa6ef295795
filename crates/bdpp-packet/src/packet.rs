use crate::error::{PacketError, Result};
use crate::flags::{
    Ownership, PacketFlags, APP_OWNED, FOR_RX, MUTABLE_BITS, READY, USAGE_BITS,
};
use crate::header::{PacketHeader, HEADER_SIZE};

const FLAGS_OFFSET: usize = 0;
const INDEXES_OFFSET: usize = 1;
const LENGTH_OFFSET: usize = 2;

/// One BDPP packet: a fixed-capacity buffer plus header metadata.
///
/// The buffer holds the header followed by the payload, exactly as it appears
/// on the wire, so transmitting a packet is a single contiguous DMA transfer.
/// Its size is fixed at construction and never reallocated.
///
/// `Packet` is move-only. Whoever holds it may read and write it; handing it
/// to a queue hands over that right.
pub struct Packet {
    buf: Box<[u8]>,
    ownership: Ownership,
}

impl Packet {
    /// Create an empty driver-owned packet (32-byte payload).
    pub fn create_driver_tx(usage_flags: u8, packet_index: u8, stream_index: u8) -> Self {
        Self::new(usage_flags & USAGE_BITS, packet_index, stream_index)
    }

    /// Create an empty app-owned packet (4072-byte payload).
    pub fn create_app_tx(usage_flags: u8, packet_index: u8, stream_index: u8) -> Self {
        Self::new((usage_flags & USAGE_BITS) | APP_OWNED, packet_index, stream_index)
    }

    /// Create an empty app-owned packet armed for reception.
    pub fn create_rx() -> Self {
        Self::new(FOR_RX | READY | APP_OWNED, 0, 0)
    }

    /// Like [`create_rx`](Self::create_rx), but reports allocation failure
    /// instead of aborting.
    pub fn try_create_rx() -> Result<Self> {
        Self::try_new(FOR_RX | READY | APP_OWNED, 0, 0)
    }

    /// Like [`create_driver_tx`](Self::create_driver_tx), but reports
    /// allocation failure instead of aborting.
    pub fn try_create_driver_tx(usage_flags: u8, packet_index: u8, stream_index: u8) -> Result<Self> {
        Self::try_new(usage_flags & USAGE_BITS, packet_index, stream_index)
    }

    /// Create an empty packet; capacity follows the ownership bit in `flags`.
    pub fn new(flags: u8, packet_index: u8, stream_index: u8) -> Self {
        let ownership = Ownership::from_flags(flags);
        let mut buf = vec![0u8; HEADER_SIZE + ownership.capacity()].into_boxed_slice();
        Self::write_header(&mut buf, flags, packet_index, stream_index);
        Self { buf, ownership }
    }

    /// Fallible variant of [`new`](Self::new).
    pub fn try_new(flags: u8, packet_index: u8, stream_index: u8) -> Result<Self> {
        let ownership = Ownership::from_flags(flags);
        let size = HEADER_SIZE + ownership.capacity();
        let mut buf = Vec::new();
        buf.try_reserve_exact(size)
            .map_err(|_| PacketError::AllocationFailure { size })?;
        buf.resize(size, 0);
        let mut buf = buf.into_boxed_slice();
        Self::write_header(&mut buf, flags, packet_index, stream_index);
        Ok(Self { buf, ownership })
    }

    fn write_header(buf: &mut [u8], flags: u8, packet_index: u8, stream_index: u8) {
        buf[FLAGS_OFFSET] = flags;
        buf[INDEXES_OFFSET] = PacketHeader::pack_indexes(packet_index, stream_index);
        buf[LENGTH_OFFSET..HEADER_SIZE].copy_from_slice(&0u16.to_le_bytes());
    }

    pub fn flags(&self) -> PacketFlags {
        PacketFlags::from_bits(self.buf[FLAGS_OFFSET])
    }

    pub fn is_flag_set(&self, flag: u8) -> bool {
        self.flags().is_set(flag)
    }

    pub fn is_flag_clear(&self, flag: u8) -> bool {
        !self.is_flag_set(flag)
    }

    /// OR processing flags into the packet. The ownership bit is fixed at
    /// construction and ignored here.
    pub fn set_flags(&mut self, mask: u8) {
        self.buf[FLAGS_OFFSET] |= mask & MUTABLE_BITS;
    }

    /// Clear processing flags. The ownership bit is ignored.
    pub fn clear_flags(&mut self, mask: u8) {
        self.buf[FLAGS_OFFSET] &= !(mask & MUTABLE_BITS);
    }

    pub fn packet_index(&self) -> u8 {
        PacketHeader::unpack_indexes(self.buf[INDEXES_OFFSET]).0
    }

    pub fn stream_index(&self) -> u8 {
        PacketHeader::unpack_indexes(self.buf[INDEXES_OFFSET]).1
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub fn capacity(&self) -> usize {
        self.buf.len() - HEADER_SIZE
    }

    /// Number of valid payload bytes.
    pub fn len(&self) -> usize {
        usize::from(u16::from_le_bytes([
            self.buf[LENGTH_OFFSET],
            self.buf[LENGTH_OFFSET + 1],
        ]))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity()
    }

    pub fn remaining(&self) -> usize {
        self.capacity() - self.len()
    }

    pub fn header(&self) -> PacketHeader {
        PacketHeader {
            flags: self.flags(),
            packet_index: self.packet_index(),
            stream_index: self.stream_index(),
            act_size: self.len() as u16,
        }
    }

    /// The valid payload bytes.
    pub fn data(&self) -> &[u8] {
        &self.buf[HEADER_SIZE..HEADER_SIZE + self.len()]
    }

    /// Header plus valid payload, ready for the wire adapter.
    pub fn wire_bytes(&self) -> &[u8] {
        &self.buf[..HEADER_SIZE + self.len()]
    }

    /// Append one byte.
    ///
    /// # Panics
    /// Panics if the packet is full. Check [`is_full`](Self::is_full) first.
    pub fn append_byte(&mut self, byte: u8) {
        let len = self.len();
        assert!(len < self.capacity(), "append past packet capacity");
        self.buf[HEADER_SIZE + len] = byte;
        self.set_len(len + 1);
    }

    /// Append a run of bytes.
    ///
    /// # Panics
    /// Panics if the bytes do not fit. Check [`remaining`](Self::remaining) first.
    pub fn append(&mut self, bytes: &[u8]) {
        let len = self.len();
        assert!(
            bytes.len() <= self.capacity() - len,
            "append past packet capacity"
        );
        self.buf[HEADER_SIZE + len..HEADER_SIZE + len + bytes.len()].copy_from_slice(bytes);
        self.set_len(len + bytes.len());
    }

    /// Append as many bytes as fit and return how many were taken.
    pub fn fill_from(&mut self, bytes: &[u8]) -> usize {
        let take = bytes.len().min(self.remaining());
        self.append(&bytes[..take]);
        take
    }

    /// Re-target an idle packet for a new transmission: new usage bits and
    /// stream, empty payload, READY/DONE/FOR_RX cleared. The packet index
    /// (pool slot) and ownership are kept.
    pub fn reassign(&mut self, usage_flags: u8, stream_index: u8) {
        let keep = self.buf[FLAGS_OFFSET] & APP_OWNED;
        self.buf[FLAGS_OFFSET] = keep | (usage_flags & USAGE_BITS);
        let packet_index = self.packet_index();
        self.buf[INDEXES_OFFSET] = PacketHeader::pack_indexes(packet_index, stream_index);
        self.set_len(0);
    }

    /// Return a consumed packet to its armed-for-reception state:
    /// empty, `{READY, FOR_RX}` plus its ownership bit, indexes cleared.
    pub fn reset_for_rx(&mut self) {
        self.buf[FLAGS_OFFSET] = FOR_RX | READY | self.ownership.flag();
        self.buf[INDEXES_OFFSET] = 0;
        self.set_len(0);
    }

    /// Whole buffer, header included, for the receive framer.
    pub(crate) fn raw_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    /// Adopt the usage bits from a received header byte, keeping local
    /// processing bits.
    pub(crate) fn merge_received_flags(&mut self, wire_flags: u8) {
        let local = self.buf[FLAGS_OFFSET] & !USAGE_BITS;
        self.buf[FLAGS_OFFSET] = local | (wire_flags & USAGE_BITS);
    }

    fn set_len(&mut self, len: usize) {
        debug_assert!(len <= self.capacity());
        self.buf[LENGTH_OFFSET..HEADER_SIZE].copy_from_slice(&(len as u16).to_le_bytes());
    }
}

impl std::fmt::Debug for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Packet")
            .field("flags", &format_args!("{}", self.flags()))
            .field("stream", &self.stream_index())
            .field("packet", &self.packet_index())
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}
