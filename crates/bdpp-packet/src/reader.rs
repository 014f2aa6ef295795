use std::io::{ErrorKind, Read};

use tracing::warn;

use crate::error::{PacketError, Result};
use crate::flags::DONE;
use crate::packet::Packet;
use crate::wire::{WireDecoder, WireEvent, WireStats};

const READ_CHUNK_SIZE: usize = 4 * 1024;

/// Reads complete packets from any `Read` byte stream.
///
/// Corrupt frames are dropped and logged; callers only ever see packets that
/// passed the framer's checks. Returned packets are RX packets with
/// `READY | DONE` set.
pub struct PacketReader<T> {
    inner: T,
    decoder: WireDecoder,
    chunk: Box<[u8]>,
    start: usize,
    end: usize,
    target: Option<Packet>,
}

impl<T: Read> PacketReader<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            decoder: WireDecoder::new(),
            chunk: vec![0u8; READ_CHUNK_SIZE].into_boxed_slice(),
            start: 0,
            end: 0,
            target: None,
        }
    }

    /// Read the next complete packet (blocking).
    ///
    /// Returns `Err(PacketError::ConnectionClosed)` when EOF is reached.
    /// Reads are retried on `Interrupted`; `WouldBlock` from a non-blocking
    /// source is returned as `PacketError::Io` and the partial frame is kept.
    pub fn read_packet(&mut self) -> Result<Packet> {
        loop {
            if let Some(packet) = self.decode_buffered()? {
                return Ok(packet);
            }

            let read = match self.inner.read(&mut self.chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(PacketError::Io(err)),
            };

            if read == 0 {
                return Err(PacketError::ConnectionClosed);
            }
            self.start = 0;
            self.end = read;
        }
    }

    fn decode_buffered(&mut self) -> Result<Option<Packet>> {
        while self.start < self.end {
            let byte = self.chunk[self.start];
            self.start += 1;

            if self.target.is_none() {
                self.target = Some(Packet::try_create_rx()?);
            }
            let Some(target) = self.target.as_mut() else {
                continue;
            };
            match self.decoder.push(byte, target) {
                WireEvent::Pending => {}
                WireEvent::Complete => {
                    if let Some(mut packet) = self.target.take() {
                        packet.set_flags(DONE);
                        return Ok(Some(packet));
                    }
                }
                WireEvent::Discarded(err) => {
                    warn!(error = %err, "dropping malformed frame");
                }
            }
        }
        Ok(None)
    }

    /// Framer counters since this reader was created.
    pub fn stats(&self) -> WireStats {
        self.decoder.stats()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
