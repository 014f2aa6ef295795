use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::error::{PacketError, Result};
use crate::flags::{ContentKind, Ownership};
use crate::message::packetize;
use crate::packet::Packet;
use crate::wire::encode_packet;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes framed packets to any `Write` byte stream.
pub struct PacketWriter<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Write> PacketWriter<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Frame and write one packet (blocking).
    pub fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        self.buf.clear();
        encode_packet(packet, &mut self.buf);
        self.write_buffered()?;
        self.flush()
    }

    /// Split a message into app-owned packets and write them in order.
    /// Returns the number of packets written.
    pub fn send(&mut self, kind: ContentKind, stream_index: u8, payload: &[u8]) -> Result<usize> {
        let packets = packetize(kind, stream_index, payload, Ownership::App);
        self.buf.clear();
        for packet in &packets {
            encode_packet(packet, &mut self.buf);
        }
        self.write_buffered()?;
        self.flush()?;
        Ok(packets.len())
    }

    fn write_buffered(&mut self) -> Result<()> {
        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(PacketError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(PacketError::Io(err)),
            }
        }
        Ok(())
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(PacketError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::flags::{COMMAND, FIRST, LAST, MAX_PACKET_DATA_SIZE};
    use crate::message::MessageAssembler;
    use crate::reader::PacketReader;

    #[test]
    fn write_single_packet() {
        let mut writer = PacketWriter::new(Cursor::new(Vec::<u8>::new()));
        let mut p = Packet::create_app_tx(COMMAND | FIRST | LAST, 1, 3);
        p.append(&[0x01, 0x02, 0x03]);
        writer.write_packet(&p).unwrap();

        let wire = writer.into_inner().into_inner();
        assert_eq!(
            wire,
            vec![0xC0, 0x8D, 0x31, 0x03, 0x00, 0x01, 0x02, 0x03, 0xC0]
        );
    }

    #[test]
    fn send_splits_and_reader_reassembles() {
        let payload: Vec<u8> = (0..(MAX_PACKET_DATA_SIZE + 100))
            .map(|i| (i % 251) as u8)
            .collect();
        let mut writer = PacketWriter::new(Cursor::new(Vec::<u8>::new()));
        let sent = writer.send(ContentKind::Print, 9, &payload).unwrap();
        assert_eq!(sent, 2);

        let wire = writer.into_inner().into_inner();
        let mut reader = PacketReader::new(Cursor::new(wire));
        let mut assembler = MessageAssembler::new();

        assert!(assembler.push(&reader.read_packet().unwrap()).unwrap().is_none());
        let message = assembler
            .push(&reader.read_packet().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(message.stream_index, 9);
        assert_eq!(message.payload, payload);
    }

    #[test]
    fn zero_length_write_reports_closed() {
        let mut writer = PacketWriter::new(ZeroWriter);
        let err = writer
            .write_packet(&Packet::create_driver_tx(COMMAND, 0, 0))
            .unwrap_err();
        assert!(matches!(err, PacketError::ConnectionClosed));
    }

    #[test]
    fn interrupted_write_retries() {
        let mut writer = PacketWriter::new(InterruptOnce {
            fired: false,
            out: Vec::new(),
        });
        let mut p = Packet::create_driver_tx(COMMAND, 0, 2);
        p.append(b"hi");
        writer.write_packet(&p).unwrap();
        assert_eq!(writer.get_ref().out.len(), 8);
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct InterruptOnce {
        fired: bool,
        out: Vec<u8>,
    }

    impl Write for InterruptOnce {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.fired {
                self.fired = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.out.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
