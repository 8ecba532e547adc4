use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{encode_body, encode_packet, Packet, PacketFormat};
use crate::error::{Result, WireError};

/// Writes framed packets to any `Write` stream.
///
/// Supports both wire variants:
///
/// - **self-delimited** ([`send`](Self::send)): sentinel + body + sentinel
///   assembled into one buffer and written as a unit;
/// - **delimited-pair** ([`start_transmission`](Self::start_transmission) /
///   [`write_body`](Self::write_body) /
///   [`end_transmission`](Self::end_transmission)): sentinels and bodies
///   issued as separate writes, so a burst of packets can share one
///   sentinel between consecutive bodies.
///
/// Stateless between calls apart from the reusable encode buffer.
pub struct PacketWriter<T> {
    inner: T,
    buf: BytesMut,
    format: PacketFormat,
}

impl<T: Write> PacketWriter<T> {
    /// Create a packet writer with the default format.
    pub fn new(inner: T) -> Self {
        Self::with_format(inner, PacketFormat::default())
    }

    /// Create a packet writer with an explicit format.
    pub fn with_format(inner: T, format: PacketFormat) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(format.min_wire_size()),
            format,
        }
    }

    /// Encode and write one self-delimited packet, then flush.
    pub fn send(&mut self, header: &[u8], data: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_packet(&self.format, header, data, &mut self.buf)?;
        self.write_buf()?;
        self.flush()
    }

    /// Write a packet value produced by a deframer.
    pub fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        self.send(packet.header.as_ref(), packet.data.as_ref())
    }

    /// Start a delimited-pair transmission: write one sentinel byte.
    pub fn start_transmission(&mut self) -> Result<()> {
        self.buf.clear();
        self.buf.extend_from_slice(&[self.format.sentinel()]);
        self.write_buf()
    }

    /// Write one bare packet body inside a delimited-pair transmission.
    pub fn write_body(&mut self, header: &[u8], data: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_body(&self.format, header, data, &mut self.buf)?;
        self.write_buf()
    }

    /// End a delimited-pair transmission: write the closing sentinel and
    /// flush.
    pub fn end_transmission(&mut self) -> Result<()> {
        self.buf.clear();
        self.buf.extend_from_slice(&[self.format.sentinel()]);
        self.write_buf()?;
        self.flush()
    }

    fn write_buf(&mut self) -> Result<()> {
        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(WireError::LinkClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(WireError::Io(err)),
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
                Err(err) => return Err(WireError::Io(err)),
            }
        }
    }

    /// The packet format this writer encodes with.
    pub fn format(&self) -> &PacketFormat {
        &self.format
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

    use bytes::BytesMut;

    use super::*;
    use crate::codec::decode_packet;

    #[test]
    fn send_produces_exact_wire_bytes() {
        let mut writer = PacketWriter::new(Cursor::new(Vec::<u8>::new()));
        let header = [0x10u8; 16];
        let data = [0x20u8; 48];

        writer.send(&header, &data).unwrap();

        let wire = writer.into_inner().into_inner();
        assert_eq!(wire.len(), 66);
        assert_eq!(wire[0], 0x00);
        assert_eq!(&wire[1..17], &header);
        assert_eq!(&wire[17..65], &data);
        assert_eq!(wire[65], 0x00);
    }

    #[test]
    fn sent_packet_decodes() {
        let mut writer = PacketWriter::new(Cursor::new(Vec::<u8>::new()));
        let header: Vec<u8> = (1..=16).collect();
        let data: Vec<u8> = (17..=64).collect();

        writer.send(&header, &data).unwrap();

        let format = PacketFormat::default();
        let mut wire = BytesMut::from(writer.into_inner().into_inner().as_slice());
        let packet = decode_packet(&format, &mut wire).unwrap();
        assert_eq!(packet.header.as_ref(), header.as_slice());
        assert_eq!(packet.data.as_ref(), data.as_slice());
    }

    #[test]
    fn delimited_pair_burst_shares_sentinels() {
        let mut writer = PacketWriter::new(Cursor::new(Vec::<u8>::new()));
        let header = [1u8; 16];

        writer.start_transmission().unwrap();
        writer.write_body(&header, &[2u8; 48]).unwrap();
        writer.start_transmission().unwrap();
        writer.write_body(&header, &[3u8; 48]).unwrap();
        writer.end_transmission().unwrap();

        let bytes = writer.into_inner().into_inner();
        // 2 bodies and 3 sentinels: the middle one closes the first
        // packet and opens the second.
        assert_eq!(bytes.len(), 2 * 64 + 3);

        let format = PacketFormat::default();
        let mut wire = BytesMut::from(bytes.as_slice());
        let first = decode_packet(&format, &mut wire).unwrap();
        let second = decode_packet(&format, &mut wire).unwrap();
        assert_eq!(first.data.as_ref(), [2u8; 48]);
        assert_eq!(second.data.as_ref(), [3u8; 48]);
    }

    #[test]
    fn rejects_invalid_sizes_without_writing() {
        let mut writer = PacketWriter::new(Cursor::new(Vec::<u8>::new()));

        let err = writer.send(&[0u8; 8], &[0u8; 48]).unwrap_err();
        assert!(matches!(err, WireError::InvalidPacketSize { header: 8, .. }));

        let err = writer.write_body(&[0u8; 16], &[0u8; 40]).unwrap_err();
        assert!(matches!(err, WireError::InvalidPacketSize { data: 40, .. }));

        assert!(writer.into_inner().into_inner().is_empty());
    }

    #[test]
    fn short_writes_are_completed() {
        struct TrickleWriter {
            data: Vec<u8>,
        }
        impl Write for TrickleWriter {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.data.push(buf[0]);
                Ok(1)
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut writer = PacketWriter::new(TrickleWriter { data: Vec::new() });
        writer.send(&[5u8; 16], &[6u8; 48]).unwrap();
        assert_eq!(writer.get_ref().data.len(), 66);
    }

    #[test]
    fn zero_write_reports_link_closed() {
        struct ZeroWriter;
        impl Write for ZeroWriter {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Ok(0)
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut writer = PacketWriter::new(ZeroWriter);
        let err = writer.send(&[0u8; 16], &[0u8; 48]).unwrap_err();
        assert!(matches!(err, WireError::LinkClosed));
    }

    #[test]
    fn interrupted_write_retries() {
        struct InterruptedOnce {
            interrupted: bool,
            data: Vec<u8>,
        }
        impl Write for InterruptedOnce {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                if !self.interrupted {
                    self.interrupted = true;
                    return Err(std::io::Error::from(ErrorKind::Interrupted));
                }
                self.data.extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut writer = PacketWriter::new(InterruptedOnce {
            interrupted: false,
            data: Vec::new(),
        });
        writer.send(&[9u8; 16], &[8u8; 48]).unwrap();
        assert_eq!(writer.get_ref().data.len(), 66);
    }
}
