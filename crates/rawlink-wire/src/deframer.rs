use bytes::BytesMut;

use crate::codec::{decode_packet, Packet, PacketFormat};

/// Incremental packet extractor for a continuous byte stream.
///
/// Owns the residual buffer carrying not-yet-consumed bytes between
/// ingestion calls. Feed it chunks of any size — reads split packets at
/// arbitrary boundaries — and drain complete packets as they become
/// recognizable. One deframer per stream direction; the residual buffer
/// must never be shared between streams.
///
/// Misaligned or corrupt input is recovered silently: leading garbage
/// and false sentinel matches cost discarded bytes, never errors.
#[derive(Debug)]
pub struct Deframer {
    format: PacketFormat,
    buf: BytesMut,
}

impl Deframer {
    /// Create a deframer for the given packet format.
    pub fn new(format: PacketFormat) -> Self {
        Self {
            format,
            buf: BytesMut::with_capacity(4 * format.min_wire_size()),
        }
    }

    /// Append a chunk and return a lazy iterator over the packets now
    /// recognizable in the residual buffer.
    ///
    /// An empty chunk is a transient no-data condition, not an error:
    /// nothing is appended and the iterator yields whatever the buffer
    /// already holds (normally nothing). Dropping the iterator before it
    /// is exhausted loses no data — undrained packets stay framed in the
    /// residual buffer and reappear on the next call.
    pub fn ingest<'a>(&'a mut self, chunk: &[u8]) -> Packets<'a> {
        self.buf.extend_from_slice(chunk);
        Packets { deframer: self }
    }

    /// Extract the next packet from the residual buffer, if one is
    /// complete.
    pub fn next_packet(&mut self) -> Option<Packet> {
        decode_packet(&self.format, &mut self.buf)
    }

    /// Number of bytes currently held in the residual buffer.
    pub fn residual_len(&self) -> usize {
        self.buf.len()
    }

    /// Drop all buffered bytes.
    ///
    /// Use when framing must be forcibly reset, e.g. after re-enabling
    /// a receiver that re-enters hunt mode.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// The packet format this deframer was created with.
    pub fn format(&self) -> &PacketFormat {
        &self.format
    }
}

/// Lazy packet iterator returned by [`Deframer::ingest`].
#[derive(Debug)]
pub struct Packets<'a> {
    deframer: &'a mut Deframer,
}

impl Iterator for Packets<'_> {
    type Item = Packet;

    fn next(&mut self) -> Option<Packet> {
        self.deframer.next_packet()
    }
}
