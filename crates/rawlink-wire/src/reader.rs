use std::io::{ErrorKind, Read};

use crate::codec::{Packet, PacketFormat};
use crate::deframer::Deframer;
use crate::error::{Result, WireError};

/// Default per-read chunk size, matching the device default receive
/// transfer size.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 256;

/// Stream-side configuration for packet readers.
#[derive(Debug, Clone)]
pub struct WireConfig {
    /// Maximum bytes requested per read call. The transport decides the
    /// actual chunk size; anything from 1 byte up is handled.
    pub read_chunk_size: usize,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
        }
    }
}

/// Reads complete packets from any `Read` stream.
///
/// Handles partial reads and framing noise internally — callers always
/// get complete packets.
pub struct PacketReader<T> {
    inner: T,
    deframer: Deframer,
    chunk: Vec<u8>,
}

impl<T: Read> PacketReader<T> {
    /// Create a packet reader with the default format and configuration.
    pub fn new(inner: T) -> Self {
        Self::with_format(inner, PacketFormat::default(), WireConfig::default())
    }

    /// Create a packet reader with explicit format and configuration.
    pub fn with_format(inner: T, format: PacketFormat, config: WireConfig) -> Self {
        Self {
            inner,
            deframer: Deframer::new(format),
            chunk: vec![0u8; config.read_chunk_size.max(1)],
        }
    }

    /// Read the next complete packet (blocking).
    ///
    /// Returns `Err(WireError::LinkClosed)` when the stream reaches EOF
    /// before another packet frames.
    pub fn read_packet(&mut self) -> Result<Packet> {
        loop {
            if let Some(packet) = self.deframer.next_packet() {
                return Ok(packet);
            }

            let read = match self.inner.read(&mut self.chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(WireError::Io(err)),
            };

            if read == 0 {
                return Err(WireError::LinkClosed);
            }

            self.deframer.ingest(&self.chunk[..read]);
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

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Borrow the deframer, e.g. to inspect or reset the residual buffer.
    pub fn deframer_mut(&mut self) -> &mut Deframer {
        &mut self.deframer
    }
}
