use std::io::Write;

use tracing::trace;

use rawlink_wire::{Packet, PacketFormat, PacketWriter};

use crate::error::Result;

/// Transmit facade over a byte-stream sink.
///
/// Runs independently of the receive path, typically from its own
/// thread over a cloned port handle. Two framing styles:
///
/// - `send_framed` writes one self-delimited packet per call;
/// - `start_transmission` / `send_packet` / `end_transmission` bracket a
///   burst with explicit sentinels, letting consecutive bodies share
///   the delimiter between them.
pub struct Sender<T> {
    writer: PacketWriter<T>,
}

impl<T: Write> Sender<T> {
    /// Create a sender over a byte-stream sink.
    pub fn new(inner: T, format: PacketFormat) -> Self {
        Self {
            writer: PacketWriter::with_format(inner, format),
        }
    }

    /// Open a transmission: write the leading sentinel.
    pub fn start_transmission(&mut self) -> Result<()> {
        self.writer.start_transmission()?;
        Ok(())
    }

    /// Send one packet body within an open transmission.
    pub fn send_packet(&mut self, header: &[u8], data: &[u8]) -> Result<()> {
        trace!(bytes = header.len() + data.len(), "sending packet body");
        self.writer.write_body(header, data)?;
        Ok(())
    }

    /// Close a transmission: write the trailing sentinel and flush.
    pub fn end_transmission(&mut self) -> Result<()> {
        self.writer.end_transmission()?;
        Ok(())
    }

    /// Send one fully delimited packet in a single write.
    pub fn send_framed(&mut self, header: &[u8], data: &[u8]) -> Result<()> {
        self.writer.send(header, data)?;
        Ok(())
    }

    /// Send a packet value, fully delimited.
    pub fn send_packet_value(&mut self, packet: &Packet) -> Result<()> {
        self.writer.write_packet(packet)?;
        Ok(())
    }

    /// Consume the sender and return the inner stream.
    pub fn into_inner(self) -> T {
        self.writer.into_inner()
    }
}
