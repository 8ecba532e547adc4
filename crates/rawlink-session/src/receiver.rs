use std::io::{ErrorKind, Read};

use tracing::{debug, trace};

use rawlink_wire::{Deframer, Packet, PacketFormat, WireError};

use crate::cancel::CancelToken;
use crate::error::{Result, SessionError};

/// Receive loop: blocking chunk reads fed through a deframer, decoded
/// packets handed to a callback in stream order.
///
/// One receiver per port direction; the deframer's residual buffer is
/// exclusively owned here and never shared. Cancellation is checked
/// before every blocking read and before every packet callback, so a
/// packet is either fully delivered or not delivered at all.
pub struct Receiver<T> {
    inner: T,
    deframer: Deframer,
    chunk: Vec<u8>,
}

impl<T: Read> Receiver<T> {
    /// Create a receiver over a byte-stream source.
    pub fn new(inner: T, format: PacketFormat, read_chunk_size: usize) -> Self {
        Self {
            inner,
            deframer: Deframer::new(format),
            chunk: vec![0u8; read_chunk_size.max(1)],
        }
    }

    /// Run the receive loop until cancelled or the stream fails.
    ///
    /// Timeouts and interrupted reads are transient no-data rounds, not
    /// errors. A clean end of stream returns
    /// [`SessionError::Disconnected`]; the caller owns any reconnect
    /// policy — nothing is retried here.
    pub fn run<F>(&mut self, token: &CancelToken, mut on_packet: F) -> Result<()>
    where
        F: FnMut(Packet),
    {
        debug!("receive loop started");
        while !token.is_cancelled() {
            let read = match self.inner.read(&mut self.chunk) {
                Ok(0) => {
                    debug!("stream ended");
                    return Err(SessionError::Disconnected);
                }
                Ok(n) => n,
                Err(err)
                    if matches!(
                        err.kind(),
                        ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut
                    ) =>
                {
                    // No data this round; loop back to the cancellation
                    // check.
                    continue;
                }
                Err(err) => return Err(SessionError::Wire(WireError::Io(err))),
            };

            trace!(bytes = read, "ingesting chunk");
            let mut packets = self.deframer.ingest(&self.chunk[..read]);
            while let Some(packet) = packets.next() {
                if token.is_cancelled() {
                    debug!("receive loop cancelled");
                    return Ok(());
                }
                on_packet(packet);
            }
        }
        debug!("receive loop cancelled");
        Ok(())
    }

    /// Drop any buffered bytes, e.g. after the receiver hardware was
    /// re-enabled and framing restarts from hunt mode.
    pub fn reset_framing(&mut self) {
        self.deframer.clear();
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the receiver and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
