/// Errors that can occur while framing or deframing packets.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// Header or data length does not match the packet format.
    #[error("invalid packet size (header {header}, data {data}, expected {expected_header}+{expected_data})")]
    InvalidPacketSize {
        header: usize,
        data: usize,
        expected_header: usize,
        expected_data: usize,
    },

    /// The packet format itself is unusable.
    #[error("invalid packet format: {0}")]
    InvalidFormat(String),

    /// An I/O error occurred while reading or writing the stream.
    #[error("wire I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before a complete packet was received.
    #[error("link closed")]
    LinkClosed,
}

pub type Result<T> = std::result::Result<T, WireError>;
