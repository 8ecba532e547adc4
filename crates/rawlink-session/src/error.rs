/// Errors that can occur in link session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Framing-level error (packet size misuse, stream I/O).
    #[error("wire error: {0}")]
    Wire(#[from] rawlink_wire::WireError),

    /// Device-level error.
    #[error("port error: {0}")]
    Port(#[from] rawlink_port::PortError),

    /// The underlying byte stream ended.
    #[error("link disconnected")]
    Disconnected,
}

pub type Result<T> = std::result::Result<T, SessionError>;
