use std::path::PathBuf;

/// Errors that can occur in serial port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// The device node does not exist.
    #[error("port not found: {0}")]
    NotFound(PathBuf),

    /// The device exists but cannot be opened by this process.
    #[error("access denied or port in use: {0}")]
    AccessDenied(PathBuf),

    /// Failed to open the device for another reason.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A device control operation failed.
    #[error("{op} failed: {source}")]
    Ioctl {
        op: &'static str,
        source: std::io::Error,
    },

    /// A settings value is outside the range the hardware accepts.
    #[error("invalid setting: {0}")]
    InvalidSetting(String),

    /// An I/O error occurred on the port.
    #[error("port I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PortError>;
