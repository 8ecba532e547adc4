use std::fmt;
use std::io;

use rawlink_port::PortError;
use rawlink_session::SessionError;
use rawlink_wire::WireError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn port_error(context: &str, err: PortError) -> CliError {
    match err {
        PortError::NotFound(_) => CliError::new(FAILURE, format!("{context}: {err}")),
        PortError::AccessDenied(_) => CliError::new(PERMISSION_DENIED, format!("{context}: {err}")),
        PortError::InvalidSetting(_) => CliError::new(USAGE, format!("{context}: {err}")),
        PortError::Open { source, .. } => io_error(context, source),
        PortError::Io(source) => io_error(context, source),
        other => CliError::new(PORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn wire_error(context: &str, err: WireError) -> CliError {
    match err {
        WireError::InvalidPacketSize { .. } | WireError::InvalidFormat(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        WireError::Io(source) => io_error(context, source),
        WireError::LinkClosed => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    match err {
        SessionError::Wire(err) => wire_error(context, err),
        SessionError::Port(err) => port_error(context, err),
        SessionError::Disconnected => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}
