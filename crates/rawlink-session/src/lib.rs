//! Blocking consumer loops for sentinel-framed serial links.
//!
//! The receive path is one dedicated thread per port direction: block
//! on the device read, feed the chunk through the deframer, hand each
//! decoded packet to a callback, repeat. The transmit path runs
//! independently over a cloned port handle. Both honor a shared
//! [`CancelToken`] instead of any global run flag.

pub mod cancel;
pub mod config;
pub mod error;
pub mod receiver;
pub mod sender;

#[cfg(unix)]
pub mod session;

pub use cancel::CancelToken;
pub use config::{default_port_settings, LinkConfig, DEFAULT_CLOCK_RATE};
pub use error::{Result, SessionError};
pub use receiver::Receiver;
pub use sender::Sender;

#[cfg(unix)]
pub use session::LinkSession;
