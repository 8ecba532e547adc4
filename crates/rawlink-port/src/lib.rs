//! Synchronous serial port binding.
//!
//! This is the hardware side of rawlink: opening and configuring a
//! synchronous serial adapter through its tty/ioctl control surface,
//! with an explicit, validated settings model in place of raw register
//! words. The framing core consumes a port only through `Read`/`Write`;
//! everything else here is device control (clock routing, encoding,
//! idle pattern, signal lines, receiver/transmitter state).

pub mod error;
pub mod params;
pub mod settings;
pub mod signals;

#[cfg(unix)]
pub mod device;

pub use error::{PortError, Result};
pub use params::{InterfaceMode, InterfaceSelect, SerialParams};
pub use settings::{ClockSource, CrcMode, Encoding, Parity, Protocol, Settings};
pub use signals::SignalState;

#[cfg(unix)]
pub use device::{PortHandle, SyncPort, TransferMode};
