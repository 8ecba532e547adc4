//! Sentinel-framed packet links over synchronous serial ports.
//!
//! rawlink recovers fixed-size packets (header + data delimited by
//! sentinel bytes) from a noisy synchronous serial byte stream, and
//! frames packets for transmission, with automatic resynchronization
//! after garbage, truncation and idle fill.
//!
//! # Crate Structure
//!
//! - [`wire`] — framing core: packet format, framer, stateful deframer
//! - [`port`] — hardware binding: device access, settings, signals
//! - [`session`] — blocking receive/transmit loops with cancellation

/// Re-export framing types.
pub mod wire {
    pub use rawlink_wire::*;
}

/// Re-export port binding types.
pub mod port {
    pub use rawlink_port::*;
}

/// Re-export session types.
pub mod session {
    pub use rawlink_session::*;
}
