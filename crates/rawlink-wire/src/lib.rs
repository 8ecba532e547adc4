//! Sentinel-delimited packet framing for continuous byte streams.
//!
//! This is the core value-add layer of rawlink. A packet is a fixed-size
//! body (header + data, sample sizes 16 + 48) delimited by sentinel bytes,
//! carried over a synchronous serial link that fills gaps with an idle
//! byte pattern. The deframer recovers packet boundaries from chunked,
//! possibly noisy input and resynchronizes silently after garbage,
//! truncation, or false sentinel matches.
//!
//! No partial reads, no buffer management in user code.

pub mod codec;
pub mod deframer;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_packet, encode_body, encode_packet, Packet, PacketFormat, DEFAULT_DATA_SIZE,
    DEFAULT_HEADER_SIZE, DEFAULT_IDLE, DEFAULT_SENTINEL,
};
pub use deframer::{Deframer, Packets};
pub use error::{Result, WireError};
pub use reader::{PacketReader, WireConfig, DEFAULT_READ_CHUNK_SIZE};
pub use writer::PacketWriter;
