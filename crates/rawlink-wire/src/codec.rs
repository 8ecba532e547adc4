use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::error::{Result, WireError};

/// Default header length in bytes.
pub const DEFAULT_HEADER_SIZE: usize = 16;

/// Default payload length in bytes.
pub const DEFAULT_DATA_SIZE: usize = 48;

/// Default packet boundary marker.
pub const DEFAULT_SENTINEL: u8 = 0x00;

/// Default fill byte transmitted when no packet data is pending.
pub const DEFAULT_IDLE: u8 = 0xFF;

/// Fixed-size packet layout shared by framer and deframer.
///
/// Immutable for the lifetime of a link session. Construct one per
/// session with [`PacketFormat::new`] or [`PacketFormat::default`] —
/// formats are plain values, never shared mutable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketFormat {
    header_size: usize,
    data_size: usize,
    sentinel: u8,
    idle: u8,
}

impl PacketFormat {
    /// Create a packet format, validating the layout.
    pub fn new(header_size: usize, data_size: usize, sentinel: u8, idle: u8) -> Result<Self> {
        if header_size == 0 || data_size == 0 {
            return Err(WireError::InvalidFormat(format!(
                "header ({header_size}) and data ({data_size}) sizes must be nonzero"
            )));
        }
        if sentinel == idle {
            return Err(WireError::InvalidFormat(format!(
                "sentinel and idle byte must differ (both {sentinel:#04x})"
            )));
        }
        Ok(Self {
            header_size,
            data_size,
            sentinel,
            idle,
        })
    }

    /// Header length in bytes.
    pub fn header_size(&self) -> usize {
        self.header_size
    }

    /// Payload length in bytes.
    pub fn data_size(&self) -> usize {
        self.data_size
    }

    /// Total packet body length (header + data).
    pub fn packet_size(&self) -> usize {
        self.header_size + self.data_size
    }

    /// Packet boundary marker value.
    pub fn sentinel(&self) -> u8 {
        self.sentinel
    }

    /// Line fill value transmitted between packets.
    pub fn idle(&self) -> u8 {
        self.idle
    }

    /// Minimum buffered bytes for a recognizable packet:
    /// leading sentinel + body + trailing sentinel.
    pub fn min_wire_size(&self) -> usize {
        self.packet_size() + 2
    }
}

impl Default for PacketFormat {
    fn default() -> Self {
        Self {
            header_size: DEFAULT_HEADER_SIZE,
            data_size: DEFAULT_DATA_SIZE,
            sentinel: DEFAULT_SENTINEL,
            idle: DEFAULT_IDLE,
        }
    }
}

/// A decoded packet: opaque header and payload.
///
/// The core never interprets the contents of either field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Fixed-length header bytes.
    pub header: Bytes,
    /// Fixed-length payload bytes.
    pub data: Bytes,
}

impl Packet {
    /// Create a new packet.
    pub fn new(header: impl Into<Bytes>, data: impl Into<Bytes>) -> Self {
        Self {
            header: header.into(),
            data: data.into(),
        }
    }

    /// Total body length (header + data).
    pub fn len(&self) -> usize {
        self.header.len() + self.data.len()
    }

    /// True if both header and data are empty.
    pub fn is_empty(&self) -> bool {
        self.header.is_empty() && self.data.is_empty()
    }

    /// Wire size of the self-delimited encoding (body + both sentinels).
    pub fn wire_size(&self) -> usize {
        self.len() + 2
    }
}

/// Encode a self-delimited packet into the wire format.
///
/// Wire format (sample sizes 16 + 48):
/// ```text
/// ┌──────────┬──────────────┬──────────────┬──────────┐
/// │ Sentinel │ Header       │ Data         │ Sentinel │
/// │ (1B)     │ (16B)        │ (48B)        │ (1B)     │
/// └──────────┴──────────────┴──────────────┴──────────┘
/// ```
/// Consecutive packets on the wire may share a single sentinel byte as
/// both the previous packet's trailer and the next packet's leader.
pub fn encode_packet(
    format: &PacketFormat,
    header: &[u8],
    data: &[u8],
    dst: &mut BytesMut,
) -> Result<()> {
    check_sizes(format, header, data)?;
    dst.reserve(format.min_wire_size());
    dst.put_u8(format.sentinel);
    dst.put_slice(header);
    dst.put_slice(data);
    dst.put_u8(format.sentinel);
    Ok(())
}

/// Encode a bare packet body (no sentinels) for the delimited-pair
/// variant, where the caller writes the sentinels separately.
pub fn encode_body(
    format: &PacketFormat,
    header: &[u8],
    data: &[u8],
    dst: &mut BytesMut,
) -> Result<()> {
    check_sizes(format, header, data)?;
    dst.reserve(format.packet_size());
    dst.put_slice(header);
    dst.put_slice(data);
    Ok(())
}

fn check_sizes(format: &PacketFormat, header: &[u8], data: &[u8]) -> Result<()> {
    if header.len() != format.header_size || data.len() != format.data_size {
        return Err(WireError::InvalidPacketSize {
            header: header.len(),
            data: data.len(),
            expected_header: format.header_size,
            expected_data: format.data_size,
        });
    }
    Ok(())
}

/// Extract the next packet from a residual buffer.
///
/// Returns `None` when the buffer holds no complete, validly delimited
/// packet yet; the remaining bytes stay in `src` for the next attempt.
/// Framing noise is recovered silently — this function never fails:
///
/// - no sentinel in a full-size buffer: the whole buffer is discarded
/// - bytes ahead of the first sentinel: discarded
/// - sentinel with a non-sentinel byte at the expected trailer position:
///   a false match inside payload data, one byte is discarded
///
/// Every pass either consumes a packet, discards at least one byte, or
/// returns, so the loop always terminates. On success the leading
/// sentinel and body are consumed; the trailing sentinel is left in the
/// buffer so it can double as the next packet's leader.
pub fn decode_packet(format: &PacketFormat, src: &mut BytesMut) -> Option<Packet> {
    let body = format.packet_size();
    loop {
        if src.len() < body + 2 {
            return None; // Need more data
        }

        let Some(at) = src.iter().position(|&b| b == format.sentinel) else {
            trace!(discarded = src.len(), "no sentinel in buffer, discarding");
            src.clear();
            return None;
        };

        if at > 0 {
            trace!(discarded = at, "discarding bytes ahead of sentinel");
            src.advance(at);
            continue;
        }

        if src[body + 1] != format.sentinel {
            // A payload byte that happens to equal the sentinel, or line
            // corruption. Discard exactly one byte so a genuine packet
            // starting inside the candidate still frames.
            trace!("false sentinel match, discarding one byte");
            src.advance(1);
            continue;
        }

        src.advance(1);
        let mut packet = src.split_to(body);
        let header = packet.split_to(format.header_size).freeze();
        let data = packet.freeze();
        // Trailing sentinel stays in `src`: it is also the next leader.
        return Some(Packet { header, data });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_body() -> (Vec<u8>, Vec<u8>) {
        let header: Vec<u8> = (1..=16).collect();
        let data: Vec<u8> = (17..=64).collect();
        (header, data)
    }

    #[test]
    fn encode_decode_roundtrip() {
        let format = PacketFormat::default();
        let (header, data) = sample_body();
        let mut wire = BytesMut::new();

        encode_packet(&format, &header, &data, &mut wire).unwrap();
        assert_eq!(wire.len(), format.min_wire_size());

        let packet = decode_packet(&format, &mut wire).unwrap();
        assert_eq!(packet.header.as_ref(), header.as_slice());
        assert_eq!(packet.data.as_ref(), data.as_slice());
        // The trailing sentinel is retained for the next packet.
        assert_eq!(wire.as_ref(), &[DEFAULT_SENTINEL]);
    }

    #[test]
    fn roundtrip_with_idle_padding() {
        let format = PacketFormat::default();
        let (header, data) = sample_body();

        let mut wire = BytesMut::new();
        wire.put_bytes(format.idle(), 10);
        encode_packet(&format, &header, &data, &mut wire).unwrap();
        wire.put_bytes(format.idle(), 7);

        let packet = decode_packet(&format, &mut wire).unwrap();
        assert_eq!(packet.header.as_ref(), header.as_slice());
        assert_eq!(packet.data.as_ref(), data.as_slice());
        assert!(decode_packet(&format, &mut wire).is_none());
    }

    #[test]
    fn consecutive_packets_share_sentinel() {
        let format = PacketFormat::default();
        let (header, data) = sample_body();

        // sentinel + body + sentinel + body + sentinel: 2 packets, 3 sentinels.
        let mut wire = BytesMut::new();
        wire.put_u8(format.sentinel());
        encode_body(&format, &header, &data, &mut wire).unwrap();
        wire.put_u8(format.sentinel());
        encode_body(&format, &data[..16], &header.repeat(3), &mut wire).unwrap();
        wire.put_u8(format.sentinel());

        let first = decode_packet(&format, &mut wire).unwrap();
        assert_eq!(first.header.as_ref(), header.as_slice());

        let second = decode_packet(&format, &mut wire).unwrap();
        assert_eq!(second.header.as_ref(), &data[..16]);
        assert_eq!(second.data.as_ref(), header.repeat(3).as_slice());

        assert!(decode_packet(&format, &mut wire).is_none());
    }

    #[test]
    fn incomplete_packet_is_retained() {
        let format = PacketFormat::default();
        let (header, data) = sample_body();
        let mut wire = BytesMut::new();
        encode_packet(&format, &header, &data, &mut wire).unwrap();
        wire.truncate(40);

        assert!(decode_packet(&format, &mut wire).is_none());
        assert_eq!(wire.len(), 40);
    }

    #[test]
    fn noise_without_sentinel_is_discarded() {
        let format = PacketFormat::default();
        let mut wire = BytesMut::new();
        wire.put_bytes(0x55, 100);

        assert!(decode_packet(&format, &mut wire).is_none());
        assert!(wire.is_empty());
    }

    #[test]
    fn short_noise_is_kept_until_resolvable() {
        let format = PacketFormat::default();
        let mut wire = BytesMut::new();
        wire.put_bytes(0x55, 20);

        // Under a full packet of data nothing is decided yet.
        assert!(decode_packet(&format, &mut wire).is_none());
        assert_eq!(wire.len(), 20);
    }

    #[test]
    fn noise_before_packet_is_skipped() {
        let format = PacketFormat::default();
        let (header, data) = sample_body();

        let mut wire = BytesMut::new();
        wire.put_slice(&[0x11, 0x22, 0x33, 0x44, 0x55]);
        encode_packet(&format, &header, &data, &mut wire).unwrap();

        let packet = decode_packet(&format, &mut wire).unwrap();
        assert_eq!(packet.header.as_ref(), header.as_slice());
        assert_eq!(packet.data.as_ref(), data.as_slice());
    }

    #[test]
    fn false_sentinel_costs_one_byte() {
        let format = PacketFormat::default();
        let (header, data) = sample_body();

        // First candidate: sentinel + 64 bytes whose trailer position is
        // not a sentinel (idle fill follows instead). A payload byte at
        // offset 30 equals the sentinel, which the deframer must treat as
        // a fresh candidate after skipping a single byte at a time.
        let mut corrupt = data.clone();
        corrupt[30] = format.sentinel();

        let mut wire = BytesMut::new();
        wire.put_u8(format.sentinel());
        wire.put_slice(&header);
        wire.put_slice(&corrupt);
        wire.put_bytes(format.idle(), 2);
        // Then a genuine packet.
        encode_packet(&format, &header, &data, &mut wire).unwrap();

        let packet = decode_packet(&format, &mut wire).unwrap();
        assert_eq!(packet.header.as_ref(), header.as_slice());
        assert_eq!(packet.data.as_ref(), data.as_slice());
        assert!(decode_packet(&format, &mut wire).is_none());
    }

    #[test]
    fn decode_terminates_on_sentinel_only_buffer() {
        // Worst case for the one-byte skip: every byte is a candidate.
        let format = PacketFormat::new(16, 48, 0xAA, 0x00).unwrap();
        let mut wire = BytesMut::new();
        wire.put_bytes(0xAA, 200);

        // 200 sentinels are 200 valid candidates with sentinel trailers:
        // each decode consumes one packet of 0xAA bytes.
        let packet = decode_packet(&format, &mut wire).unwrap();
        assert!(packet.header.iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn encode_rejects_wrong_sizes() {
        let format = PacketFormat::default();
        let mut wire = BytesMut::new();

        let err = encode_packet(&format, &[0u8; 15], &[0u8; 48], &mut wire).unwrap_err();
        assert!(matches!(
            err,
            WireError::InvalidPacketSize {
                header: 15,
                data: 48,
                ..
            }
        ));
        assert!(wire.is_empty(), "no partial write on size error");

        let err = encode_body(&format, &[0u8; 16], &[0u8; 49], &mut wire).unwrap_err();
        assert!(matches!(err, WireError::InvalidPacketSize { data: 49, .. }));
        assert!(wire.is_empty());
    }

    #[test]
    fn format_validation() {
        assert!(PacketFormat::new(16, 48, 0x00, 0xFF).is_ok());
        assert!(matches!(
            PacketFormat::new(0, 48, 0x00, 0xFF),
            Err(WireError::InvalidFormat(_))
        ));
        assert!(matches!(
            PacketFormat::new(16, 0, 0x00, 0xFF),
            Err(WireError::InvalidFormat(_))
        ));
        assert!(matches!(
            PacketFormat::new(16, 48, 0x7E, 0x7E),
            Err(WireError::InvalidFormat(_))
        ));
    }

    #[test]
    fn default_format_matches_observed_variant() {
        let format = PacketFormat::default();
        assert_eq!(format.header_size(), 16);
        assert_eq!(format.data_size(), 48);
        assert_eq!(format.packet_size(), 64);
        assert_eq!(format.sentinel(), 0x00);
        assert_eq!(format.idle(), 0xFF);
        assert_eq!(format.min_wire_size(), 66);
    }

    #[test]
    fn packet_accessors() {
        let packet = Packet::new(vec![1u8; 16], vec![2u8; 48]);
        assert_eq!(packet.len(), 64);
        assert_eq!(packet.wire_size(), 66);
        assert!(!packet.is_empty());
    }
}
