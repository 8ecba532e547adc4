//! Built-in test patterns for sample transmissions.

use rawlink_wire::PacketFormat;

/// Descending ramp header: 0xFF, 0xEE, ... stepping down by 0x11.
pub fn default_header(format: &PacketFormat) -> Vec<u8> {
    (0..format.header_size())
        .map(|i| 0xFFu8.wrapping_sub((i as u8).wrapping_mul(0x11)))
        .collect()
}

/// Ascending staircase data: each value repeated three times, stepping
/// up by 0x11.
pub fn default_data(format: &PacketFormat) -> Vec<u8> {
    (0..format.data_size())
        .map(|i| ((i / 3) as u8).wrapping_mul(0x11))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_ramp_descends() {
        let header = default_header(&PacketFormat::default());
        assert_eq!(header.len(), 16);
        assert_eq!(header[0], 0xFF);
        assert_eq!(header[1], 0xEE);
        assert_eq!(header[15], 0x00);
    }

    #[test]
    fn data_staircase_ascends() {
        let data = default_data(&PacketFormat::default());
        assert_eq!(data.len(), 48);
        assert_eq!(&data[0..3], &[0x00, 0x00, 0x00]);
        assert_eq!(&data[3..6], &[0x11, 0x11, 0x11]);
        assert_eq!(data[47], 0xFF);
    }
}
