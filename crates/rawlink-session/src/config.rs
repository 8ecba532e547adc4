use rawlink_port::{ClockSource, CrcMode, Encoding, Protocol, Settings};
use rawlink_wire::PacketFormat;

/// Internal clock rate for the observed link variant.
pub const DEFAULT_CLOCK_RATE: u32 = 115_200;

/// Port settings for a raw sentinel-framed link.
///
/// A fresh value is constructed on every call; callers own their copy
/// outright and mutations never leak between sessions.
pub fn default_port_settings() -> Settings {
    Settings {
        protocol: Protocol::Raw,
        encoding: Encoding::Nrz,
        crc: CrcMode::Off,
        transmit_clock: ClockSource::TxcInput,
        receive_clock: ClockSource::RxcInput,
        internal_clock_rate: DEFAULT_CLOCK_RATE,
        internal_loopback: false,
        ..Settings::default()
    }
}

/// Configuration for one link session.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Packet layout shared by framer and deframer.
    pub format: PacketFormat,
    /// Port settings applied when the session opens.
    pub settings: Settings,
    /// Receive transfer size and read chunk size in bytes.
    pub read_chunk_size: usize,
    /// True = continuous send (PIO, no idle fill between writes);
    /// false = bursts separated by idle pattern (DMA).
    pub continuous_send: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        let format = PacketFormat::default();
        Self {
            format,
            settings: default_port_settings(),
            read_chunk_size: format.packet_size(),
            continuous_send: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_match_observed_variant() {
        let settings = default_port_settings();
        assert_eq!(settings.protocol, Protocol::Raw);
        assert_eq!(settings.encoding, Encoding::Nrz);
        assert_eq!(settings.crc, CrcMode::Off);
        assert_eq!(settings.transmit_clock, ClockSource::TxcInput);
        assert_eq!(settings.receive_clock, ClockSource::RxcInput);
        assert_eq!(settings.internal_clock_rate, 115_200);
        assert!(!settings.internal_loopback);
    }

    #[test]
    fn default_settings_are_independent_values() {
        let mut first = default_port_settings();
        first.internal_loopback = true;
        first.protocol = Protocol::Hdlc;

        let second = default_port_settings();
        assert!(!second.internal_loopback);
        assert_eq!(second.protocol, Protocol::Raw);
    }

    #[test]
    fn default_config_reads_whole_packets() {
        let config = LinkConfig::default();
        assert_eq!(config.read_chunk_size, config.format.packet_size());
        assert!(config.continuous_send);
    }
}
