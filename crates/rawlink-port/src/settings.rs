use std::fmt;

/// Serial protocol selection, matching the driver's mode values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum Protocol {
    Async = 1,
    #[default]
    Hdlc = 2,
    Monosync = 3,
    Bisync = 4,
    Raw = 6,
    Xsync = 8,
    Tdm = 11,
}

impl Protocol {
    pub(crate) fn from_mode(mode: u32) -> Self {
        match mode {
            1 => Self::Async,
            3 => Self::Monosync,
            4 => Self::Bisync,
            6 => Self::Raw,
            8 => Self::Xsync,
            11 => Self::Tdm,
            _ => Self::Hdlc,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Async => "ASYNC",
            Self::Hdlc => "HDLC",
            Self::Monosync => "MONOSYNC",
            Self::Bisync => "BISYNC",
            Self::Raw => "RAW",
            Self::Xsync => "XSYNC",
            Self::Tdm => "TDM",
        };
        f.write_str(name)
    }
}

/// Serial data encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Encoding {
    #[default]
    Nrz = 0,
    Nrzb = 1,
    NrziMark = 2,
    NrziSpace = 3,
    /// Biphase mark (FM1).
    Fm1 = 4,
    /// Biphase space (FM0).
    Fm0 = 5,
    Manchester = 6,
    DiffBiphaseLevel = 7,
}

impl Encoding {
    pub(crate) fn from_raw(value: u8) -> Self {
        match value {
            1 => Self::Nrzb,
            2 => Self::NrziMark,
            3 => Self::NrziSpace,
            4 => Self::Fm1,
            5 => Self::Fm0,
            6 => Self::Manchester,
            7 => Self::DiffBiphaseLevel,
            _ => Self::Nrz,
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Nrz => "NRZ",
            Self::Nrzb => "NRZB",
            Self::NrziMark => "NRZI_MARK",
            Self::NrziSpace => "NRZI",
            Self::Fm1 => "FM1",
            Self::Fm0 => "FM0",
            Self::Manchester => "MANCHESTER",
            Self::DiffBiphaseLevel => "DIFF_BIPHASE_LEVEL",
        };
        f.write_str(name)
    }
}

/// Frame check selection (HDLC only; the raw sentinel protocol runs with
/// CRC off).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u16)]
pub enum CrcMode {
    Off = 0,
    #[default]
    Crc16 = 1,
    Crc32 = 2,
}

impl CrcMode {
    pub(crate) fn from_raw(value: u16) -> Self {
        match value {
            1 => Self::Crc16,
            2 => Self::Crc32,
            _ => Self::Off,
        }
    }
}

impl fmt::Display for CrcMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Off => "OFF",
            Self::Crc16 => "CRC16",
            Self::Crc32 => "CRC32",
        };
        f.write_str(name)
    }
}

/// Clock source for one direction of the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSource {
    /// External clock on the TxC pin.
    TxcInput,
    /// External clock on the RxC pin.
    RxcInput,
    /// Internal baud rate generator.
    Internal,
    /// Clock recovered from received data (DPLL).
    Recovered,
}

impl fmt::Display for ClockSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TxcInput => "TXC_INPUT",
            Self::RxcInput => "RXC_INPUT",
            Self::Internal => "INTERNAL",
            Self::Recovered => "RECOVERED",
        };
        f.write_str(name)
    }
}

/// Asynchronous parity selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Parity {
    #[default]
    Off = 0,
    Even = 1,
    Odd = 2,
}

impl Parity {
    pub(crate) fn from_raw(value: u8) -> Self {
        match value {
            1 => Self::Even,
            2 => Self::Odd,
            _ => Self::Off,
        }
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Off => "OFF",
            Self::Even => "EVEN",
            Self::Odd => "ODD",
        };
        f.write_str(name)
    }
}

/// Port settings, applied as a unit.
///
/// Plain value semantics: clone and mutate a copy, then apply. A fresh
/// default is constructed per call — settings are never shared mutable
/// state between port instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub protocol: Protocol,
    pub encoding: Encoding,
    pub msb_first: bool,
    pub internal_loopback: bool,

    pub crc: CrcMode,
    pub discard_data_with_error: bool,
    pub discard_received_crc: bool,

    /// HDLC address filter (0xFF = receive all).
    pub hdlc_address_filter: u8,

    pub transmit_preamble_pattern: u8,
    /// Preamble length in bits: 0 (none), 8, 16, 32 or 64.
    pub transmit_preamble_bits: u8,

    pub internal_clock_rate: u32,

    pub transmit_clock: ClockSource,
    pub transmit_clock_invert: bool,
    pub receive_clock: ClockSource,
    pub receive_clock_invert: bool,

    pub auto_cts: bool,
    pub auto_dcd: bool,
    pub auto_rts: bool,

    pub async_data_rate: u32,
    pub async_data_bits: u8,
    pub async_stop_bits: u8,
    pub async_parity: Parity,

    /// N_TTY VMIN: minimum bytes before a blocking read returns.
    pub min_read_bytes: u8,
    /// N_TTY VTIME: inter-byte read timer in deciseconds (0 = none).
    pub read_timer: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            protocol: Protocol::Hdlc,
            encoding: Encoding::Nrz,
            msb_first: false,
            internal_loopback: false,
            crc: CrcMode::Crc16,
            discard_data_with_error: true,
            discard_received_crc: true,
            hdlc_address_filter: 0xFF,
            transmit_preamble_pattern: 0x7E,
            transmit_preamble_bits: 0,
            internal_clock_rate: 0,
            transmit_clock: ClockSource::TxcInput,
            transmit_clock_invert: false,
            receive_clock: ClockSource::RxcInput,
            receive_clock_invert: false,
            auto_cts: false,
            auto_dcd: false,
            auto_rts: false,
            async_data_rate: 9600,
            async_data_bits: 8,
            async_stop_bits: 1,
            async_parity: Parity::Off,
            min_read_bytes: 255,
            read_timer: 0,
        }
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "protocol = {}", self.protocol)?;
        writeln!(f, "encoding = {}", self.encoding)?;
        writeln!(f, "msb_first = {}", self.msb_first)?;
        writeln!(f, "crc = {}", self.crc)?;
        writeln!(
            f,
            "discard_data_with_error = {}",
            self.discard_data_with_error
        )?;
        writeln!(f, "discard_received_crc = {}", self.discard_received_crc)?;
        writeln!(
            f,
            "hdlc_address_filter = {:#04x}",
            self.hdlc_address_filter
        )?;
        writeln!(f, "auto_rts = {}", self.auto_rts)?;
        writeln!(f, "auto_cts = {}", self.auto_cts)?;
        writeln!(f, "auto_dcd = {}", self.auto_dcd)?;
        writeln!(f, "internal_clock_rate = {}", self.internal_clock_rate)?;
        writeln!(f, "transmit_clock = {}", self.transmit_clock)?;
        writeln!(f, "transmit_clock_invert = {}", self.transmit_clock_invert)?;
        writeln!(f, "receive_clock = {}", self.receive_clock)?;
        writeln!(f, "receive_clock_invert = {}", self.receive_clock_invert)?;
        writeln!(
            f,
            "transmit_preamble_pattern = {:#04x}",
            self.transmit_preamble_pattern
        )?;
        writeln!(
            f,
            "transmit_preamble_bits = {}",
            self.transmit_preamble_bits
        )?;
        writeln!(f, "async_data_rate = {}", self.async_data_rate)?;
        writeln!(f, "async_data_bits = {}", self.async_data_bits)?;
        writeln!(f, "async_stop_bits = {}", self.async_stop_bits)?;
        writeln!(f, "async_parity = {}", self.async_parity)?;
        writeln!(f, "internal_loopback = {}", self.internal_loopback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_driver_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.protocol, Protocol::Hdlc);
        assert_eq!(settings.encoding, Encoding::Nrz);
        assert_eq!(settings.crc, CrcMode::Crc16);
        assert_eq!(settings.transmit_clock, ClockSource::TxcInput);
        assert_eq!(settings.receive_clock, ClockSource::RxcInput);
        assert_eq!(settings.hdlc_address_filter, 0xFF);
        assert_eq!(settings.min_read_bytes, 255);
    }

    #[test]
    fn defaults_are_fresh_values() {
        // Mutating one default must not leak into the next.
        let mut first = Settings::default();
        first.protocol = Protocol::Raw;
        first.internal_clock_rate = 115_200;

        let second = Settings::default();
        assert_eq!(second.protocol, Protocol::Hdlc);
        assert_eq!(second.internal_clock_rate, 0);
    }

    #[test]
    fn enum_raw_value_roundtrip() {
        for protocol in [
            Protocol::Async,
            Protocol::Hdlc,
            Protocol::Monosync,
            Protocol::Bisync,
            Protocol::Raw,
            Protocol::Xsync,
            Protocol::Tdm,
        ] {
            assert_eq!(Protocol::from_mode(protocol as u32), protocol);
        }
        for encoding in [
            Encoding::Nrz,
            Encoding::Nrzb,
            Encoding::NrziMark,
            Encoding::NrziSpace,
            Encoding::Fm1,
            Encoding::Fm0,
            Encoding::Manchester,
            Encoding::DiffBiphaseLevel,
        ] {
            assert_eq!(Encoding::from_raw(encoding as u8), encoding);
        }
    }

    #[test]
    fn unknown_raw_values_fall_back() {
        assert_eq!(Protocol::from_mode(99), Protocol::Hdlc);
        assert_eq!(Encoding::from_raw(42), Encoding::Nrz);
        assert_eq!(CrcMode::from_raw(9), CrcMode::Off);
        assert_eq!(Parity::from_raw(7), Parity::Off);
    }

    #[test]
    fn settings_display_is_dumpable() {
        let dump = Settings::default().to_string();
        assert!(dump.contains("protocol = HDLC"));
        assert!(dump.contains("crc = CRC16"));
        assert!(dump.contains("receive_clock = RXC_INPUT"));
    }
}
