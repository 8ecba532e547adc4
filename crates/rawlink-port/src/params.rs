//! Driver parameter block and the bit-field tables that map [`Settings`]
//! onto it.
//!
//! The driver ABI packs clock routing, modem-control automation and CRC
//! options into flag words. Encoding and decoding are explicit, validated
//! functions over those tables — settings never reach the driver through
//! dynamic attribute access.

use std::fmt;
use std::os::raw::{c_uchar, c_ulong, c_ushort};

use crate::error::{PortError, Result};
use crate::settings::{ClockSource, CrcMode, Encoding, Parity, Protocol, Settings};

// Misc option flags (SerialParams::flags).
pub const FLAG_RXC_INV: u16 = 0x0002;
pub const FLAG_TXC_INV: u16 = 0x0004;
pub const FLAG_TXC_RXCPIN: u16 = 0x0008;
pub const FLAG_AUTO_CTS: u16 = 0x0020;
pub const FLAG_AUTO_DCD: u16 = 0x0040;
pub const FLAG_AUTO_RTS: u16 = 0x0080;
pub const FLAG_RXC_DPLL: u16 = 0x0100;
pub const FLAG_RXC_BRG: u16 = 0x0200;
pub const FLAG_TXC_DPLL: u16 = 0x0400;
pub const FLAG_TXC_BRG: u16 = 0x0800;
pub const FLAG_DPLL_DIV8: u16 = 0x1000;
pub const FLAG_DPLL_DIV16: u16 = 0x2000;
pub const FLAG_RXC_TXCPIN: u16 = 0x8000;

/// Receive clock routing bits within the flag word.
pub const RXC_FLAG_MASK: u16 = FLAG_RXC_TXCPIN | FLAG_RXC_DPLL | FLAG_RXC_BRG;
/// Transmit clock routing bits within the flag word.
pub const TXC_FLAG_MASK: u16 = FLAG_TXC_RXCPIN | FLAG_TXC_DPLL | FLAG_TXC_BRG;

// CRC field layout (SerialParams::crc_type).
pub const CRC_VALUE_MASK: u16 = 0x00FF;
pub const CRC_RETURN_EX: u16 = 0x8000;

// Preamble length codes.
pub const PREAMBLE_LENGTH_8BITS: u8 = 0;
pub const PREAMBLE_LENGTH_16BITS: u8 = 1;
pub const PREAMBLE_LENGTH_32BITS: u8 = 2;
pub const PREAMBLE_LENGTH_64BITS: u8 = 3;

// Preamble pattern codes.
pub const PREAMBLE_PATTERN_NONE: u8 = 0;
pub const PREAMBLE_PATTERN_ZEROS: u8 = 1;
pub const PREAMBLE_PATTERN_FLAGS: u8 = 2;
pub const PREAMBLE_PATTERN_10: u8 = 3;
pub const PREAMBLE_PATTERN_01: u8 = 4;
pub const PREAMBLE_PATTERN_ONES: u8 = 5;

// Transmit idle modes.
pub const TXIDLE_FLAGS: u32 = 0;
pub const TXIDLE_ALT_ZEROS_ONES: u32 = 1;
pub const TXIDLE_ZEROS: u32 = 2;
pub const TXIDLE_ONES: u32 = 3;
pub const TXIDLE_CUSTOM_8: u32 = 0x1000_0000;
pub const TXIDLE_CUSTOM_16: u32 = 0x2000_0000;

/// Mode value used to program the base clock rate.
pub const MODE_BASE_CLOCK: u32 = 7;

// Interface mode word layout.
pub const INTERFACE_MASK: u32 = 0x000F;
pub const INTERFACE_RTS_EN: u32 = 0x0010;
pub const INTERFACE_LL: u32 = 0x0020;
pub const INTERFACE_RL: u32 = 0x0040;
pub const INTERFACE_MSB_FIRST: u32 = 0x0080;
pub const INTERFACE_HALF_DUPLEX: u32 = 0x0100;
pub const INTERFACE_TERM_OFF: u32 = 0x0200;

/// Driver parameter block, binary-compatible with the device ioctl ABI.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialParams {
    /// Protocol selection (mode value).
    pub mode: c_ulong,
    /// 0 = normal operation, 1 = internal loopback.
    pub loopback: c_uchar,
    /// Misc options (FLAG_*).
    pub flags: c_ushort,
    /// Data encoding.
    pub encoding: c_uchar,
    /// BRG/DPLL rate for sync modes.
    pub clock_speed: c_ulong,
    /// HDLC address filter (0xFF = receive all).
    pub addr: c_uchar,
    /// Frame check selection plus option bits.
    pub crc_type: c_ushort,
    /// Preamble length code.
    pub preamble_length: c_uchar,
    /// Preamble pattern code.
    pub preamble: c_uchar,
    /// Async mode data rate.
    pub data_rate: c_ulong,
    /// Async mode data bits (5..8).
    pub data_bits: c_uchar,
    /// Async mode stop bits (1..2).
    pub stop_bits: c_uchar,
    /// Async mode parity.
    pub parity: c_uchar,
}

impl Settings {
    /// Encode these settings into the driver parameter block.
    ///
    /// Numeric fields are range-checked; clock sources and automation
    /// flags go through the routing tables above.
    pub fn to_params(&self) -> Result<SerialParams> {
        if !(5..=8).contains(&self.async_data_bits) {
            return Err(PortError::InvalidSetting(format!(
                "async_data_bits must be 5-8, got {}",
                self.async_data_bits
            )));
        }
        if !(1..=2).contains(&self.async_stop_bits) {
            return Err(PortError::InvalidSetting(format!(
                "async_stop_bits must be 1-2, got {}",
                self.async_stop_bits
            )));
        }
        if ![0, 8, 16, 32, 64].contains(&self.transmit_preamble_bits) {
            return Err(PortError::InvalidSetting(format!(
                "transmit_preamble_bits must be 0, 8, 16, 32 or 64, got {}",
                self.transmit_preamble_bits
            )));
        }

        let mut flags: u16 = 0;

        match self.transmit_clock {
            ClockSource::TxcInput => {}
            ClockSource::RxcInput => flags |= FLAG_TXC_RXCPIN,
            ClockSource::Internal => flags |= FLAG_TXC_BRG,
            ClockSource::Recovered => flags |= FLAG_TXC_DPLL,
        }
        if self.transmit_clock_invert {
            flags |= FLAG_TXC_INV;
        }

        match self.receive_clock {
            ClockSource::RxcInput => {}
            ClockSource::TxcInput => flags |= FLAG_RXC_TXCPIN,
            ClockSource::Internal => flags |= FLAG_RXC_BRG,
            ClockSource::Recovered => flags |= FLAG_RXC_DPLL,
        }
        if self.receive_clock_invert {
            flags |= FLAG_RXC_INV;
        }

        if self.auto_rts {
            flags |= FLAG_AUTO_RTS;
        }
        if self.auto_cts {
            flags |= FLAG_AUTO_CTS;
        }
        if self.auto_dcd {
            flags |= FLAG_AUTO_DCD;
        }

        let mut crc_type = self.crc as u16;
        if !self.discard_data_with_error || !self.discard_received_crc {
            crc_type |= CRC_RETURN_EX;
        }

        let preamble_length = match self.transmit_preamble_bits {
            16 => PREAMBLE_LENGTH_16BITS,
            32 => PREAMBLE_LENGTH_32BITS,
            64 => PREAMBLE_LENGTH_64BITS,
            _ => PREAMBLE_LENGTH_8BITS,
        };
        let preamble = if self.transmit_preamble_bits == 0 {
            PREAMBLE_PATTERN_NONE
        } else {
            match self.transmit_preamble_pattern {
                0x00 => PREAMBLE_PATTERN_ZEROS,
                0xFF => PREAMBLE_PATTERN_ONES,
                0x55 => PREAMBLE_PATTERN_10,
                0xAA => PREAMBLE_PATTERN_01,
                0x7E => PREAMBLE_PATTERN_FLAGS,
                _ => PREAMBLE_PATTERN_NONE,
            }
        };

        Ok(SerialParams {
            mode: self.protocol as u32 as c_ulong,
            loopback: self.internal_loopback as c_uchar,
            flags,
            encoding: self.encoding as u8 as c_uchar,
            clock_speed: self.internal_clock_rate as c_ulong,
            addr: self.hdlc_address_filter as c_uchar,
            crc_type,
            preamble_length: preamble_length as c_uchar,
            preamble: preamble as c_uchar,
            data_rate: self.async_data_rate as c_ulong,
            data_bits: self.async_data_bits as c_uchar,
            stop_bits: self.async_stop_bits as c_uchar,
            parity: self.async_parity as u8 as c_uchar,
        })
    }

    /// Decode a driver parameter block into settings.
    ///
    /// Total over any incoming bit pattern: unknown values decode to the
    /// documented defaults, matching the tolerant read path of the
    /// driver API.
    pub fn from_params(params: &SerialParams) -> Self {
        let flags = params.flags;

        let receive_clock = match flags & RXC_FLAG_MASK {
            f if f & FLAG_RXC_BRG != 0 => ClockSource::Internal,
            f if f & FLAG_RXC_DPLL != 0 => ClockSource::Recovered,
            f if f & FLAG_RXC_TXCPIN != 0 => ClockSource::TxcInput,
            _ => ClockSource::RxcInput,
        };
        let transmit_clock = match flags & TXC_FLAG_MASK {
            f if f & FLAG_TXC_BRG != 0 => ClockSource::Internal,
            f if f & FLAG_TXC_DPLL != 0 => ClockSource::Recovered,
            f if f & FLAG_TXC_RXCPIN != 0 => ClockSource::RxcInput,
            _ => ClockSource::TxcInput,
        };

        let return_ex = params.crc_type & CRC_RETURN_EX != 0;

        let (transmit_preamble_bits, transmit_preamble_pattern) =
            match (params.preamble_length, params.preamble) {
                (_, PREAMBLE_PATTERN_NONE) => (0, 0),
                (length, pattern) => {
                    let bits = match length {
                        PREAMBLE_LENGTH_16BITS => 16,
                        PREAMBLE_LENGTH_32BITS => 32,
                        PREAMBLE_LENGTH_64BITS => 64,
                        _ => 8,
                    };
                    let value = match pattern {
                        PREAMBLE_PATTERN_ZEROS => 0x00,
                        PREAMBLE_PATTERN_ONES => 0xFF,
                        PREAMBLE_PATTERN_10 => 0x55,
                        PREAMBLE_PATTERN_01 => 0xAA,
                        PREAMBLE_PATTERN_FLAGS => 0x7E,
                        _ => 0x00,
                    };
                    (bits, value)
                }
            };

        Settings {
            protocol: Protocol::from_mode(params.mode as u32),
            encoding: Encoding::from_raw(params.encoding as u8),
            msb_first: false, // carried in the interface word, not here
            internal_loopback: params.loopback != 0,
            crc: CrcMode::from_raw(params.crc_type & CRC_VALUE_MASK),
            discard_data_with_error: !return_ex,
            discard_received_crc: !return_ex,
            hdlc_address_filter: params.addr as u8,
            transmit_preamble_pattern,
            transmit_preamble_bits,
            internal_clock_rate: params.clock_speed as u32,
            transmit_clock,
            transmit_clock_invert: flags & FLAG_TXC_INV != 0,
            receive_clock,
            receive_clock_invert: flags & FLAG_RXC_INV != 0,
            auto_cts: flags & FLAG_AUTO_CTS != 0,
            auto_dcd: flags & FLAG_AUTO_DCD != 0,
            auto_rts: flags & FLAG_AUTO_RTS != 0,
            async_data_rate: params.data_rate as u32,
            async_data_bits: params.data_bits as u8,
            async_stop_bits: params.stop_bits as u8,
            async_parity: Parity::from_raw(params.parity as u8),
            ..Settings::default()
        }
    }
}

/// Serial interface (electrical standard) selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum InterfaceSelect {
    #[default]
    Disabled = 0,
    Rs232 = 1,
    V35 = 2,
    Rs422 = 3,
    Rs530a = 4,
}

impl InterfaceSelect {
    fn from_raw(value: u32) -> Self {
        match value {
            1 => Self::Rs232,
            2 => Self::V35,
            3 => Self::Rs422,
            4 => Self::Rs530a,
            _ => Self::Disabled,
        }
    }
}

impl fmt::Display for InterfaceSelect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disabled => "OFF",
            Self::Rs232 => "RS232",
            Self::V35 => "V35",
            Self::Rs422 => "RS422",
            Self::Rs530a => "RS530A",
        };
        f.write_str(name)
    }
}

/// Decoded view of the interface mode word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceMode {
    pub select: InterfaceSelect,
    pub rts_output_enable: bool,
    /// Local loopback (LL signal).
    pub local_loopback: bool,
    /// Remote loopback (RL signal).
    pub remote_loopback: bool,
    pub msb_first: bool,
    pub half_duplex: bool,
    /// Line termination enabled (default on).
    pub termination: bool,
}

impl Default for InterfaceMode {
    fn default() -> Self {
        Self {
            select: InterfaceSelect::Disabled,
            rts_output_enable: false,
            local_loopback: false,
            remote_loopback: false,
            msb_first: false,
            half_duplex: false,
            termination: true,
        }
    }
}

impl InterfaceMode {
    /// Pack into the interface mode word.
    pub fn encode(&self) -> u32 {
        let mut word = self.select as u32;
        if self.rts_output_enable {
            word |= INTERFACE_RTS_EN;
        }
        if self.local_loopback {
            word |= INTERFACE_LL;
        }
        if self.remote_loopback {
            word |= INTERFACE_RL;
        }
        if self.msb_first {
            word |= INTERFACE_MSB_FIRST;
        }
        if self.half_duplex {
            word |= INTERFACE_HALF_DUPLEX;
        }
        if !self.termination {
            word |= INTERFACE_TERM_OFF;
        }
        word
    }

    /// Unpack an interface mode word.
    pub fn decode(word: u32) -> Self {
        Self {
            select: InterfaceSelect::from_raw(word & INTERFACE_MASK),
            rts_output_enable: word & INTERFACE_RTS_EN != 0,
            local_loopback: word & INTERFACE_LL != 0,
            remote_loopback: word & INTERFACE_RL != 0,
            msb_first: word & INTERFACE_MSB_FIRST != 0,
            half_duplex: word & INTERFACE_HALF_DUPLEX != 0,
            termination: word & INTERFACE_TERM_OFF == 0,
        }
    }
}

/// Encode an idle fill pattern into the transmit idle mode word.
///
/// Well-known patterns map to the hardware's named idle modes, anything
/// else becomes a custom 8- or 16-bit pattern.
pub fn encode_tx_idle(pattern: u16) -> u32 {
    match pattern {
        0x7E => TXIDLE_FLAGS,
        0xAA => TXIDLE_ALT_ZEROS_ONES,
        0x00 => TXIDLE_ZEROS,
        0xFF => TXIDLE_ONES,
        p if p < 0x100 => TXIDLE_CUSTOM_8 + p as u32,
        p => TXIDLE_CUSTOM_16 + p as u32,
    }
}

/// Decode a transmit idle mode word back to its fill pattern.
pub fn decode_tx_idle(raw: u32) -> u16 {
    match raw {
        TXIDLE_FLAGS => 0x7E,
        TXIDLE_ALT_ZEROS_ONES => 0xAA,
        TXIDLE_ZEROS => 0x00,
        TXIDLE_ONES => 0xFF,
        r if r & TXIDLE_CUSTOM_8 != 0 => (r & 0xFF) as u16,
        r if r & TXIDLE_CUSTOM_16 != 0 => (r & 0xFFFF) as u16,
        _ => 0xFF,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_link_settings() -> Settings {
        Settings {
            protocol: Protocol::Raw,
            encoding: Encoding::Nrz,
            crc: CrcMode::Off,
            transmit_clock: ClockSource::TxcInput,
            receive_clock: ClockSource::RxcInput,
            internal_clock_rate: 115_200,
            ..Settings::default()
        }
    }

    #[test]
    fn raw_link_flag_word() {
        // TxC/RxC pin clocks are the zero encoding: no routing bits set.
        let params = raw_link_settings().to_params().unwrap();
        assert_eq!(params.mode, 6);
        assert_eq!(params.flags, 0);
        assert_eq!(params.crc_type, 0);
        assert_eq!(params.clock_speed, 115_200);
    }

    #[test]
    fn clock_routing_table() {
        let mut settings = raw_link_settings();

        settings.transmit_clock = ClockSource::Internal;
        settings.receive_clock = ClockSource::Internal;
        let params = settings.to_params().unwrap();
        assert_eq!(params.flags, FLAG_TXC_BRG | FLAG_RXC_BRG);

        settings.transmit_clock = ClockSource::Recovered;
        settings.receive_clock = ClockSource::Recovered;
        let params = settings.to_params().unwrap();
        assert_eq!(params.flags, FLAG_TXC_DPLL | FLAG_RXC_DPLL);

        settings.transmit_clock = ClockSource::RxcInput;
        settings.receive_clock = ClockSource::TxcInput;
        let params = settings.to_params().unwrap();
        assert_eq!(params.flags, FLAG_TXC_RXCPIN | FLAG_RXC_TXCPIN);
    }

    #[test]
    fn clock_invert_and_auto_flags() {
        let mut settings = raw_link_settings();
        settings.transmit_clock_invert = true;
        settings.receive_clock_invert = true;
        settings.auto_rts = true;
        settings.auto_cts = true;
        settings.auto_dcd = true;

        let params = settings.to_params().unwrap();
        assert_eq!(
            params.flags,
            FLAG_TXC_INV | FLAG_RXC_INV | FLAG_AUTO_RTS | FLAG_AUTO_CTS | FLAG_AUTO_DCD
        );
    }

    #[test]
    fn crc_return_ex_when_keeping_bad_data() {
        let mut settings = Settings::default();
        settings.discard_data_with_error = false;
        let params = settings.to_params().unwrap();
        assert_eq!(params.crc_type, CrcMode::Crc16 as u16 | CRC_RETURN_EX);
    }

    #[test]
    fn params_roundtrip_for_all_clock_sources() {
        let sources = [
            ClockSource::TxcInput,
            ClockSource::RxcInput,
            ClockSource::Internal,
            ClockSource::Recovered,
        ];
        for &tx in &sources {
            for &rx in &sources {
                let mut settings = raw_link_settings();
                settings.transmit_clock = tx;
                settings.receive_clock = rx;

                let decoded = Settings::from_params(&settings.to_params().unwrap());
                assert_eq!(decoded.transmit_clock, tx, "tx {tx} rx {rx}");
                assert_eq!(decoded.receive_clock, rx, "tx {tx} rx {rx}");
                assert_eq!(decoded.protocol, Protocol::Raw);
                assert_eq!(decoded.crc, CrcMode::Off);
                assert_eq!(decoded.internal_clock_rate, 115_200);
            }
        }
    }

    #[test]
    fn preamble_tables() {
        let mut settings = Settings::default();
        settings.transmit_preamble_bits = 32;
        settings.transmit_preamble_pattern = 0x7E;
        let params = settings.to_params().unwrap();
        assert_eq!(params.preamble_length, PREAMBLE_LENGTH_32BITS);
        assert_eq!(params.preamble, PREAMBLE_PATTERN_FLAGS);

        let decoded = Settings::from_params(&params);
        assert_eq!(decoded.transmit_preamble_bits, 32);
        assert_eq!(decoded.transmit_preamble_pattern, 0x7E);

        // No preamble encodes pattern NONE regardless of the pattern byte.
        settings.transmit_preamble_bits = 0;
        let params = settings.to_params().unwrap();
        assert_eq!(params.preamble, PREAMBLE_PATTERN_NONE);
        assert_eq!(Settings::from_params(&params).transmit_preamble_bits, 0);
    }

    #[test]
    fn rejects_out_of_range_async_fields() {
        let mut settings = Settings::default();
        settings.async_data_bits = 9;
        assert!(matches!(
            settings.to_params(),
            Err(PortError::InvalidSetting(_))
        ));

        let mut settings = Settings::default();
        settings.async_stop_bits = 3;
        assert!(matches!(
            settings.to_params(),
            Err(PortError::InvalidSetting(_))
        ));

        let mut settings = Settings::default();
        settings.transmit_preamble_bits = 12;
        assert!(matches!(
            settings.to_params(),
            Err(PortError::InvalidSetting(_))
        ));
    }

    #[test]
    fn interface_word_roundtrip() {
        let mode = InterfaceMode {
            select: InterfaceSelect::Rs422,
            rts_output_enable: true,
            local_loopback: false,
            remote_loopback: true,
            msb_first: false,
            half_duplex: true,
            termination: false,
        };
        let word = mode.encode();
        assert_eq!(
            word,
            3 | INTERFACE_RTS_EN | INTERFACE_RL | INTERFACE_HALF_DUPLEX | INTERFACE_TERM_OFF
        );
        assert_eq!(InterfaceMode::decode(word), mode);
    }

    #[test]
    fn interface_default_has_termination_on() {
        let mode = InterfaceMode::default();
        assert_eq!(mode.encode(), 0);
        assert!(InterfaceMode::decode(0).termination);
    }

    #[test]
    fn tx_idle_pattern_tables() {
        assert_eq!(encode_tx_idle(0x7E), TXIDLE_FLAGS);
        assert_eq!(encode_tx_idle(0xAA), TXIDLE_ALT_ZEROS_ONES);
        assert_eq!(encode_tx_idle(0x00), TXIDLE_ZEROS);
        assert_eq!(encode_tx_idle(0xFF), TXIDLE_ONES);
        assert_eq!(encode_tx_idle(0x5A), TXIDLE_CUSTOM_8 + 0x5A);
        assert_eq!(encode_tx_idle(0x1234), TXIDLE_CUSTOM_16 + 0x1234);

        for pattern in [0x7Eu16, 0xAA, 0x00, 0xFF, 0x5A, 0x1234] {
            assert_eq!(decode_tx_idle(encode_tx_idle(pattern)), pattern);
        }
    }
}
