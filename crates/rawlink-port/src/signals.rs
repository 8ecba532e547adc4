//! Serial control signal and event bit masks.

use std::fmt;

/// Data Carrier Detect (input).
pub const DCD: u8 = 0x01;
/// Transmit Data line state (output).
pub const TXD: u8 = 0x02;
/// Ring Indicator (input).
pub const RI: u8 = 0x04;
/// Receive Data line state (input).
pub const RXD: u8 = 0x08;
/// Clear To Send (input).
pub const CTS: u8 = 0x10;
/// Request To Send (output).
pub const RTS: u8 = 0x20;
/// Data Set Ready (input).
pub const DSR: u8 = 0x40;
/// Data Terminal Ready (output).
pub const DTR: u8 = 0x80;

/// Event bits for waiting on signal transitions and receiver state.
pub mod event {
    pub const DSR_ON: u16 = 0x0001;
    pub const DSR_OFF: u16 = 0x0002;
    pub const CTS_ON: u16 = 0x0004;
    pub const CTS_OFF: u16 = 0x0008;
    pub const DCD_ON: u16 = 0x0010;
    pub const DCD_OFF: u16 = 0x0020;
    pub const RI_ON: u16 = 0x0040;
    pub const RI_OFF: u16 = 0x0080;
    /// Receiver left hunt mode (data recognized).
    pub const RECEIVE_ACTIVE: u16 = 0x0100;
    /// Receiver idle pattern recognized.
    pub const RECEIVE_IDLE: u16 = 0x0200;
}

/// Render an event mask as space-separated event names.
pub fn event_names(events: u16) -> String {
    let mut names = Vec::new();
    let table = [
        (event::DSR_ON, "DSR_ON"),
        (event::DSR_OFF, "DSR_OFF"),
        (event::CTS_ON, "CTS_ON"),
        (event::CTS_OFF, "CTS_OFF"),
        (event::DCD_ON, "DCD_ON"),
        (event::DCD_OFF, "DCD_OFF"),
        (event::RI_ON, "RI_ON"),
        (event::RI_OFF, "RI_OFF"),
        (event::RECEIVE_ACTIVE, "RECEIVE_ACTIVE"),
        (event::RECEIVE_IDLE, "RECEIVE_IDLE"),
    ];
    for (bit, name) in table {
        if events & bit != 0 {
            names.push(name);
        }
    }
    names.join(" ")
}

/// Decoded snapshot of the serial control lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SignalState {
    pub dtr: bool,
    pub rts: bool,
    pub dsr: bool,
    pub cts: bool,
    pub dcd: bool,
    pub ri: bool,
}

impl SignalState {
    /// Decode a signal bit mask.
    pub fn decode(mask: u8) -> Self {
        Self {
            dtr: mask & DTR != 0,
            rts: mask & RTS != 0,
            dsr: mask & DSR != 0,
            cts: mask & CTS != 0,
            dcd: mask & DCD != 0,
            ri: mask & RI != 0,
        }
    }

    /// Pack back into a signal bit mask.
    pub fn encode(&self) -> u8 {
        let mut mask = 0;
        if self.dtr {
            mask |= DTR;
        }
        if self.rts {
            mask |= RTS;
        }
        if self.dsr {
            mask |= DSR;
        }
        if self.cts {
            mask |= CTS;
        }
        if self.dcd {
            mask |= DCD;
        }
        if self.ri {
            mask |= RI;
        }
        mask
    }
}

impl fmt::Display for SignalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DTR={} RTS={} DSR={} CTS={} DCD={} RI={}",
            self.dtr as u8, self.rts as u8, self.dsr as u8, self.cts as u8, self.dcd as u8,
            self.ri as u8
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_mask_roundtrip() {
        let state = SignalState {
            dtr: true,
            rts: false,
            dsr: true,
            cts: true,
            dcd: false,
            ri: false,
        };
        assert_eq!(state.encode(), DTR | DSR | CTS);
        assert_eq!(SignalState::decode(state.encode()), state);
    }

    #[test]
    fn decode_ignores_data_line_bits() {
        // TXD/RXD are line states, not modem control signals.
        let state = SignalState::decode(TXD | RXD);
        assert_eq!(state, SignalState::default());
    }

    #[test]
    fn event_names_render() {
        let names = event_names(event::DCD_ON | event::RECEIVE_IDLE);
        assert_eq!(names, "DCD_ON RECEIVE_IDLE");
        assert!(event_names(0).is_empty());
    }
}
