//! Synchronous serial device access over the driver's tty/ioctl surface.

use std::ffi::CString;
use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{PortError, Result};
use crate::params::{
    decode_tx_idle, encode_tx_idle, InterfaceMode, InterfaceSelect, SerialParams, FLAG_DPLL_DIV8,
};
use crate::settings::{Protocol, Settings};
use crate::signals::SignalState;

// Line disciplines.
pub const N_TTY: libc::c_int = 0;
pub const N_HDLC: libc::c_int = 13;

/// Transmitter data transfer mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Programmed I/O: no idle fill between consecutive writes.
    Pio,
    /// DMA: bursts separated by idle pattern.
    Dma,
}

const ENABLE_PIO: libc::c_ulong = 0x8000_0001;
const ENABLE_DMA: libc::c_ulong = 0x4000_0001;

/// Default adapter base clock in Hz.
pub const DEFAULT_BASE_CLOCK_RATE: u32 = 14_745_600;

/// Default receive transfer size in bytes.
pub const DEFAULT_RECEIVE_TRANSFER_SIZE: usize = 256;

// Device ioctl codes ('m' magic space).
const IOC_NRSHIFT: u32 = 0;
const IOC_TYPESHIFT: u32 = 8;
const IOC_SIZESHIFT: u32 = 16;
const IOC_DIRSHIFT: u32 = 30;

const IOC_NONE: u32 = 0;
const IOC_WRITE: u32 = 1;
const IOC_READ: u32 = 2;

const fn ioc(dir: u32, nr: u32, size: u32) -> libc::c_ulong {
    ((dir << IOC_DIRSHIFT)
        | ((b'm' as u32) << IOC_TYPESHIFT)
        | (nr << IOC_NRSHIFT)
        | (size << IOC_SIZESHIFT)) as libc::c_ulong
}

const PARAMS_SIZE: u32 = std::mem::size_of::<SerialParams>() as u32;

const IOC_SET_PARAMS: libc::c_ulong = ioc(IOC_WRITE, 0, PARAMS_SIZE);
const IOC_GET_PARAMS: libc::c_ulong = ioc(IOC_READ, 1, PARAMS_SIZE);
const IOC_SET_TXIDLE: libc::c_ulong = ioc(IOC_NONE, 2, 0);
const IOC_TX_ENABLE: libc::c_ulong = ioc(IOC_NONE, 4, 0);
const IOC_RX_ENABLE: libc::c_ulong = ioc(IOC_NONE, 5, 0);
const IOC_WAIT_EVENT: libc::c_ulong = ioc(
    IOC_READ | IOC_WRITE,
    8,
    std::mem::size_of::<libc::c_int>() as u32,
);
const IOC_SET_IF: libc::c_ulong = ioc(IOC_NONE, 10, 0);
const IOC_GET_IF: libc::c_ulong = ioc(IOC_NONE, 11, 0);

/// An open synchronous serial port.
///
/// Owns the device descriptor and a small cache of the write-only device
/// state (idle pattern, transfer size). The port is the `Read`/`Write`
/// byte-stream source and sink consumed by the framing core; everything
/// else here is device control.
pub struct SyncPort {
    fd: OwnedFd,
    path: PathBuf,
    settings: Settings,
    tx_idle: u32,
    receive_transfer_size: usize,
    base_clock_rate: u32,
}

impl SyncPort {
    /// Return device paths that look like synchronous serial ports.
    pub fn enumerate() -> Vec<PathBuf> {
        let mut ports: Vec<PathBuf> = match std::fs::read_dir("/dev") {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok())
                .filter(|entry| {
                    entry
                        .file_name()
                        .to_str()
                        .is_some_and(is_candidate_port_name)
                })
                .map(|entry| entry.path())
                .collect(),
            Err(_) => Vec::new(),
        };
        ports.sort();
        ports
    }

    /// Open a port device.
    ///
    /// The device is opened non-blocking so a held DCD input cannot hang
    /// the open, then switched to blocking I/O once configured.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|_| PortError::NotFound(path.clone()))?;

        // SAFETY: c_path is a valid NUL-terminated string for the call.
        let raw = unsafe { libc::open(c_path.as_ptr(), libc::O_RDWR | libc::O_NONBLOCK) };
        if raw < 0 {
            let err = io::Error::last_os_error();
            return Err(match err.raw_os_error() {
                Some(libc::ENOENT) => PortError::NotFound(path),
                Some(libc::EACCES) | Some(libc::EPERM) => PortError::AccessDenied(path),
                _ => PortError::Open { path, source: err },
            });
        }
        // SAFETY: raw is a freshly opened descriptor we now own.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        let mut port = Self {
            fd,
            path,
            settings: Settings::default(),
            tx_idle: encode_tx_idle(0xFF),
            receive_transfer_size: 0,
            base_clock_rate: DEFAULT_BASE_CLOCK_RATE,
        };

        port.settings = port.settings().unwrap_or_default();
        let initial = port.settings.clone();
        port.set_line_discipline_for(&initial)?;
        port.set_blocking(true)?;
        port.set_receive_transfer_size(DEFAULT_RECEIVE_TRANSFER_SIZE)?;

        info!(path = ?port.path, "opened synchronous serial port");
        Ok(port)
    }

    /// The device path this port was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Duplicate the descriptor for use from another thread, typically
    /// to split transmit and receive paths.
    pub fn try_clone(&self) -> Result<PortHandle> {
        // SAFETY: F_DUPFD_CLOEXEC on an owned descriptor yields a new
        // descriptor or -1.
        let raw = unsafe { libc::fcntl(self.fd.as_raw_fd(), libc::F_DUPFD_CLOEXEC, 0) };
        if raw < 0 {
            return Err(PortError::Io(io::Error::last_os_error()));
        }
        // SAFETY: raw is a freshly duplicated descriptor we now own.
        Ok(PortHandle {
            fd: unsafe { OwnedFd::from_raw_fd(raw) },
        })
    }

    /// Apply a settings value to the device.
    pub fn apply_settings(&mut self, settings: &Settings) -> Result<()> {
        self.set_line_discipline_for(settings)?;

        let mut params = settings.to_params()?;
        if settings.internal_clock_rate != 0
            && self.base_clock_rate % (settings.internal_clock_rate * 16) != 0
        {
            // x16 reference clock does not divide the base clock; fall
            // back to the x8 reference.
            params.flags |= FLAG_DPLL_DIV8;
        }

        self.ioctl_set_params(&params)?;
        self.settings = settings.clone();
        debug!(path = ?self.path, protocol = %settings.protocol, "applied settings");
        Ok(())
    }

    /// Read the current settings back from the device.
    pub fn settings(&self) -> Result<Settings> {
        let mut params = SerialParams::default();
        // SAFETY: params is a valid writable parameter block for the
        // read-direction ioctl.
        let rc = unsafe {
            libc::ioctl(
                self.fd.as_raw_fd(),
                IOC_GET_PARAMS,
                &mut params as *mut SerialParams,
            )
        };
        if rc < 0 {
            return Err(PortError::Ioctl {
                op: "get params",
                source: io::Error::last_os_error(),
            });
        }
        let mut settings = Settings::from_params(&params);
        settings.min_read_bytes = self.settings.min_read_bytes;
        settings.read_timer = self.settings.read_timer;
        Ok(settings)
    }

    /// Enable the receiver. The receiver re-enters hunt mode, so any
    /// deframer state held for this port must be reset by the caller.
    pub fn enable_receiver(&mut self) -> Result<()> {
        self.ioctl_arg("enable receiver", IOC_RX_ENABLE, 1)
    }

    /// Disable the receiver.
    pub fn disable_receiver(&mut self) -> Result<()> {
        self.ioctl_arg("disable receiver", IOC_RX_ENABLE, 0)
    }

    /// Force the receiver back to idle (hunt mode) without disabling it.
    pub fn force_idle_receiver(&mut self) -> Result<()> {
        self.ioctl_arg("force idle receiver", IOC_RX_ENABLE, 2)
    }

    /// Enable the transmitter.
    pub fn enable_transmitter(&mut self) -> Result<()> {
        self.ioctl_arg("enable transmitter", IOC_TX_ENABLE, 1)
    }

    /// Disable the transmitter.
    pub fn disable_transmitter(&mut self) -> Result<()> {
        self.ioctl_arg("disable transmitter", IOC_TX_ENABLE, 0)
    }

    /// Select the transmitter data transfer mode.
    pub fn set_transmit_transfer_mode(&mut self, mode: TransferMode) -> Result<()> {
        let arg = match mode {
            // HDLC always runs DMA.
            _ if self.settings.protocol == Protocol::Hdlc => ENABLE_DMA,
            TransferMode::Pio => ENABLE_PIO,
            TransferMode::Dma => ENABLE_DMA,
        };
        self.ioctl_arg("set transmit transfer mode", IOC_TX_ENABLE, arg)
    }

    /// Set the idle fill pattern transmitted when no data is pending.
    pub fn set_transmit_idle_pattern(&mut self, pattern: u16) -> Result<()> {
        let raw = encode_tx_idle(pattern);
        self.ioctl_arg("set transmit idle", IOC_SET_TXIDLE, raw as libc::c_ulong)?;
        self.tx_idle = raw;
        Ok(())
    }

    /// The currently programmed idle fill pattern.
    pub fn transmit_idle_pattern(&self) -> u16 {
        decode_tx_idle(self.tx_idle)
    }

    /// Set the receive transfer size (1-256 bytes).
    ///
    /// Lower values reduce receive latency at the cost of per-transfer
    /// overhead. The value is adjusted to what the hardware accepts.
    pub fn set_receive_transfer_size(&mut self, size: usize) -> Result<()> {
        let size = adjust_receive_transfer_size(self.settings.protocol, size);
        if size == self.receive_transfer_size {
            return Ok(());
        }
        self.ioctl_arg(
            "set receive transfer size",
            IOC_RX_ENABLE,
            (size as libc::c_ulong) << 16,
        )?;
        self.receive_transfer_size = size;
        Ok(())
    }

    /// The effective receive transfer size.
    pub fn receive_transfer_size(&self) -> usize {
        self.receive_transfer_size
    }

    /// Snapshot the modem control lines.
    pub fn signals(&self) -> Result<SignalState> {
        let raw = self.ioctl_get_int("get signals", libc::TIOCMGET as libc::c_ulong)?;
        Ok(SignalState {
            dtr: raw & libc::TIOCM_DTR != 0,
            rts: raw & libc::TIOCM_RTS != 0,
            dsr: raw & libc::TIOCM_DSR != 0,
            cts: raw & libc::TIOCM_CTS != 0,
            dcd: raw & libc::TIOCM_CD != 0,
            ri: raw & libc::TIOCM_RI != 0,
        })
    }

    /// Set the output signals (DTR and RTS; inputs are ignored).
    pub fn set_signals(&mut self, state: SignalState) -> Result<()> {
        let mut raw: libc::c_int = 0;
        if state.dtr {
            raw |= libc::TIOCM_DTR;
        }
        if state.rts {
            raw |= libc::TIOCM_RTS;
        }
        self.ioctl_set_int("set signals", libc::TIOCMSET as libc::c_ulong, raw)
    }

    /// Data Terminal Ready output.
    pub fn dtr(&self) -> Result<bool> {
        Ok(self.signals()?.dtr)
    }

    /// Set the Data Terminal Ready output.
    pub fn set_dtr(&mut self, active: bool) -> Result<()> {
        self.set_modem_bit("set DTR", libc::TIOCM_DTR, active)
    }

    /// Request To Send output.
    pub fn rts(&self) -> Result<bool> {
        Ok(self.signals()?.rts)
    }

    /// Set the Request To Send output.
    pub fn set_rts(&mut self, active: bool) -> Result<()> {
        self.set_modem_bit("set RTS", libc::TIOCM_RTS, active)
    }

    /// Data Set Ready input.
    pub fn dsr(&self) -> Result<bool> {
        Ok(self.signals()?.dsr)
    }

    /// Clear To Send input.
    pub fn cts(&self) -> Result<bool> {
        Ok(self.signals()?.cts)
    }

    /// Data Carrier Detect input.
    pub fn dcd(&self) -> Result<bool> {
        Ok(self.signals()?.dcd)
    }

    /// Ring Indicator input.
    pub fn ri(&self) -> Result<bool> {
        Ok(self.signals()?.ri)
    }

    /// Read the interface mode word.
    pub fn interface(&self) -> Result<InterfaceMode> {
        let raw = self.ioctl_get_int("get interface", IOC_GET_IF)?;
        Ok(InterfaceMode::decode(raw as u32))
    }

    /// Write the interface mode word.
    pub fn set_interface(&mut self, mode: InterfaceMode) -> Result<()> {
        self.ioctl_arg("set interface", IOC_SET_IF, mode.encode() as libc::c_ulong)
    }

    /// Change only the electrical standard, preserving option bits.
    pub fn set_interface_select(&mut self, select: InterfaceSelect) -> Result<()> {
        let mut mode = self.interface()?;
        mode.select = select;
        self.set_interface(mode)
    }

    /// Block until one of the masked events occurs. Returns the events
    /// that fired.
    pub fn wait_events(&self, mask: u16) -> Result<u16> {
        let fired = self.ioctl_inout_int("wait event", IOC_WAIT_EVENT, mask as libc::c_int)?;
        Ok(fired as u16)
    }

    /// Wait for pending transmit data to finish sending.
    pub fn flush_transmit(&self) -> Result<()> {
        // SAFETY: fd is an open tty descriptor.
        let rc = unsafe { libc::tcdrain(self.fd.as_raw_fd()) };
        if rc < 0 {
            return Err(PortError::Io(io::Error::last_os_error()));
        }
        Ok(())
    }

    fn set_line_discipline_for(&self, settings: &Settings) -> Result<()> {
        let ldisc = match settings.protocol {
            Protocol::Hdlc | Protocol::Tdm => N_HDLC,
            _ => N_TTY,
        };
        self.ioctl_set_int("set line discipline", libc::TIOCSETD as libc::c_ulong, ldisc)?;

        if ldisc == N_TTY {
            // Raw N_TTY: no input/output processing, 8 data bits, reads
            // gated by VMIN/VTIME.
            // SAFETY: tio is a zeroed termios filled in before use.
            let mut tio: libc::termios = unsafe { std::mem::zeroed() };
            tio.c_cflag = libc::CREAD | libc::CS8 | libc::HUPCL | libc::CLOCAL;
            tio.c_cc[libc::VMIN] = settings.min_read_bytes;
            tio.c_cc[libc::VTIME] = settings.read_timer;
            // SAFETY: tio is valid; speeds are placeholders, the device
            // clocks the line itself.
            unsafe {
                libc::cfsetispeed(&mut tio, libc::B9600);
                libc::cfsetospeed(&mut tio, libc::B9600);
                if libc::tcsetattr(self.fd.as_raw_fd(), libc::TCSANOW, &tio) < 0 {
                    return Err(PortError::Ioctl {
                        op: "set termios",
                        source: io::Error::last_os_error(),
                    });
                }
            }
        }
        Ok(())
    }

    fn set_blocking(&self, blocking: bool) -> Result<()> {
        // SAFETY: F_GETFL/F_SETFL on an owned descriptor.
        unsafe {
            let flags = libc::fcntl(self.fd.as_raw_fd(), libc::F_GETFL);
            if flags < 0 {
                return Err(PortError::Io(io::Error::last_os_error()));
            }
            let flags = if blocking {
                flags & !libc::O_NONBLOCK
            } else {
                flags | libc::O_NONBLOCK
            };
            if libc::fcntl(self.fd.as_raw_fd(), libc::F_SETFL, flags) < 0 {
                return Err(PortError::Io(io::Error::last_os_error()));
            }
        }
        Ok(())
    }

    fn ioctl_set_params(&self, params: &SerialParams) -> Result<()> {
        // SAFETY: params is a valid parameter block for the
        // write-direction ioctl.
        let rc = unsafe {
            libc::ioctl(
                self.fd.as_raw_fd(),
                IOC_SET_PARAMS,
                params as *const SerialParams,
            )
        };
        if rc < 0 {
            return Err(PortError::Ioctl {
                op: "set params",
                source: io::Error::last_os_error(),
            });
        }
        Ok(())
    }

    fn ioctl_arg(&self, op: &'static str, request: libc::c_ulong, arg: libc::c_ulong) -> Result<()> {
        // SAFETY: the request takes an integer argument by value.
        let rc = unsafe { libc::ioctl(self.fd.as_raw_fd(), request, arg) };
        if rc < 0 {
            return Err(PortError::Ioctl {
                op,
                source: io::Error::last_os_error(),
            });
        }
        Ok(())
    }

    fn ioctl_get_int(&self, op: &'static str, request: libc::c_ulong) -> Result<libc::c_int> {
        let mut value: libc::c_int = 0;
        // SAFETY: value is a valid writable int for the read-direction
        // request.
        let rc = unsafe { libc::ioctl(self.fd.as_raw_fd(), request, &mut value) };
        if rc < 0 {
            return Err(PortError::Ioctl {
                op,
                source: io::Error::last_os_error(),
            });
        }
        Ok(value)
    }

    fn ioctl_set_int(&self, op: &'static str, request: libc::c_ulong, value: libc::c_int) -> Result<()> {
        // SAFETY: the request reads an int through the pointer.
        let rc = unsafe { libc::ioctl(self.fd.as_raw_fd(), request, &value) };
        if rc < 0 {
            return Err(PortError::Ioctl {
                op,
                source: io::Error::last_os_error(),
            });
        }
        Ok(())
    }

    fn ioctl_inout_int(
        &self,
        op: &'static str,
        request: libc::c_ulong,
        value: libc::c_int,
    ) -> Result<libc::c_int> {
        let mut value = value;
        // SAFETY: value is valid for read and write by the request.
        let rc = unsafe { libc::ioctl(self.fd.as_raw_fd(), request, &mut value) };
        if rc < 0 {
            return Err(PortError::Ioctl {
                op,
                source: io::Error::last_os_error(),
            });
        }
        Ok(value)
    }

    fn set_modem_bit(&self, op: &'static str, bit: libc::c_int, active: bool) -> Result<()> {
        let request = if active {
            libc::TIOCMBIS
        } else {
            libc::TIOCMBIC
        };
        self.ioctl_set_int(op, request as libc::c_ulong, bit)
    }
}

impl Read for SyncPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        read_fd(&self.fd, buf)
    }
}

impl Write for SyncPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        write_fd(&self.fd, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        // SAFETY: fd is an open tty descriptor.
        if unsafe { libc::tcdrain(self.fd.as_raw_fd()) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl Drop for SyncPort {
    fn drop(&mut self) {
        // Best effort: park the receiver at the default fill level, stop
        // the transmitter and return the device to async protocol, the
        // state the next opener expects.
        let _ = self.ioctl_arg(
            "park receiver",
            IOC_RX_ENABLE,
            (DEFAULT_RECEIVE_TRANSFER_SIZE as libc::c_ulong) << 16,
        );
        let _ = self.ioctl_arg("stop transmitter", IOC_TX_ENABLE, 0);
        let settings = Settings {
            protocol: Protocol::Async,
            ..Settings::default()
        };
        if let Ok(params) = settings.to_params() {
            let _ = self.ioctl_set_params(&params);
        }
        debug!(path = ?self.path, "closed synchronous serial port");
    }
}

impl std::fmt::Debug for SyncPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncPort")
            .field("path", &self.path)
            .field("receive_transfer_size", &self.receive_transfer_size)
            .finish()
    }
}

/// A duplicated port descriptor carrying only the byte-stream
/// capabilities. Used to feed a writer from a separate thread while the
/// owning [`SyncPort`] drives the receive side.
#[derive(Debug)]
pub struct PortHandle {
    fd: OwnedFd,
}

impl Read for PortHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        read_fd(&self.fd, buf)
    }
}

impl Write for PortHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        write_fd(&self.fd, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        // SAFETY: fd is an open tty descriptor.
        if unsafe { libc::tcdrain(self.fd.as_raw_fd()) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

fn read_fd(fd: &OwnedFd, buf: &mut [u8]) -> io::Result<usize> {
    // SAFETY: buf is a valid writable region of its stated length.
    let n = unsafe {
        libc::read(
            fd.as_raw_fd(),
            buf.as_mut_ptr().cast::<libc::c_void>(),
            buf.len(),
        )
    };
    if n < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(n as usize)
}

fn write_fd(fd: &OwnedFd, buf: &[u8]) -> io::Result<usize> {
    // SAFETY: buf is a valid readable region of its stated length.
    let n = unsafe {
        libc::write(
            fd.as_raw_fd(),
            buf.as_ptr().cast::<libc::c_void>(),
            buf.len(),
        )
    };
    if n < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(n as usize)
}

/// True for device names of the supported adapter families.
pub fn is_candidate_port_name(name: &str) -> bool {
    name.contains("ttyUSB") || name.contains("ttySLG")
}

/// Clamp and align a requested receive transfer size to what the
/// hardware accepts for the given protocol.
pub fn adjust_receive_transfer_size(protocol: Protocol, size: usize) -> usize {
    if protocol == Protocol::Hdlc || protocol == Protocol::Tdm {
        return DEFAULT_RECEIVE_TRANSFER_SIZE;
    }
    let mut size = size.clamp(1, 256);
    // Async transfers arrive in data+status pairs.
    if protocol == Protocol::Async && size % 2 != 0 {
        size += 1;
    }
    // DMA transfers must be a multiple of 4.
    if size > 128 && size % 4 != 0 {
        size += 4 - size % 4;
    }
    size
}
