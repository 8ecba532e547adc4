use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};
use rawlink_port::InterfaceSelect;
use rawlink_session::CancelToken;

use crate::exit::{CliError, CliResult, INTERNAL};
use crate::output::OutputFormat;

pub mod info;
pub mod listen;
pub mod loopback;
pub mod ports;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Receive packets and print them.
    Listen(ListenArgs),
    /// Transmit one or more packets.
    Send(SendArgs),
    /// Send and receive through internal loopback, verifying echoes.
    Loopback(LoopbackArgs),
    /// Show device settings, interface and signal lines.
    Info(InfoArgs),
    /// List candidate port devices.
    Ports(PortsArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Listen(args) => listen::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Loopback(args) => loopback::run(args, format),
        Command::Info(args) => info::run(args, format),
        Command::Ports(args) => ports::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Serial interface (electrical standard) selection.
#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum InterfaceArg {
    Rs232,
    V35,
    Rs422,
    Rs530a,
}

impl From<InterfaceArg> for InterfaceSelect {
    fn from(arg: InterfaceArg) -> Self {
        match arg {
            InterfaceArg::Rs232 => InterfaceSelect::Rs232,
            InterfaceArg::V35 => InterfaceSelect::V35,
            InterfaceArg::Rs422 => InterfaceSelect::Rs422,
            InterfaceArg::Rs530a => InterfaceSelect::Rs530a,
        }
    }
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Port device path (e.g. /dev/ttyUSB0).
    pub port: PathBuf,
    /// Exit after receiving N packets.
    #[arg(long)]
    pub count: Option<usize>,
    /// Select the serial interface (required once for USB adapters).
    #[arg(long, value_enum)]
    pub interface: Option<InterfaceArg>,
    /// Internal clock rate in Hz.
    #[arg(long)]
    pub clock_rate: Option<u32>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Port device path (e.g. /dev/ttyUSB0).
    pub port: PathBuf,
    /// Header bytes as hex (defaults to the built-in ramp pattern).
    #[arg(long, conflicts_with = "data_file")]
    pub header_hex: Option<String>,
    /// Data bytes as hex (defaults to the built-in staircase pattern).
    #[arg(long, conflicts_with = "data_file")]
    pub data_hex: Option<String>,
    /// Read a whole packet body (header + data) from a file.
    #[arg(long)]
    pub data_file: Option<PathBuf>,
    /// Number of packets to send.
    #[arg(long, default_value_t = 1)]
    pub repeat: usize,
    /// Delay between packets in milliseconds.
    #[arg(long, default_value_t = 0)]
    pub interval_ms: u64,
    /// Send all packets in one delimited burst sharing sentinels.
    #[arg(long)]
    pub burst: bool,
    /// Select the serial interface (required once for USB adapters).
    #[arg(long, value_enum)]
    pub interface: Option<InterfaceArg>,
    /// Internal clock rate in Hz.
    #[arg(long)]
    pub clock_rate: Option<u32>,
}

#[derive(Args, Debug)]
pub struct LoopbackArgs {
    /// Port device path (e.g. /dev/ttyUSB0).
    pub port: PathBuf,
    /// Number of packets to send and verify.
    #[arg(long, default_value_t = 4)]
    pub count: usize,
    /// Delay between packets in milliseconds.
    #[arg(long, default_value_t = 100)]
    pub interval_ms: u64,
    /// Select the serial interface (required once for USB adapters).
    #[arg(long, value_enum)]
    pub interface: Option<InterfaceArg>,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Port device path (e.g. /dev/ttyUSB0).
    pub port: PathBuf,
}

#[derive(Args, Debug, Default)]
pub struct PortsArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn install_cancel_handler(token: CancelToken) -> CliResult<()> {
    ctrlc::set_handler(move || {
        token.cancel();
    })
    .map_err(|err| {
        CliError::new(
            INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
