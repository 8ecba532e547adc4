mod cmd;
mod exit;
mod logging;
mod output;
mod patterns;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "rawlink", version, about = "Synchronous serial packet link CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_listen_subcommand() {
        let cli = Cli::try_parse_from([
            "rawlink",
            "listen",
            "/dev/ttyUSB0",
            "--count",
            "5",
            "--interface",
            "rs422",
        ])
        .expect("listen args should parse");

        assert!(matches!(cli.command, Command::Listen(_)));
    }

    #[test]
    fn parses_send_with_hex_payload() {
        let cli = Cli::try_parse_from([
            "rawlink",
            "send",
            "/dev/ttyUSB0",
            "--header-hex",
            "ffeeddccbbaa99887766554433221100",
            "--repeat",
            "3",
        ])
        .expect("send args should parse");

        match cli.command {
            Command::Send(args) => {
                assert_eq!(args.repeat, 3);
                assert!(!args.burst);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_conflicting_payload_args() {
        let err = Cli::try_parse_from([
            "rawlink",
            "send",
            "/dev/ttyUSB0",
            "--header-hex",
            "00ff",
            "--data-file",
            "/tmp/packet.bin",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn parses_loopback_defaults() {
        let cli = Cli::try_parse_from(["rawlink", "loopback", "/dev/ttyUSB0"])
            .expect("loopback args should parse");

        match cli.command {
            Command::Loopback(args) => {
                assert_eq!(args.count, 4);
                assert_eq!(args.interval_ms, 100);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_global_format_flag() {
        let cli = Cli::try_parse_from(["rawlink", "ports", "--format", "json"])
            .expect("ports args should parse");

        assert!(matches!(cli.command, Command::Ports(_)));
        assert!(matches!(cli.format, Some(OutputFormat::Json)));
    }
}
