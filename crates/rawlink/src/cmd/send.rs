use std::time::Duration;

use rawlink_session::{CancelToken, LinkConfig, LinkSession};
use rawlink_wire::Packet;

use crate::cmd::{install_cancel_handler, SendArgs};
use crate::exit::{port_error, session_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{print_packet, OutputFormat};
use crate::patterns::{default_data, default_header};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let mut config = LinkConfig::default();
    if let Some(rate) = args.clock_rate {
        config.settings.internal_clock_rate = rate;
    }
    let packet_format = config.format;

    let (header, data) = if let Some(path) = &args.data_file {
        let body = std::fs::read(path)
            .map_err(|err| CliError::new(DATA_INVALID, format!("read {path:?}: {err}")))?;
        if body.len() != packet_format.packet_size() {
            return Err(CliError::new(
                DATA_INVALID,
                format!(
                    "{path:?} holds {} bytes, expected a {}-byte packet body",
                    body.len(),
                    packet_format.packet_size()
                ),
            ));
        }
        let (head, tail) = body.split_at(packet_format.header_size());
        (head.to_vec(), tail.to_vec())
    } else {
        let header = match &args.header_hex {
            Some(hex) => parse_hex(hex)?,
            None => default_header(&packet_format),
        };
        let data = match &args.data_hex {
            Some(hex) => parse_hex(hex)?,
            None => default_data(&packet_format),
        };
        (header, data)
    };

    let mut session =
        LinkSession::open(&args.port, config).map_err(|err| session_error("open failed", err))?;
    if let Some(interface) = args.interface {
        session
            .port_mut()
            .set_interface_select(interface.into())
            .map_err(|err| port_error("interface selection failed", err))?;
    }

    let token = CancelToken::new();
    install_cancel_handler(token.clone())?;

    let (_receiver, mut sender) = session
        .split()
        .map_err(|err| session_error("sender start failed", err))?;

    let interval = Duration::from_millis(args.interval_ms);
    let packet = Packet::new(header.clone(), data.clone());

    if args.burst {
        sender
            .start_transmission()
            .map_err(|err| session_error("send failed", err))?;
        for sent in 0..args.repeat {
            if token.is_cancelled() {
                break;
            }
            if sent > 0 {
                // Shared sentinel between consecutive bodies.
                sender
                    .start_transmission()
                    .map_err(|err| session_error("send failed", err))?;
            }
            sender
                .send_packet(&header, &data)
                .map_err(|err| session_error("send failed", err))?;
            print_packet(&packet, "sent", format);
        }
        sender
            .end_transmission()
            .map_err(|err| session_error("send failed", err))?;
    } else {
        for sent in 0..args.repeat {
            if token.is_cancelled() {
                break;
            }
            sender
                .send_framed(&header, &data)
                .map_err(|err| session_error("send failed", err))?;
            print_packet(&packet, "sent", format);
            if sent + 1 < args.repeat && !interval.is_zero() {
                std::thread::sleep(interval);
            }
        }
    }

    Ok(SUCCESS)
}

fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    if !cleaned.is_ascii() || cleaned.len() % 2 != 0 {
        return Err(CliError::new(
            USAGE,
            "hex input must be an even number of hex digits",
        ));
    }
    (0..cleaned.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&cleaned[i..i + 2], 16)
                .map_err(|_| CliError::new(USAGE, format!("invalid hex byte: {}", &cleaned[i..i + 2])))
        })
        .collect()
}
