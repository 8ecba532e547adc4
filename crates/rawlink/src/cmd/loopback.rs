use std::thread;
use std::time::Duration;

use rawlink_session::{CancelToken, LinkConfig, LinkSession, SessionError};

use crate::cmd::{install_cancel_handler, LoopbackArgs};
use crate::exit::{port_error, session_error, CliError, CliResult, FAILURE, INTERNAL, SUCCESS};
use crate::output::{print_packet, OutputFormat};
use crate::patterns::{default_data, default_header};

/// Send packets through the device's internal loopback and verify each
/// one comes back intact. Exercises the whole transmit + receive path
/// without external cabling.
pub fn run(args: LoopbackArgs, format: OutputFormat) -> CliResult<i32> {
    let mut config = LinkConfig::default();
    config.settings.internal_loopback = true;
    let packet_format = config.format;

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

    let (mut receiver, mut sender) = session
        .split()
        .map_err(|err| session_error("loopback start failed", err))?;

    let header = default_header(&packet_format);
    let data = default_data(&packet_format);
    let count = args.count;
    let interval = Duration::from_millis(args.interval_ms);

    let tx_token = token.clone();
    let tx_header = header.clone();
    let tx_data = data.clone();
    let transmitter = thread::spawn(move || -> Result<usize, SessionError> {
        let mut sent = 0usize;
        while sent < count && !tx_token.is_cancelled() {
            sender.send_framed(&tx_header, &tx_data)?;
            sent += 1;
            if !interval.is_zero() {
                thread::sleep(interval);
            }
        }
        Ok(sent)
    });

    let mut received = 0usize;
    let mut matched = 0usize;
    let result = receiver.run(&token, |packet| {
        print_packet(&packet, "received", format);
        received += 1;
        if packet.header.as_ref() == header.as_slice() && packet.data.as_ref() == data.as_slice() {
            matched += 1;
        }
        if received >= count {
            token.cancel();
        }
    });

    let sent = transmitter
        .join()
        .map_err(|_| CliError::new(INTERNAL, "transmit thread panicked"))?
        .map_err(|err| session_error("transmit failed", err))?;

    if let Err(err) = result {
        match err {
            SessionError::Disconnected => {}
            other => return Err(session_error("receive failed", other)),
        }
    }

    println!("loopback: sent {sent}, received {received}, verified {matched}");
    if matched == count {
        Ok(SUCCESS)
    } else {
        Ok(FAILURE)
    }
}
