use rawlink_session::{CancelToken, LinkConfig, LinkSession, SessionError};

use crate::cmd::{install_cancel_handler, ListenArgs};
use crate::exit::{port_error, session_error, CliResult, SUCCESS};
use crate::output::{print_packet, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let mut config = LinkConfig::default();
    if let Some(rate) = args.clock_rate {
        config.settings.internal_clock_rate = rate;
    }

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

    tracing::debug!(port = ?args.port, "listening");
    let (mut receiver, _sender) = session
        .split()
        .map_err(|err| session_error("receiver start failed", err))?;

    let mut printed = 0usize;
    let result = receiver.run(&token, |packet| {
        print_packet(&packet, "received", format);
        printed = printed.saturating_add(1);
        if let Some(count) = args.count {
            if printed >= count {
                token.cancel();
            }
        }
    });

    match result {
        Ok(()) => Ok(SUCCESS),
        Err(SessionError::Disconnected) => Ok(SUCCESS),
        Err(err) => Err(session_error("receive failed", err)),
    }
}
