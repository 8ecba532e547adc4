use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use rawlink_port::SyncPort;
use serde::Serialize;

use crate::cmd::InfoArgs;
use crate::exit::{port_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct PortInfo {
    path: String,
    protocol: String,
    encoding: String,
    crc: String,
    transmit_clock: String,
    receive_clock: String,
    internal_clock_rate: u32,
    internal_loopback: bool,
    interface: String,
    signals: String,
    transmit_idle_pattern: String,
    receive_transfer_size: usize,
}

pub fn run(args: InfoArgs, format: OutputFormat) -> CliResult<i32> {
    let port = SyncPort::open(&args.port).map_err(|err| port_error("open failed", err))?;
    let settings = port
        .settings()
        .map_err(|err| port_error("read settings failed", err))?;
    let interface = port
        .interface()
        .map_err(|err| port_error("read interface failed", err))?;
    let signals = port
        .signals()
        .map_err(|err| port_error("read signals failed", err))?;

    let info = PortInfo {
        path: args.port.display().to_string(),
        protocol: settings.protocol.to_string(),
        encoding: settings.encoding.to_string(),
        crc: settings.crc.to_string(),
        transmit_clock: settings.transmit_clock.to_string(),
        receive_clock: settings.receive_clock.to_string(),
        internal_clock_rate: settings.internal_clock_rate,
        internal_loopback: settings.internal_loopback,
        interface: interface.select.to_string(),
        signals: signals.to_string(),
        transmit_idle_pattern: format!("{:#04x}", port.transmit_idle_pattern()),
        receive_transfer_size: port.receive_transfer_size(),
    };

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&info).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            table.add_row(vec!["path", &info.path]);
            table.add_row(vec!["protocol", &info.protocol]);
            table.add_row(vec!["encoding", &info.encoding]);
            table.add_row(vec!["crc", &info.crc]);
            table.add_row(vec!["transmit_clock", &info.transmit_clock]);
            table.add_row(vec!["receive_clock", &info.receive_clock]);
            table.add_row(vec![
                "internal_clock_rate",
                &info.internal_clock_rate.to_string(),
            ]);
            table.add_row(vec![
                "internal_loopback",
                &info.internal_loopback.to_string(),
            ]);
            table.add_row(vec!["interface", &info.interface]);
            table.add_row(vec!["signals", &info.signals]);
            table.add_row(vec!["transmit_idle_pattern", &info.transmit_idle_pattern]);
            table.add_row(vec![
                "receive_transfer_size",
                &info.receive_transfer_size.to_string(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            println!("{}", args.port.display());
            print!("{settings}");
            println!("interface = {}", info.interface);
            println!("signals = {}", info.signals);
            println!("transmit_idle_pattern = {}", info.transmit_idle_pattern);
        }
    }

    Ok(SUCCESS)
}
