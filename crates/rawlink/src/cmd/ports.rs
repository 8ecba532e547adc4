use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use rawlink_port::SyncPort;

use crate::cmd::PortsArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;

pub fn run(_args: PortsArgs, format: OutputFormat) -> CliResult<i32> {
    let ports = SyncPort::enumerate();

    match format {
        OutputFormat::Json => {
            let names: Vec<String> = ports.iter().map(|p| p.display().to_string()).collect();
            println!(
                "{}",
                serde_json::to_string(&names).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PORT"]);
            for port in &ports {
                table.add_row(vec![port.display().to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            if ports.is_empty() {
                println!("no ports available");
            }
            for port in &ports {
                println!("{}", port.display());
            }
        }
    }

    Ok(SUCCESS)
}
