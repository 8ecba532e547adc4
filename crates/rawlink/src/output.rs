use std::fmt::Write as _;
use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use rawlink_wire::Packet;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct PacketOutput<'a> {
    direction: &'a str,
    header_size: usize,
    data_size: usize,
    header: String,
    data: String,
    timestamp: String,
}

pub fn print_packet(packet: &Packet, direction: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = PacketOutput {
                direction,
                header_size: packet.header.len(),
                data_size: packet.data.len(),
                header: to_hex(packet.header.as_ref()),
                data: to_hex(packet.data.as_ref()),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["DIRECTION", "HEADER", "DATA"])
                .add_row(vec![
                    direction.to_string(),
                    to_hex(packet.header.as_ref()),
                    to_hex(packet.data.as_ref()),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{direction} packet header:");
            print!("{}", hex_dump(packet.header.as_ref()));
            println!("{direction} packet data:");
            print!("{}", hex_dump(packet.data.as_ref()));
        }
        OutputFormat::Raw => {
            print_raw(packet.header.as_ref());
            print_raw(packet.data.as_ref());
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Render a buffer in hex, 16 bytes per line with a leading offset.
pub fn hex_dump(buf: &[u8]) -> String {
    let mut out = String::new();
    for (i, byte) in buf.iter().enumerate() {
        if i % 16 == 0 {
            let _ = write!(out, "{i:09x}: ");
        }
        if i % 16 == 15 {
            let _ = writeln!(out, "{byte:02x}");
        } else {
            let _ = write!(out, "{byte:02x} ");
        }
    }
    if buf.len() % 16 != 0 {
        out.push('\n');
    }
    out
}

pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_dump_formats_16_per_line() {
        let buf: Vec<u8> = (0..20).collect();
        let dump = hex_dump(&buf);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("000000000: 00 01 02"));
        assert!(lines[0].ends_with("0f"));
        assert!(lines[1].starts_with("000000010: 10 11 12 13"));
    }

    #[test]
    fn hex_dump_of_empty_buffer_is_empty() {
        assert!(hex_dump(&[]).is_empty());
    }

    #[test]
    fn to_hex_lowercase_pairs() {
        assert_eq!(to_hex(&[0x00, 0xAB, 0xFF]), "00abff");
    }
}
