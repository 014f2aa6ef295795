use std::io::{IsTerminal, Write};

use bdpp_driver::QueueStats;
use bdpp_packet::Packet;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use crate::exit::{CliError, CliResult, USAGE};

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
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct PacketOutput {
    stream: u8,
    packet: u8,
    flags: String,
    content: &'static str,
    position: &'static str,
    size: usize,
    payload: String,
}

impl PacketOutput {
    fn from_packet(packet: &Packet) -> Self {
        let flags = packet.flags();
        Self {
            stream: packet.stream_index(),
            packet: packet.packet_index(),
            flags: flags.to_string(),
            content: flags.content().name(),
            position: flags.position().name(),
            size: packet.len(),
            payload: payload_preview(packet.data()),
        }
    }
}

pub fn print_packets(packets: &[Packet], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for packet in packets {
                print_json(&PacketOutput::from_packet(packet));
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["STREAM", "PACKET", "FLAGS", "SIZE", "PAYLOAD"]);
            for packet in packets {
                let out = PacketOutput::from_packet(packet);
                table.add_row(vec![
                    out.stream.to_string(),
                    out.packet.to_string(),
                    out.flags,
                    out.size.to_string(),
                    out.payload,
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for packet in packets {
                let out = PacketOutput::from_packet(packet);
                println!(
                    "stream={} packet={} flags={} size={} payload={}",
                    out.stream, out.packet, out.flags, out.size, out.payload
                );
            }
        }
        OutputFormat::Raw => {
            for packet in packets {
                print_raw(packet.data());
            }
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    flags: String,
    stream: u8,
    packet: u8,
    payload_size: usize,
    frame_size: usize,
    frame: &'a str,
}

/// Print one encoded frame. Raw writes the frame bytes unchanged.
pub fn print_frame(packet: &Packet, frame: &[u8], format: OutputFormat) {
    let hex = to_hex(frame);
    let out = FrameOutput {
        flags: packet.flags().to_string(),
        stream: packet.stream_index(),
        packet: packet.packet_index(),
        payload_size: packet.len(),
        frame_size: frame.len(),
        frame: &hex,
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FLAGS", "STREAM", "PACKET", "SIZE", "FRAME"])
                .add_row(vec![
                    out.flags,
                    out.stream.to_string(),
                    out.packet.to_string(),
                    out.frame_size.to_string(),
                    hex.clone(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{hex}"),
        OutputFormat::Raw => print_raw(frame),
    }
}

pub fn print_stats(stats: &QueueStats, format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => print_json(stats),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["QUEUE", "DEPTH"]);
            table.add_row(vec!["tx".to_string(), stats.tx_pending.to_string()]);
            for (stream, depth) in stats.rx_pending.iter().enumerate() {
                if *depth > 0 {
                    table.add_row(vec![format!("rx[{stream}]"), depth.to_string()]);
                }
            }
            table.add_row(vec!["free".to_string(), stats.free.to_string()]);
            table.add_row(vec!["sent".to_string(), stats.sent.to_string()]);
            table.add_row(vec!["driver idle".to_string(), stats.driver_idle.to_string()]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "tx={} rx={} free={} sent={} driver_idle={} rx_pool={}",
                stats.tx_pending,
                stats.rx_pending.iter().sum::<usize>(),
                stats.free,
                stats.sent,
                stats.driver_idle,
                stats.rx_pool_size
            );
        }
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn to_hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02x}")).collect()
}

/// Parse hex digits, ignoring whitespace and `:` separators.
pub fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let digits: Vec<u8> = input
        .bytes()
        .filter(|b| !b.is_ascii_whitespace() && *b != b':')
        .collect();
    if digits.len() % 2 != 0 {
        return Err(CliError::new(USAGE, "hex input has an odd number of digits"));
    }
    digits
        .chunks(2)
        .map(|pair| {
            let text = std::str::from_utf8(pair).unwrap_or("??");
            u8::from_str_radix(text, 16)
                .map_err(|_| CliError::new(USAGE, format!("invalid hex byte: {text}")))
        })
        .collect()
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip_accepts_separators() {
        let bytes = parse_hex("c0 01:0a 00 c0").unwrap();
        assert_eq!(bytes, vec![0xC0, 0x01, 0x0A, 0x00, 0xC0]);
        assert_eq!(to_hex(&bytes), "c0010a00c0");
    }

    #[test]
    fn hex_rejects_bad_input() {
        assert_eq!(parse_hex("abc").unwrap_err().code, USAGE);
        assert_eq!(parse_hex("zz").unwrap_err().code, USAGE);
    }

    #[test]
    fn binary_payloads_are_summarized() {
        assert_eq!(payload_preview(b"hi"), "hi");
        assert_eq!(payload_preview(&[0xFF, 0xFE]), "<binary 2 bytes>");
    }
}
