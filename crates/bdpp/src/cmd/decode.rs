use std::fs;

use bdpp_packet::{Packet, PacketError, PacketReader};
use tracing::{info, warn};

use crate::cmd::DecodeArgs;
use crate::exit::{io_error, packet_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{parse_hex, print_packets, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let wire = resolve_input(&args)?;
    let (packets, discarded) = decode_all(&wire)?;

    info!(packets = packets.len(), discarded, "decode finished");
    if packets.is_empty() && discarded > 0 {
        return Err(CliError::new(
            DATA_INVALID,
            format!("no valid frames ({discarded} discarded)"),
        ));
    }

    print_packets(&packets, format);
    Ok(SUCCESS)
}

fn resolve_input(args: &DecodeArgs) -> CliResult<Vec<u8>> {
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    parse_hex(args.hex.as_deref().unwrap_or_default())
}

/// Decode every complete frame in `wire`. Returns the packets and the number
/// of frames dropped as malformed.
fn decode_all(wire: &[u8]) -> CliResult<(Vec<Packet>, u64)> {
    let mut reader = PacketReader::new(wire);
    let mut packets = Vec::new();
    loop {
        match reader.read_packet() {
            Ok(packet) => packets.push(packet),
            Err(PacketError::ConnectionClosed) => break,
            Err(err) => return Err(packet_error("decode failed", err)),
        }
    }

    let stats = reader.stats();
    if stats.discarded > 0 {
        warn!(discarded = stats.discarded, "malformed frames skipped");
    }
    Ok((packets, stats.discarded))
}
