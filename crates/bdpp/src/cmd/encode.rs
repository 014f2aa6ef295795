use bdpp_packet::wire::encode_packet;
use bdpp_packet::{Ownership, Packet, PacketFlags};
use bytes::BytesMut;
use tracing::debug;

use crate::cmd::EncodeArgs;
use crate::exit::{CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{parse_hex, print_frame, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = resolve_payload(&args)?;
    let packet = build_packet(&args, &payload)?;

    let mut frame = BytesMut::new();
    encode_packet(&packet, &mut frame);
    debug!(
        payload = payload.len(),
        frame = frame.len(),
        "packet encoded"
    );

    print_frame(&packet, &frame, format);
    Ok(SUCCESS)
}

fn resolve_payload(args: &EncodeArgs) -> CliResult<Vec<u8>> {
    if let Some(hex) = &args.hex {
        return parse_hex(hex);
    }
    Ok(args
        .data
        .as_ref()
        .map(|data| data.as_bytes().to_vec())
        .unwrap_or_default())
}

fn build_packet(args: &EncodeArgs, payload: &[u8]) -> CliResult<Packet> {
    let usage = PacketFlags::usage(args.kind.into(), args.position.into());
    let mut packet = if args.driver {
        Packet::create_driver_tx(usage, args.slot, args.stream)
    } else {
        Packet::create_app_tx(usage, args.slot, args.stream)
    };

    if payload.len() > packet.capacity() {
        let class = match packet.ownership() {
            Ownership::Driver => "driver",
            Ownership::App => "app",
        };
        return Err(CliError::new(
            DATA_INVALID,
            format!(
                "payload of {} bytes does not fit a {class} packet ({} bytes)",
                payload.len(),
                packet.capacity()
            ),
        ));
    }
    packet.append(payload);
    Ok(packet)
}

#[cfg(test)]
mod tests {
    use bdpp_packet::flags::{APP_OWNED, COMMAND, FIRST, LAST};

    use super::*;
    use crate::cmd::{KindArg, PositionArg};

    fn args(driver: bool) -> EncodeArgs {
        EncodeArgs {
            stream: 3,
            slot: 1,
            kind: KindArg::Command,
            position: PositionArg::Only,
            driver,
            data: None,
            hex: Some("010203".to_string()),
        }
    }

    #[test]
    fn builds_header_from_arguments() {
        let args = args(false);
        let payload = resolve_payload(&args).unwrap();
        let packet = build_packet(&args, &payload).unwrap();

        assert_eq!(packet.flags().bits(), COMMAND | FIRST | LAST | APP_OWNED);
        assert_eq!(packet.stream_index(), 3);
        assert_eq!(packet.packet_index(), 1);
        assert_eq!(packet.data(), &[1, 2, 3]);
    }

    #[test]
    fn oversized_driver_payload_is_rejected() {
        let args = args(true);
        let err = build_packet(&args, &[0u8; 33]).unwrap_err();
        assert_eq!(err.code, DATA_INVALID);
        assert!(err.message.contains("driver packet"));
    }
}
