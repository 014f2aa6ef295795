use bdpp_driver::{Bdpp, DriverConfig, QueueStats};
use bdpp_packet::{packetize, ContentKind, MessageAssembler, Ownership};
use bdpp_transport::SimulatedUart;
use bytes::BytesMut;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cmd::LoopbackArgs;
use crate::exit::{driver_error, packet_error, CliError, CliResult, FAILURE, SUCCESS, USAGE};
use crate::output::{print_json, print_stats, OutputFormat};

#[derive(Debug, Serialize)]
struct LoopbackReport {
    streams: u8,
    messages_sent: usize,
    messages_received: usize,
    mismatched: usize,
    packets: usize,
    wire_bytes: usize,
    discarded: u64,
    stats: QueueStats,
}

pub fn run(args: LoopbackArgs, format: OutputFormat) -> CliResult<i32> {
    let report = run_loopback(&args)?;

    match format {
        OutputFormat::Json | OutputFormat::Raw => print_json(&report),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!(
                "streams={} sent={} received={} mismatched={} packets={} wire_bytes={} discarded={}",
                report.streams,
                report.messages_sent,
                report.messages_received,
                report.mismatched,
                report.packets,
                report.wire_bytes,
                report.discarded
            );
            print_stats(&report.stats, format);
        }
    }

    if report.mismatched > 0 || report.messages_received != report.messages_sent {
        return Ok(FAILURE);
    }
    Ok(SUCCESS)
}

fn run_loopback(args: &LoopbackArgs) -> CliResult<LoopbackReport> {
    if args.rx_pool == 0 {
        return Err(CliError::new(USAGE, "--rx-pool must be at least 1"));
    }
    let config = DriverConfig {
        rx_pool_size: args.rx_pool,
        ..DriverConfig::default()
    };
    let bdpp = Bdpp::with_config(SimulatedUart::new(), config);
    bdpp.initialize()
        .map_err(|err| driver_error("initialize failed", err))?;
    let mut isr = bdpp
        .interrupt_context()
        .map_err(|err| driver_error("interrupt context", err))?;

    let mut assembler = MessageAssembler::new();
    let mut report = LoopbackReport {
        streams: args.streams,
        messages_sent: 0,
        messages_received: 0,
        mismatched: 0,
        packets: 0,
        wire_bytes: 0,
        discarded: 0,
        stats: bdpp.stats(),
    };

    for round in 0..args.count {
        for stream in 0..args.streams {
            let payload = message_payload(stream, round, args.size);
            for packet in packetize(ContentKind::Command, stream, &payload, Ownership::App) {
                bdpp.queue_tx_packet(packet);
            }
            report.messages_sent += 1;
        }

        report.packets += isr
            .on_tx_drain()
            .map_err(|err| driver_error("transmit failed", err))?;

        let mut backlog = BytesMut::from(&bdpp.device().take_transmitted()[..]);
        report.wire_bytes += backlog.len();
        debug!(round, bytes = backlog.len(), "looping wire bytes back");
        while !backlog.is_empty() {
            let consumed = isr.on_rx_bytes(&backlog);
            let _ = backlog.split_to(consumed);
            deliver(&bdpp, &mut assembler, args, round, &mut report)?;
        }
    }

    report.discarded = isr.wire_stats().discarded;
    report.stats = bdpp.stats();
    debug!(armed = isr.armed_count(), "rx buffers left armed");
    info!(
        sent = report.messages_sent,
        received = report.messages_received,
        packets = report.packets,
        "loopback finished"
    );
    Ok(report)
}

/// Pull every delivered packet off the RX queues, reassemble and check.
fn deliver(
    bdpp: &Bdpp<SimulatedUart>,
    assembler: &mut MessageAssembler,
    args: &LoopbackArgs,
    round: usize,
    report: &mut LoopbackReport,
) -> CliResult<()> {
    for stream in 0..args.streams {
        while let Some(packet) = bdpp.get_rx_packet(stream) {
            let message = assembler.push(&packet);
            bdpp.recycle_rx_packet(packet);
            let Some(message) = message.map_err(|err| packet_error("reassembly failed", err))?
            else {
                continue;
            };
            report.messages_received += 1;
            if message.payload != message_payload(stream, round, args.size) {
                warn!(stream, round, "payload mismatch");
                report.mismatched += 1;
            }
        }
    }
    Ok(())
}

fn message_payload(stream: u8, round: usize, size: usize) -> Vec<u8> {
    let seed = format!("stream {stream} round {round};");
    seed.bytes().cycle().take(size).collect()
}
