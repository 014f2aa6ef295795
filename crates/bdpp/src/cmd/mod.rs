use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use bdpp_packet::{ContentKind, MessagePosition};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod loopback;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build one packet and print its wire frame.
    Encode(EncodeArgs),
    /// Decode wire frames and print the packets they carry.
    Decode(DecodeArgs),
    /// Run the driver against a simulated UART wired back to itself.
    Loopback(LoopbackArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Loopback(args) => loopback::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum KindArg {
    Print,
    Command,
    Response,
}

impl From<KindArg> for ContentKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Print => ContentKind::Print,
            KindArg::Command => ContentKind::Command,
            KindArg::Response => ContentKind::Response,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum PositionArg {
    First,
    Middle,
    Last,
    Only,
}

impl From<PositionArg> for MessagePosition {
    fn from(position: PositionArg) -> Self {
        match position {
            PositionArg::First => MessagePosition::First,
            PositionArg::Middle => MessagePosition::Middle,
            PositionArg::Last => MessagePosition::Last,
            PositionArg::Only => MessagePosition::Only,
        }
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Stream index (0-15).
    #[arg(long, short = 's', default_value = "0", value_parser = clap::value_parser!(u8).range(0..16))]
    pub stream: u8,
    /// Packet index (0-15).
    #[arg(long, default_value = "0", value_parser = clap::value_parser!(u8).range(0..16))]
    pub slot: u8,
    /// Content classification.
    #[arg(long, value_enum, default_value = "command")]
    pub kind: KindArg,
    /// Position within a message.
    #[arg(long, value_enum, default_value = "only")]
    pub position: PositionArg,
    /// Build a small driver-owned packet instead of an app-owned one.
    #[arg(long)]
    pub driver: bool,
    /// Raw string payload.
    #[arg(long, conflicts_with = "hex")]
    pub data: Option<String>,
    /// Hex payload.
    #[arg(long, conflicts_with = "data")]
    pub hex: Option<String>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Wire bytes as hex.
    #[arg(conflicts_with = "file", required_unless_present = "file")]
    pub hex: Option<String>,
    /// Read raw wire bytes from a file.
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct LoopbackArgs {
    /// Number of streams to exercise (1-16).
    #[arg(long, default_value = "4", value_parser = clap::value_parser!(u8).range(1..=16))]
    pub streams: u8,
    /// Messages per stream.
    #[arg(long, short = 'n', default_value = "4")]
    pub count: usize,
    /// Payload size of each message in bytes.
    #[arg(long, default_value = "64")]
    pub size: usize,
    /// RX buffers in the pool.
    #[arg(long, default_value = "16")]
    pub rx_pool: usize,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
