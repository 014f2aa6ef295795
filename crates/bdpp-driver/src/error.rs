use bdpp_packet::PacketError;
use bdpp_transport::TransportError;

/// Errors that can occur in driver operations.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// DMA-capable memory ran out while filling the packet pool.
    #[error("DMA buffer pool allocation failed ({requested} bytes requested, {available} available)")]
    AllocationFailure { requested: usize, available: usize },

    /// Packet-level error.
    #[error("packet error: {0}")]
    Packet(#[from] PacketError),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// `initialize` was called twice.
    #[error("driver already initialized")]
    AlreadyInitialized,

    /// The configuration cannot be honored.
    #[error("invalid driver configuration: {0}")]
    InvalidConfig(String),

    /// The single interrupt-side handle has already been handed out.
    #[error("interrupt context already taken")]
    InterruptContextTaken,
}

pub type Result<T> = std::result::Result<T, DriverError>;
