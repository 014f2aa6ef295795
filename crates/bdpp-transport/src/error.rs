/// Errors that can occur in transport-device operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The device could not be attached to the requested UART port.
    #[error("failed to attach to UART port {port}: {reason}")]
    Attach { port: u8, reason: String },

    /// An operation needed an attached port, but none is attached.
    #[error("transport is not attached to a UART port")]
    NotAttached,

    /// The device has been stopped.
    #[error("transport stopped")]
    Stopped,

    /// The DMA engine refused a frame.
    #[error("transmit rejected ({len} bytes): {reason}")]
    Transmit { len: usize, reason: String },

    /// An I/O error occurred on a hosted byte stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
