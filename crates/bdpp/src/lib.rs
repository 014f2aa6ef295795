//! Bidirectional Packet Protocol (BDPP) over a serial DMA link.
//!
//! BDPP carries packets between a host processor and a video co-processor.
//! Each packet belongs to one of 16 logical streams; the host sees one FIFO
//! per stream on the receive side and one global FIFO on the transmit side.
//!
//! # Crate Structure
//!
//! - [`transport`]: the transport-device contract and a hosted simulated UART
//! - [`packet`]: packets, the flag table and the wire framing
//! - [`driver`]: packet pool, queue set, interrupt bridge and the public API

/// Re-export transport types.
pub mod transport {
    pub use bdpp_transport::*;
}

/// Re-export packet types.
pub mod packet {
    pub use bdpp_packet::*;
}

/// Re-export driver types.
pub mod driver {
    pub use bdpp_driver::*;
}
