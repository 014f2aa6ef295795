//! Transport-device contract for the BDPP serial DMA link.
//!
//! The packet core never touches UART or DMA registers directly. It talks to
//! a [`TransportDevice`], which owns hardware bring-up, the DMA engine and the
//! single interrupt source whose mask doubles as the core's critical section.
//!
//! [`SimulatedUart`] is a hosted implementation used by tests and the host CLI.

pub mod error;
pub mod sim;
pub mod traits;

pub use error::{Result, TransportError};
pub use sim::SimulatedUart;
pub use traits::{FlowControl, InterruptMask, Parity, TransportDevice, UartConfig, DEFAULT_PORT};
