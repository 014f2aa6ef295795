use std::ops::{BitOr, BitOrAssign};

use crate::error::Result;

/// UART port the link is wired to.
pub const DEFAULT_PORT: u8 = 2;

/// Interrupt-enable bits of the transport's single interrupt source.
///
/// Saving and restoring this mask is the critical-section primitive shared
/// by foreground code and the interrupt handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct InterruptMask(u32);

impl InterruptMask {
    /// No interrupt enabled.
    pub const NONE: Self = Self(0);
    /// A frame was received completely (separator seen).
    pub const RX_EOF: Self = Self(0x0000_0008);
    /// The outbound DMA chain finished; also serves as the "work pending" bit.
    pub const TX_EOF: Self = Self(0x0000_0040);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for InterruptMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for InterruptMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    Disabled,
    Even,
    Odd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
    Disabled,
    RtsCts,
}

/// UART line settings applied when the DMA engine is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UartConfig {
    pub baud_rate: u32,
    pub data_bits: u8,
    pub parity: Parity,
    pub stop_bits: u8,
    pub flow_control: FlowControl,
    /// RX FIFO fill level at which RTS is deasserted.
    pub rx_flow_ctrl_thresh: u8,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            baud_rate: 1_152_000,
            data_bits: 8,
            parity: Parity::Disabled,
            stop_bits: 1,
            flow_control: FlowControl::RtsCts,
            rx_flow_ctrl_thresh: 120,
        }
    }
}

/// The DMA-capable serial device underneath the packet core.
///
/// Every method takes `&self`: on hardware these are register writes that are
/// legal from both foreground and interrupt context.
pub trait TransportDevice: Send + Sync {
    /// Enable the device and its interrupt line.
    fn start(&self) -> Result<()>;

    /// Stop any ongoing communication.
    fn stop(&self) -> Result<()>;

    /// Install the DMA engine on a UART port with the given line settings.
    fn attach(&self, port: u8, config: &UartConfig) -> Result<()>;

    /// Arm the inbound DMA chain.
    fn begin_dma_receive(&self) -> Result<()>;

    /// Mask the transport's interrupt source, returning the previous mask.
    fn disable_interrupt_source(&self) -> InterruptMask;

    /// Restore an interrupt mask (usually one returned by
    /// [`disable_interrupt_source`](Self::disable_interrupt_source)).
    fn enable_interrupt_source(&self, mask: InterruptMask);

    /// Hand one escaped frame to the outbound DMA engine.
    fn transmit(&self, frame: &[u8]) -> Result<()>;
}
