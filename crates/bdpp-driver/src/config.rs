use bdpp_packet::{MAX_APP_PACKETS, MAX_DRIVER_PACKETS, MAX_RX_PACKETS};
use bdpp_transport::{UartConfig, DEFAULT_PORT};

use crate::error::{DriverError, Result};

/// Controls pool sizes and link bring-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    /// App-owned RX buffers placed in the free pool at initialization.
    pub rx_pool_size: usize,
    /// Driver-owned small packets, one per slot index.
    pub driver_pool_size: usize,
    /// RX buffers the interrupt side keeps armed at once.
    pub max_armed_rx: usize,
    /// UART port the DMA engine is attached to.
    pub port: u8,
    pub uart: UartConfig,
    /// Bytes of DMA-capable memory available for packet buffers.
    /// `None` means limited only by the allocator.
    pub dma_heap_limit: Option<usize>,
    /// Keep app-owned TX packets after transmission so the sender can
    /// collect them with `take_sent_packet`. When off they are released as
    /// soon as the transport is done with them.
    pub retain_sent: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            rx_pool_size: MAX_APP_PACKETS,
            driver_pool_size: MAX_DRIVER_PACKETS,
            max_armed_rx: MAX_RX_PACKETS,
            port: DEFAULT_PORT,
            uart: UartConfig::default(),
            dma_heap_limit: None,
            retain_sent: false,
        }
    }
}

impl DriverConfig {
    pub fn validate(&self) -> Result<()> {
        if self.rx_pool_size == 0 {
            return Err(DriverError::InvalidConfig(
                "rx_pool_size must be at least 1".to_string(),
            ));
        }
        if self.driver_pool_size > MAX_DRIVER_PACKETS {
            return Err(DriverError::InvalidConfig(format!(
                "driver_pool_size {} exceeds {MAX_DRIVER_PACKETS} slot indexes",
                self.driver_pool_size
            )));
        }
        if self.max_armed_rx == 0 {
            return Err(DriverError::InvalidConfig(
                "max_armed_rx must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
