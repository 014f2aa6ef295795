use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::{Bytes, BytesMut};
use tracing::{debug, trace};

use crate::error::{Result, TransportError};
use crate::traits::{InterruptMask, TransportDevice, UartConfig};

/// Hosted stand-in for the UART/DMA engine.
///
/// Keeps a real interrupt-mask register so critical sections can be observed,
/// and collects every transmitted frame into a byte buffer instead of
/// shifting it out of a pin.
#[derive(Debug, Default)]
pub struct SimulatedUart {
    mask: AtomicU32,
    masked_sections: AtomicUsize,
    state: Mutex<SimState>,
}

#[derive(Debug, Default)]
struct SimState {
    attached: Option<(u8, UartConfig)>,
    running: bool,
    receiving: bool,
    tx: BytesMut,
    frames_sent: usize,
}

impl SimulatedUart {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current interrupt-enable mask.
    pub fn mask(&self) -> InterruptMask {
        InterruptMask::from_bits(self.mask.load(Ordering::SeqCst))
    }

    /// How many times the interrupt source has been masked.
    pub fn masked_sections(&self) -> usize {
        self.masked_sections.load(Ordering::SeqCst)
    }

    /// Port and line settings from the last successful `attach`.
    pub fn attached(&self) -> Option<(u8, UartConfig)> {
        self.state().attached.clone()
    }

    pub fn is_running(&self) -> bool {
        self.state().running
    }

    pub fn is_receiving(&self) -> bool {
        self.state().receiving
    }

    /// Number of frames handed to `transmit` so far.
    pub fn frames_sent(&self) -> usize {
        self.state().frames_sent
    }

    /// Drain every byte transmitted since the previous call.
    pub fn take_transmitted(&self) -> Bytes {
        self.state().tx.split().freeze()
    }
}

impl TransportDevice for SimulatedUart {
    fn start(&self) -> Result<()> {
        self.state().running = true;
        debug!("simulated uart started");
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        let mut state = self.state();
        state.running = false;
        state.receiving = false;
        debug!("simulated uart stopped");
        Ok(())
    }

    fn attach(&self, port: u8, config: &UartConfig) -> Result<()> {
        if config.data_bits < 5 || config.data_bits > 8 {
            return Err(TransportError::Attach {
                port,
                reason: format!("unsupported data bits: {}", config.data_bits),
            });
        }
        let mut state = self.state();
        state.attached = Some((port, config.clone()));
        state.running = true;
        debug!(port, baud = config.baud_rate, "simulated uart attached");
        Ok(())
    }

    fn begin_dma_receive(&self) -> Result<()> {
        let mut state = self.state();
        if state.attached.is_none() {
            return Err(TransportError::NotAttached);
        }
        state.receiving = true;
        self.mask
            .fetch_or(InterruptMask::RX_EOF.bits(), Ordering::SeqCst);
        Ok(())
    }

    fn disable_interrupt_source(&self) -> InterruptMask {
        self.masked_sections.fetch_add(1, Ordering::SeqCst);
        InterruptMask::from_bits(self.mask.swap(0, Ordering::SeqCst))
    }

    fn enable_interrupt_source(&self, mask: InterruptMask) {
        self.mask.store(mask.bits(), Ordering::SeqCst);
    }

    fn transmit(&self, frame: &[u8]) -> Result<()> {
        let mut state = self.state();
        if state.attached.is_none() {
            return Err(TransportError::NotAttached);
        }
        if !state.running {
            return Err(TransportError::Stopped);
        }
        state.tx.extend_from_slice(frame);
        state.frames_sent += 1;
        trace!(len = frame.len(), "simulated uart transmit");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disable_returns_previous_mask_and_clears() {
        let uart = SimulatedUart::new();
        uart.enable_interrupt_source(InterruptMask::RX_EOF | InterruptMask::TX_EOF);

        let saved = uart.disable_interrupt_source();
        assert_eq!(saved, InterruptMask::RX_EOF | InterruptMask::TX_EOF);
        assert!(uart.mask().is_empty());

        uart.enable_interrupt_source(saved);
        assert_eq!(uart.mask(), saved);
        assert_eq!(uart.masked_sections(), 1);
    }

    #[test]
    fn transmit_requires_attach() {
        let uart = SimulatedUart::new();
        let err = uart.transmit(b"\xC0\xC0").unwrap_err();
        assert!(matches!(err, TransportError::NotAttached));

        uart.attach(2, &UartConfig::default()).unwrap();
        uart.transmit(b"\xC0abc\xC0").unwrap();
        assert_eq!(uart.frames_sent(), 1);
        assert_eq!(uart.take_transmitted().as_ref(), b"\xC0abc\xC0");
        assert!(uart.take_transmitted().is_empty());
    }

    #[test]
    fn transmit_after_stop_fails() {
        let uart = SimulatedUart::new();
        uart.attach(2, &UartConfig::default()).unwrap();
        uart.stop().unwrap();
        assert!(matches!(uart.transmit(b"x"), Err(TransportError::Stopped)));
    }

    #[test]
    fn begin_receive_enables_rx_interrupt() {
        let uart = SimulatedUart::new();
        assert!(matches!(
            uart.begin_dma_receive(),
            Err(TransportError::NotAttached)
        ));

        uart.attach(2, &UartConfig::default()).unwrap();
        uart.begin_dma_receive().unwrap();
        assert!(uart.is_receiving());
        assert!(uart.mask().contains(InterruptMask::RX_EOF));
    }

    #[test]
    fn attach_rejects_bad_line_settings() {
        let uart = SimulatedUart::new();
        let cfg = UartConfig {
            data_bits: 9,
            ..UartConfig::default()
        };
        let err = uart.attach(2, &cfg).unwrap_err();
        assert!(matches!(err, TransportError::Attach { port: 2, .. }));
        assert!(uart.attached().is_none());
    }
}
