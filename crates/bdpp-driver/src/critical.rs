use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bdpp_transport::{InterruptMask, TransportDevice};

use crate::queues::QueueSet;

/// Foreground access to the queue set.
///
/// Entering masks the transport's own interrupt source (not every interrupt
/// in the system) and saves the previous mask; dropping restores it. In a
/// hosted build the interrupt side runs on another thread, so the guard also
/// holds the queue mutex for its whole lifetime.
///
/// Sections must not nest: the queue mutex is not reentrant.
pub struct CriticalSection<'a, D: TransportDevice> {
    device: &'a D,
    saved: InterruptMask,
    signal: InterruptMask,
    queues: MutexGuard<'a, QueueSet>,
}

impl<'a, D: TransportDevice> CriticalSection<'a, D> {
    pub fn enter(device: &'a D, queues: &'a Mutex<QueueSet>) -> Self {
        // Lock first so concurrent foreground sections save and restore the
        // mask in order.
        let queues = queues.lock().unwrap_or_else(PoisonError::into_inner);
        let saved = device.disable_interrupt_source();
        Self {
            device,
            saved,
            signal: InterruptMask::NONE,
            queues,
        }
    }

    /// Assert the "TX work pending" enable bit when the section ends.
    pub fn signal_tx_pending(&mut self) {
        self.signal |= InterruptMask::TX_EOF;
    }

    /// Mask that was active before the section was entered.
    pub fn saved_mask(&self) -> InterruptMask {
        self.saved
    }
}

impl<D: TransportDevice> Deref for CriticalSection<'_, D> {
    type Target = QueueSet;

    fn deref(&self) -> &QueueSet {
        &self.queues
    }
}

impl<D: TransportDevice> DerefMut for CriticalSection<'_, D> {
    fn deref_mut(&mut self) -> &mut QueueSet {
        &mut self.queues
    }
}

impl<D: TransportDevice> Drop for CriticalSection<'_, D> {
    fn drop(&mut self) {
        self.device
            .enable_interrupt_source(self.saved | self.signal);
    }
}
