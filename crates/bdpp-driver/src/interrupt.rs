use std::collections::VecDeque;
use std::sync::Arc;

use bdpp_packet::flags::{DONE, READY};
use bdpp_packet::wire::encode_packet;
use bdpp_packet::{Ownership, Packet, WireDecoder, WireEvent, WireStats};
use bdpp_transport::TransportDevice;
use bytes::BytesMut;
use tracing::{trace, warn};

use crate::driver::Shared;
use crate::error::Result;

const TX_BUFFER_CAPACITY: usize = 8 * 1024;

/// The transport's side of the queue set.
///
/// Runs in interrupt context on hardware; in a hosted build it is driven
/// from its own thread. It owns the receive framer and the buffers currently
/// armed for reception, so none of that state is shared.
pub struct InterruptContext<D: TransportDevice> {
    shared: Arc<Shared<D>>,
    decoder: WireDecoder,
    armed: VecDeque<Packet>,
    tx_buf: BytesMut,
}

impl<D: TransportDevice> InterruptContext<D> {
    pub(crate) fn new(shared: Arc<Shared<D>>) -> Self {
        Self {
            shared,
            decoder: WireDecoder::new(),
            armed: VecDeque::new(),
            tx_buf: BytesMut::with_capacity(TX_BUFFER_CAPACITY),
        }
    }

    /// Top up armed RX buffers from the free queue. Returns how many are armed.
    pub fn arm_rx(&mut self) -> usize {
        let want = self.shared.config.max_armed_rx;
        if self.armed.len() < want {
            let mut queues = self.shared.lock_from_isr();
            while self.armed.len() < want {
                let Some(packet) = queues.pool_mut().take_free() else {
                    break;
                };
                self.armed.push_back(packet);
            }
        }
        self.armed.len()
    }

    /// RX buffers currently armed.
    pub fn armed_count(&self) -> usize {
        self.armed.len()
    }

    pub fn wire_stats(&self) -> WireStats {
        self.decoder.stats()
    }

    /// Feed bytes that arrived on the link.
    ///
    /// Returns how many bytes were consumed. With no buffer left to arm,
    /// consumption stops and the rest stays with the caller, the way the
    /// hardware holds RTS until a buffer frees up.
    pub fn on_rx_bytes(&mut self, bytes: &[u8]) -> usize {
        for (consumed, &byte) in bytes.iter().enumerate() {
            if self.armed.is_empty() && self.arm_rx() == 0 {
                trace!(consumed, "no rx buffer armed; holding input");
                return consumed;
            }
            let Some(target) = self.armed.front_mut() else {
                return consumed;
            };
            match self.decoder.push(byte, target) {
                WireEvent::Pending => {}
                WireEvent::Complete => {
                    if let Some(packet) = self.armed.pop_front() {
                        self.on_rx_complete(packet);
                    }
                    self.arm_rx();
                }
                WireEvent::Discarded(err) => {
                    warn!(error = %err, "protocol violation; frame discarded");
                }
            }
        }
        bytes.len()
    }

    /// Deliver a fully received packet to its stream's RX queue.
    pub fn on_rx_complete(&self, mut packet: Packet) {
        packet.set_flags(READY | DONE);
        trace!(
            stream = packet.stream_index(),
            len = packet.len(),
            "rx packet complete"
        );
        self.shared.lock_from_isr().push_rx(packet);
    }

    /// Drain the TX queue into the DMA engine.
    ///
    /// Each packet is marked DONE once the engine has it. Driver-owned packets
    /// go back to their pool slot; app-owned packets wait in the sent queue
    /// for their owner. Returns the number of packets drained. A transmit
    /// failure stops the drain after completing the failed packet; the packet
    /// is not retried.
    pub fn on_tx_drain(&mut self) -> Result<usize> {
        let mut drained = 0usize;
        loop {
            let Some(mut packet) = self.shared.lock_from_isr().pop_tx() else {
                break;
            };

            self.tx_buf.clear();
            encode_packet(&packet, &mut self.tx_buf);
            let sent = self.shared.device.transmit(&self.tx_buf);

            packet.clear_flags(READY);
            packet.set_flags(DONE);
            drained += 1;
            trace!(
                stream = packet.stream_index(),
                len = packet.len(),
                "tx packet done"
            );
            self.complete_tx(packet);

            if let Err(err) = sent {
                warn!(error = %err, "transmit failed; packet dropped from the wire");
                return Err(err.into());
            }
        }
        Ok(drained)
    }

    fn complete_tx(&self, packet: Packet) {
        let mut queues = self.shared.lock_from_isr();
        match packet.ownership() {
            Ownership::Driver => queues.pool_mut().return_driver(packet),
            Ownership::App => queues.pool_mut().park_sent(packet),
        }
    }
}
