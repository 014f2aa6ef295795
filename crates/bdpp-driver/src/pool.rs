use std::collections::VecDeque;

use bdpp_packet::{flags::READY, Ownership, Packet, HEADER_SIZE, MAX_APP_PACKETS};
use tracing::{debug, trace, warn};

use crate::config::DriverConfig;
use crate::error::{DriverError, Result};

/// Owns every pre-allocated packet buffer.
///
/// - The RX free queue: app-owned buffers waiting to be armed. The number of
///   these in circulation never changes after [`fill`](Self::fill).
/// - The driver slots: small driver-owned packets, recycled by slot index.
/// - The sent queue: app-owned TX packets the transport finished with,
///   waiting for their owner to collect them. Only used when
///   `retain_sent` is configured, and bounded at [`MAX_APP_PACKETS`].
#[derive(Debug, Default)]
pub struct PacketPool {
    free: VecDeque<Packet>,
    driver_slots: Vec<Option<Packet>>,
    sent: VecDeque<Packet>,
    rx_pool_size: usize,
    /// Most sent packets kept for collection; zero keeps none.
    sent_limit: usize,
    /// RX buffers handed out by `take_free` and not yet recycled.
    outstanding: usize,
}

impl PacketPool {
    /// Allocate every pool buffer up front. Any shortfall fails the whole
    /// fill; the transport cannot run on a partial pool.
    pub fn fill(config: &DriverConfig) -> Result<Self> {
        let rx_bytes = config.rx_pool_size * (HEADER_SIZE + Ownership::App.capacity());
        let driver_bytes =
            config.driver_pool_size * (HEADER_SIZE + Ownership::Driver.capacity());
        let requested = rx_bytes + driver_bytes;
        if let Some(available) = config.dma_heap_limit {
            if requested > available {
                return Err(DriverError::AllocationFailure {
                    requested,
                    available,
                });
            }
        }

        let mut free = VecDeque::new();
        free.try_reserve_exact(config.rx_pool_size)
            .map_err(|_| DriverError::AllocationFailure {
                requested,
                available: 0,
            })?;
        for _ in 0..config.rx_pool_size {
            free.push_back(Packet::try_create_rx()?);
        }

        let mut driver_slots = Vec::with_capacity(config.driver_pool_size);
        for slot in 0..config.driver_pool_size {
            driver_slots.push(Some(Packet::try_create_driver_tx(0, slot as u8, 0)?));
        }

        debug!(
            rx = config.rx_pool_size,
            driver = config.driver_pool_size,
            bytes = requested,
            "packet pool filled"
        );
        Ok(Self {
            free,
            driver_slots,
            sent: VecDeque::new(),
            rx_pool_size: config.rx_pool_size,
            sent_limit: if config.retain_sent { MAX_APP_PACKETS } else { 0 },
            outstanding: 0,
        })
    }

    /// App-owned RX buffers in circulation, fixed at fill time.
    pub fn rx_pool_size(&self) -> usize {
        self.rx_pool_size
    }

    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    /// Take a free RX buffer for arming.
    pub fn take_free(&mut self) -> Option<Packet> {
        let packet = self.free.pop_front()?;
        self.outstanding += 1;
        Some(packet)
    }

    /// RX buffers currently out of the free queue: armed, queued for
    /// delivery or held by the application.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Reset a consumed RX packet and put it back in the free queue.
    ///
    /// Driver-owned packets go back to their slot instead. TX packets never
    /// belonged to the RX pool and are dropped, as is any RX buffer the pool
    /// did not hand out.
    pub fn recycle(&mut self, mut packet: Packet) {
        match packet.ownership() {
            Ownership::Driver => self.return_driver(packet),
            Ownership::App if packet.flags().is_for_rx() => {
                if self.outstanding == 0 {
                    warn!(
                        free = self.free.len(),
                        rx_pool_size = self.rx_pool_size,
                        "recycle of an RX buffer the pool did not hand out; releasing it"
                    );
                    return;
                }
                self.outstanding -= 1;
                packet.reset_for_rx();
                self.free.push_back(packet);
            }
            Ownership::App => {
                warn!(
                    stream = packet.stream_index(),
                    "recycle called on a TX packet; releasing it"
                );
            }
        }
    }

    /// Number of driver slots currently holding an idle packet.
    pub fn driver_idle(&self) -> usize {
        self.driver_slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Check out the first idle driver packet, re-targeted to `usage_flags`
    /// and `stream_index`.
    pub fn checkout_driver(&mut self, usage_flags: u8, stream_index: u8) -> Option<Packet> {
        let mut packet = self.driver_slots.iter_mut().find_map(Option::take)?;
        packet.reassign(usage_flags, stream_index);
        Some(packet)
    }

    /// Put a driver packet back in the slot named by its packet index.
    pub fn return_driver(&mut self, mut packet: Packet) {
        let slot = usize::from(packet.packet_index());
        match self.driver_slots.get_mut(slot) {
            Some(entry) if entry.is_none() => {
                packet.reassign(0, 0);
                *entry = Some(packet);
            }
            _ => warn!(slot, "driver packet does not match a free slot; releasing it"),
        }
    }

    /// Park an app-owned TX packet after transmission, or release it when
    /// retention is off. A full sent queue releases its oldest packet.
    pub fn park_sent(&mut self, packet: Packet) {
        debug_assert!(packet.is_flag_clear(READY));
        if self.sent_limit == 0 {
            trace!(stream = packet.stream_index(), "sent packet released");
            return;
        }
        if self.sent.len() >= self.sent_limit {
            self.sent.pop_front();
            warn!(
                limit = self.sent_limit,
                "sent queue full; oldest uncollected packet released"
            );
        }
        self.sent.push_back(packet);
    }

    pub fn take_sent(&mut self) -> Option<Packet> {
        self.sent.pop_front()
    }

    pub fn sent_len(&self) -> usize {
        self.sent.len()
    }
}
