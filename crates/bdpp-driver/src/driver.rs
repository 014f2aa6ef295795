use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bdpp_packet::flags::READY;
use bdpp_packet::Packet;
use bdpp_transport::TransportDevice;
use tracing::{debug, info, trace};

use crate::config::DriverConfig;
use crate::critical::CriticalSection;
use crate::error::{DriverError, Result};
use crate::interrupt::InterruptContext;
use crate::pool::PacketPool;
use crate::queues::{QueueSet, QueueStats};

/// State shared by the foreground handle and the interrupt context.
pub(crate) struct Shared<D> {
    pub(crate) device: D,
    pub(crate) queues: Mutex<QueueSet>,
    pub(crate) config: DriverConfig,
    initialized: AtomicBool,
    interrupt_taken: AtomicBool,
}

impl<D: TransportDevice> Shared<D> {
    /// Foreground entry into the queue set.
    pub(crate) fn critical_section(&self) -> CriticalSection<'_, D> {
        CriticalSection::enter(&self.device, &self.queues)
    }

    /// Interrupt-side entry: the source is already masked while its handler
    /// runs, so only the hosted mutex is taken.
    pub(crate) fn lock_from_isr(&self) -> MutexGuard<'_, QueueSet> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The BDPP driver context.
///
/// Owns the transport device, the TX queue, the per-stream RX queues and the
/// packet pool. Every operation is non-blocking: "nothing yet" comes back as
/// `false` or `None`.
pub struct Bdpp<D: TransportDevice> {
    shared: Arc<Shared<D>>,
}

impl<D: TransportDevice> Bdpp<D> {
    /// Create a driver with default configuration. Nothing is allocated and
    /// the device is untouched until [`initialize`](Self::initialize).
    pub fn new(device: D) -> Self {
        Self::with_config(device, DriverConfig::default())
    }

    pub fn with_config(device: D, config: DriverConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                device,
                queues: Mutex::new(QueueSet::default()),
                config,
                initialized: AtomicBool::new(false),
                interrupt_taken: AtomicBool::new(false),
            }),
        }
    }

    pub fn device(&self) -> &D {
        &self.shared.device
    }

    pub fn config(&self) -> &DriverConfig {
        &self.shared.config
    }

    pub fn is_initialized(&self) -> bool {
        self.shared.initialized.load(Ordering::Acquire)
    }

    /// Fill the packet pool, bring up the link, arm reception, then install
    /// the pool.
    ///
    /// Allocation failure aborts initialization and leaves the device
    /// untouched. A device failure drops the freshly filled pool, so a retry
    /// starts from an empty queue set. Until the pool is installed the
    /// interrupt side finds nothing to arm and holds incoming bytes.
    pub fn initialize(&self) -> Result<()> {
        if self.is_initialized() {
            return Err(DriverError::AlreadyInitialized);
        }
        let config = &self.shared.config;
        config.validate()?;
        debug!("initializing bdpp driver");

        let pool = PacketPool::fill(config)?;

        let device = &self.shared.device;
        device.stop()?;
        device.attach(config.port, &config.uart)?;
        device.start()?;
        device.begin_dma_receive()?;

        {
            let mut cs = self.shared.critical_section();
            *cs.pool_mut() = pool;
        }

        self.shared.initialized.store(true, Ordering::Release);
        info!(
            port = config.port,
            baud = config.uart.baud_rate,
            rx_pool = config.rx_pool_size,
            driver_pool = config.driver_pool_size,
            "bdpp driver initialized"
        );
        Ok(())
    }

    /// Queue a packet for transmission.
    ///
    /// The packet should already hold everything the sender wants in it.
    /// It is marked READY, appended to the global TX FIFO and the transport
    /// is told work is pending. There is no way to withdraw it afterwards.
    ///
    /// # Collecting
    ///
    /// Driver-owned packets go back to their slot once sent. App-owned
    /// packets are released once sent, unless [`DriverConfig::retain_sent`]
    /// is set; then they wait for [`take_sent_packet`](Self::take_sent_packet)
    /// and the oldest is released if more than 16 pile up.
    pub fn queue_tx_packet(&self, mut packet: Packet) {
        let mut cs = self.shared.critical_section();
        packet.set_flags(READY);
        trace!(
            stream = packet.stream_index(),
            len = packet.len(),
            "tx packet queued"
        );
        cs.push_tx(packet);
        cs.signal_tx_pending();
    }

    /// Whether a received packet is waiting on `stream_index`.
    pub fn rx_packet_available(&self, stream_index: u8) -> bool {
        let cs = self.shared.critical_section();
        cs.rx_len(stream_index) > 0
    }

    /// Pop the oldest received packet on `stream_index`, if any.
    ///
    /// Hand the packet back with [`recycle_rx_packet`](Self::recycle_rx_packet)
    /// once its payload has been consumed.
    pub fn get_rx_packet(&self, stream_index: u8) -> Option<Packet> {
        let mut cs = self.shared.critical_section();
        cs.pop_rx(stream_index)
    }

    /// Return a consumed RX packet to the free pool.
    pub fn recycle_rx_packet(&self, packet: Packet) {
        let mut cs = self.shared.critical_section();
        cs.pool_mut().recycle(packet);
    }

    /// Borrow an idle driver-owned small packet for control traffic.
    ///
    /// The transport returns it to its slot after sending; if it is not sent,
    /// give it back with [`release_driver_packet`](Self::release_driver_packet).
    pub fn take_driver_packet(&self, usage_flags: u8, stream_index: u8) -> Option<Packet> {
        let mut cs = self.shared.critical_section();
        cs.pool_mut().checkout_driver(usage_flags, stream_index)
    }

    pub fn release_driver_packet(&self, packet: Packet) {
        let mut cs = self.shared.critical_section();
        cs.pool_mut().return_driver(packet);
    }

    /// Collect an app-owned TX packet the transport has finished sending.
    /// Always `None` unless [`DriverConfig::retain_sent`] is set.
    pub fn take_sent_packet(&self) -> Option<Packet> {
        let mut cs = self.shared.critical_section();
        cs.pool_mut().take_sent()
    }

    pub fn stats(&self) -> QueueStats {
        self.shared.critical_section().stats()
    }

    /// Run `f` against the queue set inside a critical section.
    pub fn inspect<R>(&self, f: impl FnOnce(&QueueSet) -> R) -> R {
        let cs = self.shared.critical_section();
        f(&cs)
    }

    /// Hand out the interrupt-side handle. There is exactly one.
    pub fn interrupt_context(&self) -> Result<InterruptContext<D>> {
        if self.shared.interrupt_taken.swap(true, Ordering::AcqRel) {
            return Err(DriverError::InterruptContextTaken);
        }
        Ok(InterruptContext::new(Arc::clone(&self.shared)))
    }
}
