//! The BDPP core: packet pooling, queueing and the interrupt bridge.
//!
//! One [`Bdpp`] context owns the TX queue, the sixteen per-stream RX queues
//! and the packet pool. Foreground code uses it directly; the transport's
//! interrupt handler drives an [`InterruptContext`] obtained from it. Both
//! sides meet only inside a [`CriticalSection`], which masks the transport's
//! interrupt source for its lifetime.
//!
//! Queued packets belong to the driver. App-owned packets are released once
//! sent; set [`DriverConfig::retain_sent`] to get them back through
//! [`Bdpp::take_sent_packet`] instead.
//!
//! ```no_run
//! use bdpp_driver::{Bdpp, DriverConfig};
//! use bdpp_packet::{flags::COMMAND, Packet};
//! use bdpp_transport::SimulatedUart;
//!
//! let config = DriverConfig {
//!     retain_sent: true,
//!     ..DriverConfig::default()
//! };
//! let bdpp = Bdpp::with_config(SimulatedUart::new(), config);
//! bdpp.initialize()?;
//!
//! let mut packet = Packet::create_app_tx(COMMAND, 1, 3);
//! packet.append(&[0x01, 0x02, 0x03]);
//! bdpp.queue_tx_packet(packet);
//!
//! if let Some(reply) = bdpp.get_rx_packet(3) {
//!     println!("{} bytes on stream 3", reply.len());
//!     bdpp.recycle_rx_packet(reply);
//! }
//!
//! // Reuse or drop what the transport has finished sending.
//! while let Some(sent) = bdpp.take_sent_packet() {
//!     drop(sent);
//! }
//! # Ok::<(), bdpp_driver::DriverError>(())
//! ```

pub mod config;
pub mod critical;
pub mod driver;
pub mod error;
pub mod interrupt;
pub mod pool;
pub mod queues;

pub use config::DriverConfig;
pub use critical::CriticalSection;
pub use driver::Bdpp;
pub use error::{DriverError, Result};
pub use interrupt::InterruptContext;
pub use pool::PacketPool;
pub use queues::{QueueSet, QueueStats};
