use std::collections::VecDeque;

use bdpp_packet::{Packet, MAX_STREAMS};
use serde::Serialize;

use crate::pool::PacketPool;

/// Every queue shared between foreground and interrupt context.
///
/// Only reachable through a [`CriticalSection`](crate::CriticalSection) or
/// the interrupt side's lock, never as ambient global state.
#[derive(Debug, Default)]
pub struct QueueSet {
    tx: VecDeque<Packet>,
    rx: [VecDeque<Packet>; MAX_STREAMS],
    pool: PacketPool,
}

impl QueueSet {
    pub fn new(pool: PacketPool) -> Self {
        Self {
            pool,
            ..Self::default()
        }
    }

    /// Append to the global TX FIFO.
    pub fn push_tx(&mut self, packet: Packet) {
        self.tx.push_back(packet);
    }

    pub fn pop_tx(&mut self) -> Option<Packet> {
        self.tx.pop_front()
    }

    pub fn tx_len(&self) -> usize {
        self.tx.len()
    }

    /// Packets waiting for transmission, oldest first.
    pub fn tx_iter(&self) -> impl Iterator<Item = &Packet> {
        self.tx.iter()
    }

    /// Append to the RX FIFO of the packet's own stream.
    pub fn push_rx(&mut self, packet: Packet) {
        let stream = usize::from(packet.stream_index());
        self.rx[stream].push_back(packet);
    }

    pub fn pop_rx(&mut self, stream_index: u8) -> Option<Packet> {
        self.rx.get_mut(usize::from(stream_index))?.pop_front()
    }

    pub fn rx_len(&self, stream_index: u8) -> usize {
        self.rx
            .get(usize::from(stream_index))
            .map_or(0, VecDeque::len)
    }

    pub fn pool(&self) -> &PacketPool {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut PacketPool {
        &mut self.pool
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            tx_pending: self.tx.len(),
            rx_pending: self.rx.iter().map(VecDeque::len).collect(),
            free: self.pool.free_len(),
            sent: self.pool.sent_len(),
            driver_idle: self.pool.driver_idle(),
            rx_pool_size: self.pool.rx_pool_size(),
        }
    }
}

/// Point-in-time queue depths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub tx_pending: usize,
    /// Packets waiting per stream, indexed by stream.
    pub rx_pending: Vec<usize>,
    pub free: usize,
    pub sent: usize,
    pub driver_idle: usize,
    pub rx_pool_size: usize,
}

impl QueueStats {
    /// RX buffers the foreground can see: free plus queued for delivery.
    /// The rest are armed on the interrupt side or held by the application.
    pub fn rx_visible(&self) -> usize {
        self.free + self.rx_pending.iter().sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use bdpp_packet::flags::COMMAND;

    use super::*;

    #[test]
    fn tx_is_one_global_fifo() {
        let mut queues = QueueSet::default();
        for (slot, stream) in [(0u8, 5u8), (1, 2), (2, 5)] {
            queues.push_tx(Packet::create_driver_tx(COMMAND, slot, stream));
        }
        let order: Vec<u8> = std::iter::from_fn(|| queues.pop_tx())
            .map(|p| p.packet_index())
            .collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn rx_queues_are_per_stream() {
        let mut queues = QueueSet::default();
        queues.push_rx(Packet::create_driver_tx(COMMAND, 0, 2));
        queues.push_rx(Packet::create_driver_tx(COMMAND, 1, 5));
        queues.push_rx(Packet::create_driver_tx(COMMAND, 2, 2));

        assert_eq!(queues.rx_len(2), 2);
        assert_eq!(queues.rx_len(5), 1);
        assert_eq!(queues.pop_rx(2).unwrap().packet_index(), 0);
        assert_eq!(queues.pop_rx(2).unwrap().packet_index(), 2);
        assert!(queues.pop_rx(2).is_none());
    }

    #[test]
    fn out_of_range_stream_is_empty() {
        let mut queues = QueueSet::default();
        assert_eq!(queues.rx_len(16), 0);
        assert!(queues.pop_rx(200).is_none());
    }

    #[test]
    fn stats_serialize() {
        let queues = QueueSet::default();
        let json = serde_json::to_value(queues.stats()).unwrap();
        assert_eq!(json["tx_pending"], 0);
        assert_eq!(json["rx_pending"].as_array().unwrap().len(), 16);
    }
}
