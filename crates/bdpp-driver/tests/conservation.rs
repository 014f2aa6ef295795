//! The number of app-owned RX buffers in circulation never changes.

use bdpp_driver::{Bdpp, DriverConfig, InterruptContext};
use bdpp_packet::flags::COMMAND;
use bdpp_packet::wire::encode_packet;
use bdpp_packet::Packet;
use bdpp_transport::SimulatedUart;
use bytes::BytesMut;

const POOL: usize = 6;

/// Small deterministic generator so failures reproduce.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }
}

fn frame(stream: u8, len: usize) -> BytesMut {
    let mut p = Packet::create_app_tx(COMMAND, 0, stream);
    p.append(&vec![0xC0; len]);
    let mut wire = BytesMut::new();
    encode_packet(&p, &mut wire);
    wire
}

fn in_circulation(
    bdpp: &Bdpp<SimulatedUart>,
    isr: &InterruptContext<SimulatedUart>,
    held: &[Packet],
) -> usize {
    bdpp.stats().rx_visible() + isr.armed_count() + held.len()
}

fn run(seed: u64, steps: usize) {
    let cfg = DriverConfig {
        rx_pool_size: POOL,
        max_armed_rx: 2,
        ..DriverConfig::default()
    };
    let bdpp = Bdpp::with_config(SimulatedUart::new(), cfg);
    bdpp.initialize().expect("initialize");
    let mut isr = bdpp.interrupt_context().expect("interrupt context");
    let mut held: Vec<Packet> = Vec::new();
    let mut backlog = BytesMut::new();
    let mut rng = Lcg(seed);

    assert_eq!(in_circulation(&bdpp, &isr, &held), POOL);

    for _ in 0..steps {
        match rng.next() % 5 {
            0 => {
                isr.arm_rx();
            }
            1 => {
                let stream = (rng.next() % 16) as u8;
                let len = (rng.next() % 64) as usize;
                backlog.extend_from_slice(&frame(stream, len));
                let consumed = isr.on_rx_bytes(&backlog);
                let _ = backlog.split_to(consumed);
            }
            2 => {
                let stream = (rng.next() % 16) as u8;
                if let Some(p) = bdpp.get_rx_packet(stream) {
                    held.push(p);
                }
            }
            3 => {
                if !held.is_empty() {
                    let i = (rng.next() as usize) % held.len();
                    bdpp.recycle_rx_packet(held.swap_remove(i));
                }
            }
            _ => {
                // Corrupt bytes between frames.
                let consumed = isr.on_rx_bytes(&[0xC0, 0x01, 0xDB, 0x00, 0xC0]);
                assert!(consumed <= 5);
            }
        }
        assert_eq!(in_circulation(&bdpp, &isr, &held), POOL);
    }
}

#[test]
fn conserved_across_random_sequences() {
    for seed in [1u64, 7, 42, 1234, 0xDEAD_BEEF] {
        run(seed, 2_000);
    }
}

#[test]
fn conserved_when_everything_is_consumed() {
    let bdpp = Bdpp::with_config(
        SimulatedUart::new(),
        DriverConfig {
            rx_pool_size: POOL,
            ..DriverConfig::default()
        },
    );
    bdpp.initialize().expect("initialize");
    let mut isr = bdpp.interrupt_context().expect("interrupt context");

    let mut wire = BytesMut::new();
    for stream in 0..POOL as u8 {
        wire.extend_from_slice(&frame(stream, 3));
    }
    assert_eq!(isr.on_rx_bytes(&wire), wire.len());

    let held: Vec<Packet> = (0..POOL as u8)
        .filter_map(|s| bdpp.get_rx_packet(s))
        .collect();
    assert_eq!(held.len(), POOL);
    assert_eq!(bdpp.stats().free, 0);
    assert_eq!(isr.armed_count(), 0);
    assert_eq!(in_circulation(&bdpp, &isr, &held), POOL);

    for p in held {
        bdpp.recycle_rx_packet(p);
    }
    assert_eq!(bdpp.stats().free, POOL);
}
