//! Multi-packet messages.
//!
//! A message on one stream is either a single packet carrying both FIRST and
//! LAST, or one FIRST packet, any number of MIDDLE packets and one LAST.

use tracing::warn;

use crate::error::{PacketError, Result};
use crate::flags::{ContentKind, MessagePosition, Ownership, PacketFlags, MAX_STREAMS};
use crate::packet::Packet;

/// Split a payload into packets for one stream, setting position flags.
///
/// An empty payload still produces one (empty) packet. Packet indexes count
/// up from zero and wrap at 16.
pub fn packetize(
    kind: ContentKind,
    stream_index: u8,
    payload: &[u8],
    ownership: Ownership,
) -> Vec<Packet> {
    let capacity = ownership.capacity();
    let chunks: Vec<&[u8]> = if payload.is_empty() {
        vec![payload]
    } else {
        payload.chunks(capacity).collect()
    };
    let last = chunks.len() - 1;

    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| {
            let position = match (i == 0, i == last) {
                (true, true) => MessagePosition::Only,
                (true, false) => MessagePosition::First,
                (false, true) => MessagePosition::Last,
                (false, false) => MessagePosition::Middle,
            };
            let usage = PacketFlags::usage(kind, position);
            let index = (i % 16) as u8;
            let mut packet = match ownership {
                Ownership::App => Packet::create_app_tx(usage, index, stream_index),
                Ownership::Driver => Packet::create_driver_tx(usage, index, stream_index),
            };
            packet.append(chunk);
            packet
        })
        .collect()
}

/// A reassembled message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub stream_index: u8,
    pub kind: ContentKind,
    pub payload: Vec<u8>,
}

/// Reassembles messages from received packets, one partial message per stream.
#[derive(Debug, Default)]
pub struct MessageAssembler {
    partial: [Option<(ContentKind, Vec<u8>)>; MAX_STREAMS],
}

impl MessageAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a message is half-way assembled on `stream_index`.
    pub fn in_progress(&self, stream_index: u8) -> bool {
        self.partial
            .get(usize::from(stream_index))
            .is_some_and(Option::is_some)
    }

    /// Add one packet. Returns the message once its LAST packet arrives.
    ///
    /// A FIRST or single-packet message arriving mid-message drops the stale
    /// partial and starts over from the new packet. A continuation with
    /// nothing in progress is an error and the packet is dropped.
    pub fn push(&mut self, packet: &Packet) -> Result<Option<Message>> {
        let stream = packet.stream_index();
        let flags = packet.flags();
        let slot = &mut self.partial[usize::from(stream) % MAX_STREAMS];

        let position = flags.position();
        let stale = slot.take();
        if let (MessagePosition::Only | MessagePosition::First, Some((_, partial))) =
            (position, &stale)
        {
            warn!(
                stream,
                dropped = partial.len(),
                "new message started before LAST; partial message dropped"
            );
        }

        match (position, stale) {
            (MessagePosition::Only, _) => Ok(Some(Message {
                stream_index: stream,
                kind: flags.content(),
                payload: packet.data().to_vec(),
            })),
            (MessagePosition::First, _) => {
                *slot = Some((flags.content(), packet.data().to_vec()));
                Ok(None)
            }
            (MessagePosition::Middle, Some((kind, mut payload))) => {
                payload.extend_from_slice(packet.data());
                *slot = Some((kind, payload));
                Ok(None)
            }
            (MessagePosition::Last, Some((kind, mut payload))) => {
                payload.extend_from_slice(packet.data());
                Ok(Some(Message {
                    stream_index: stream,
                    kind,
                    payload,
                }))
            }
            (MessagePosition::Middle | MessagePosition::Last, None) => {
                Err(PacketError::MessageSequence {
                    stream,
                    reason: "continuation without FIRST",
                })
            }
        }
    }
}
