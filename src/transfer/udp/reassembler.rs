//! Client-side reassembly of sequenced datagrams
//!
//! ```text
//! Receiving ──ERROR: datagram───────────▶ Rejected
//!     │  ├───completion marker──────────▶ Completed { last_seq }
//!     │  └───receive timeout────────────▶ TimedOut
//!     └── data / malformed / duplicate: stay in Receiving
//! ```
//!
//! The buffer belongs to one reassembler for one transfer attempt and is
//! consumed by [`Reassembler::finish`].

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};

use crate::transfer::core::Datagram;

/// Where the reassembler is in its transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReassemblyState {
    /// Still accepting datagrams
    Receiving,
    /// Completion marker seen; `last_seq` is the last data sequence number
    Completed { last_seq: u32 },
    /// No datagram within the receive timeout, collected data is final
    TimedOut,
    /// The server answered with an error datagram
    Rejected { message: String },
}

/// Result of one finished transfer attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reassembly {
    /// Terminal state, never [`ReassemblyState::Receiving`] unless finished early
    pub state: ReassemblyState,
    /// Stored payloads concatenated in ascending sequence order
    pub content: Vec<u8>,
    /// Number of distinct data chunks stored
    pub chunks_received: usize,
    /// `{1..=last_seq}` minus the stored sequence numbers; only known when
    /// the completion marker arrived
    pub missing: Option<BTreeSet<u32>>,
}

impl Reassembly {
    /// Total reassembled bytes
    pub fn total_bytes(&self) -> usize {
        self.content.len()
    }

    /// Missing packet count, zero when unknown
    pub fn missing_count(&self) -> usize {
        self.missing.as_ref().map_or(0, BTreeSet::len)
    }
}

/// Collects out-of-order, possibly duplicated or lost chunks
#[derive(Debug)]
pub struct Reassembler {
    chunks: BTreeMap<u32, Vec<u8>>,
    state: ReassemblyState,
}

impl Reassembler {
    pub fn new() -> Self {
        Self {
            chunks: BTreeMap::new(),
            state: ReassemblyState::Receiving,
        }
    }

    pub fn state(&self) -> &ReassemblyState {
        &self.state
    }

    /// Whether the transfer has reached a terminal state
    pub fn is_done(&self) -> bool {
        self.state != ReassemblyState::Receiving
    }

    /// Feed one raw datagram; returns [`Reassembler::is_done`] afterwards
    ///
    /// Malformed datagrams and bad sequence numbers are logged and skipped.
    /// The first payload stored for a sequence number wins. Once done, further
    /// datagrams are ignored.
    pub fn accept(&mut self, raw: &[u8]) -> bool {
        if self.is_done() {
            return true;
        }

        let datagram = match Datagram::decode(raw) {
            Ok(datagram) => datagram,
            Err(e) => {
                warn!("Skipping datagram: {}", e);
                return false;
            }
        };

        match datagram {
            Datagram::Error { message } => {
                self.state = ReassemblyState::Rejected { message };
            }
            Datagram::Complete { seq } => {
                let last_seq = seq - 1;
                debug!("Received completion marker, data packets expected: {}", last_seq);
                self.state = ReassemblyState::Completed { last_seq };
            }
            Datagram::Data { seq, payload } => {
                if self.chunks.contains_key(&seq) {
                    debug!("Duplicate chunk {} discarded", seq);
                } else {
                    self.chunks.insert(seq, payload);
                }
            }
        }
        self.is_done()
    }

    /// Record that the receive timeout elapsed with nothing arriving
    pub fn time_out(&mut self) {
        if !self.is_done() {
            self.state = ReassemblyState::TimedOut;
        }
    }

    /// Sequence numbers expected but not stored, if the marker has arrived
    pub fn missing(&self) -> Option<BTreeSet<u32>> {
        match self.state {
            ReassemblyState::Completed { last_seq } => Some(
                (1..=last_seq)
                    .filter(|seq| !self.chunks.contains_key(seq))
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Consume the buffer and build the reconstructed content
    pub fn finish(self) -> Reassembly {
        let missing = self.missing();
        let chunks_received = self.chunks.len();
        let content = if matches!(self.state, ReassemblyState::Rejected { .. }) {
            Vec::new()
        } else {
            self.chunks.into_values().flatten().collect()
        };
        Reassembly {
            state: self.state,
            content,
            chunks_received,
            missing,
        }
    }
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}
