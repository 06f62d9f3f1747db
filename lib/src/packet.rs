use std::time::{SystemTime, UNIX_EPOCH};

/// Raw captured bytes plus the pcap link type they were captured under.
///
/// This is the crate's stand-in for a parsed PDU tree: the parser (see
/// [`crate::parser`]) decodes these bytes lazily, on demand, rather than
/// building an intermediate object graph. Cloning deep-copies the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub linktype: i32,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(linktype: i32, data: Vec<u8>) -> Self {
        Frame { linktype, data }
    }
}

/// Whether a decryption stage touched this frame, and with what result.
///
/// Resolves the open question: the original forwarded frames regardless of
/// decryption outcome with no way for downstreams to tell decrypted from
/// not-decrypted. This flag makes that explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptedState {
    /// No decryption stage is in the topology, or the frame isn't protected.
    NotApplicable,
    /// Decryption was attempted and the payload was unwrapped successfully.
    Decrypted,
    /// Decryption was attempted but failed (unknown key, bad MIC, etc).
    Failed,
}

/// The owned unit moving through the pipeline: a captured frame plus the
/// timestamp it was captured at and the ebb of decryption state it has
/// accumulated so far.
///
/// Invariants: the timestamp is captured once, at the source, and never
/// mutated afterwards. Ownership moves on a successful queue push; on a
/// failed push the producer drops the handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketHandle {
    pub frame: Frame,
    /// Nanoseconds since the Unix epoch, captured at the source.
    pub timestamp_ns: u128,
    pub decrypted: DecryptedState,
}

impl PacketHandle {
    pub fn new(frame: Frame) -> Self {
        let timestamp_ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        PacketHandle {
            frame,
            timestamp_ns,
            decrypted: DecryptedState::NotApplicable,
        }
    }

    pub fn with_timestamp(frame: Frame, timestamp_ns: u128) -> Self {
        PacketHandle {
            frame,
            timestamp_ns,
            decrypted: DecryptedState::NotApplicable,
        }
    }

    /// Deep clone used by fan-out: clones the frame buffer and copies the
    /// timestamp/decryption state exactly. Never a shallow copy.
    pub fn deep_clone(&self) -> Self {
        self.clone()
    }
}
