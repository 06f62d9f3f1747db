use crossbeam_channel::{bounded, Receiver, RecvError, Sender, TryRecvError, TrySendError};

use crate::packet::PacketHandle;

/// Capacity shared by every stage's input queue (§4.1).
pub const QUEUE_CAPACITY: usize = 1000;

/// A bounded, non-blocking-push FIFO of owned [`PacketHandle`]s.
///
/// Wraps a `crossbeam_channel` bounded channel the way a harvester loop
/// drives its sinks (`try_send`, log-and-drop on `Full`).
/// Push never blocks; it either succeeds or reports rejection so the
/// caller can drop the handle.
pub struct PacketQueue {
    tx: Sender<PacketHandle>,
    rx: Receiver<PacketHandle>,
}

impl PacketQueue {
    pub fn new() -> Self {
        let (tx, rx) = bounded(QUEUE_CAPACITY);
        PacketQueue { tx, rx }
    }

    pub fn sender(&self) -> PacketQueueSender {
        PacketQueueSender {
            tx: self.tx.clone(),
        }
    }

    /// Drains every packet currently buffered without blocking, atomic with
    /// respect to concurrent producers: returns exactly the prefix that was
    /// visible when draining started.
    pub fn drain_all(&self) -> Vec<PacketHandle> {
        let mut out = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(handle) => out.push(handle),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Blocking receive used by stages that want to wait for the next item
    /// rather than poll; returns `Err` once every sender has dropped.
    pub fn recv(&self) -> Result<PacketHandle, RecvError> {
        self.rx.recv()
    }
}

impl Default for PacketQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// A cloneable handle producers use to push into a stage's input queue.
#[derive(Clone)]
pub struct PacketQueueSender {
    tx: Sender<PacketHandle>,
}

/// Outcome of a non-blocking push, mirroring §4.1: push never blocks,
/// rejection occurs only when full (or when the receiver is gone).
pub enum PushOutcome {
    Accepted,
    Rejected,
}

impl PacketQueueSender {
    pub fn push(&self, handle: PacketHandle) -> PushOutcome {
        match self.tx.try_send(handle) {
            Ok(()) => PushOutcome::Accepted,
            Err(TrySendError::Full(_)) => {
                log::warn!("stage input queue full; dropping packet");
                PushOutcome::Rejected
            }
            Err(TrySendError::Disconnected(_)) => {
                log::error!("stage input queue disconnected; dropping packet");
                PushOutcome::Rejected
            }
        }
    }
}
