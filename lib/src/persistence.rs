//! Persistence stage: an optional pass-through hop between capture and
//! parsing used only to mark where an on-disk replay buffer would sit.
//!
//! A real persistent queue is out of scope; `queues.persistent.enabled`
//! still has to parse and be honored structurally so a pipeline built with
//! it set stays wired together, grounded in `threads/persistentQueue.cpp`'s
//! passthrough shape (the original, too, just forwards every frame it reads
//! back out once the experimental on-disk buffer is disabled).

use crate::errors::StageInitError;
use crate::stage::{StageContext, StageWork};

/// Drains its input queue every tick and forwards each handle unchanged.
#[derive(Default)]
pub struct PersistenceStageWork;

impl PersistenceStageWork {
    pub fn new() -> Self {
        PersistenceStageWork
    }
}

impl StageWork for PersistenceStageWork {
    fn init_function(&mut self) -> Result<(), StageInitError> {
        Ok(())
    }

    fn recurring(
        &mut self,
        ctx: &mut StageContext,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        for handle in ctx.drain_input() {
            ctx.send_downstream(handle);
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "persistence".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{Frame, PacketHandle};
    use crate::queue::PacketQueue;

    #[test]
    fn forwards_every_queued_handle_unchanged() {
        let mut work = PersistenceStageWork::new();
        work.init_function().unwrap();

        let downstream = PacketQueue::new();
        let mut ctx = StageContext::for_test();
        ctx.downstream.push(downstream.sender());
        ctx.queue
            .sender()
            .push(PacketHandle::new(Frame::new(105, vec![4, 5, 6])));

        work.recurring(&mut ctx).unwrap();

        let forwarded = downstream.drain_all();
        assert_eq!(forwarded.len(), 1);
        assert_eq!(forwarded[0].frame.data, vec![4, 5, 6]);
    }
}
