use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::errors::{LifecycleError, StageInitError};
use crate::packet::PacketHandle;
use crate::queue::{PacketQueue, PacketQueueSender};

/// Lifecycle states for a stage (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Created,
    Initializing,
    Initialized,
    InitFailed,
    Starting,
    Started,
    Running,
    Stopping,
    Stopped,
    Crashed,
    Aborted,
    Killed,
}

impl StageStatus {
    fn permits_init(self) -> bool {
        matches!(
            self,
            StageStatus::Created
                | StageStatus::InitFailed
                | StageStatus::Stopped
                | StageStatus::Crashed
                | StageStatus::Aborted
                | StageStatus::Killed
        )
    }

    fn permits_start(self) -> bool {
        matches!(
            self,
            StageStatus::Initialized
                | StageStatus::Stopped
                | StageStatus::Crashed
                | StageStatus::Aborted
                | StageStatus::Killed
        )
    }

    fn is_drained_terminal(self) -> bool {
        matches!(
            self,
            StageStatus::Stopped | StageStatus::Crashed | StageStatus::Killed | StageStatus::Aborted
        )
    }
}

/// Capability trait a concrete stage implements; the runtime owns the loop,
/// the queue, and the fan-out list, and composes the stage by delegation
/// instead of inheriting from a shared base class.
pub trait StageWork: Send {
    fn init_function(&mut self) -> Result<(), StageInitError>;

    /// One unit of work. Called repeatedly by the runtime loop. Any `Err`
    /// is treated as a crash (stage -> Crashed, worker exits).
    fn recurring(
        &mut self,
        ctx: &mut StageContext,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    fn describe(&self) -> String;
}

/// What a [`StageWork`] implementation sees on each tick: its input queue,
/// its fan-out list, and a way to request its own stop (`ThreadFinished`).
pub struct StageContext {
    pub queue: Arc<PacketQueue>,
    pub downstream: Vec<PacketQueueSender>,
    finished: Arc<AtomicBool>,
}

impl StageContext {
    /// Builds a standalone context for unit tests that drive `StageWork::
    /// recurring` directly, without a `StageRuntime` thread around it.
    #[cfg(test)]
    pub fn for_test() -> StageContext {
        StageContext {
            queue: Arc::new(PacketQueue::new()),
            downstream: Vec::new(),
            finished: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Drain everything currently queued, atomically w.r.t. producers.
    pub fn drain_input(&self) -> Vec<PacketHandle> {
        self.queue.drain_all()
    }

    /// Send-to-next with clone-on-fan-out.
    ///
    /// N=0: dropped. N=1: original enqueued. N>1: downstream 0 (the
    /// primary path) gets the original, downstream 1..N-1 each get an
    /// independent deep clone.
    pub fn send_downstream(&self, handle: PacketHandle) {
        send_downstream(&self.downstream, handle);
    }

    /// Equivalent of the original's `ThreadFinished()`: ask the runtime to
    /// stop this stage after the current tick (used by the file reader on
    /// EOF).
    pub fn request_stop(&self) {
        self.finished.store(true, Ordering::SeqCst);
    }
}

/// Free function implementing the fan-out contract so callers outside a
/// running stage (e.g. tests) can exercise it directly.
pub fn send_downstream(downstream: &[PacketQueueSender], handle: PacketHandle) {
    match downstream.len() {
        0 => {
            log::debug!("no downstream stages; dropping packet");
        }
        1 => {
            downstream[0].push(handle);
        }
        _ => {
            for sender in &downstream[1..] {
                sender.push(handle.deep_clone());
            }
            downstream[0].push(handle);
        }
    }
}

/// Generic worker with lifecycle, input queue, fan-out list, and recurring
/// tick. One runtime per stage; concrete behavior is delegated to a
/// [`StageWork`] implementation.
pub struct StageRuntime {
    name: String,
    status: Arc<Mutex<StageStatus>>,
    queue: Arc<PacketQueue>,
    downstream: Vec<PacketQueueSender>,
    tick: Option<Duration>,
    work: Option<Box<dyn StageWork>>,
    handle: Option<JoinHandle<()>>,
    finished: Arc<AtomicBool>,
}

impl StageRuntime {
    pub fn new(name: impl Into<String>, work: Box<dyn StageWork>) -> Self {
        StageRuntime {
            name: name.into(),
            status: Arc::new(Mutex::new(StageStatus::Created)),
            queue: Arc::new(PacketQueue::new()),
            downstream: Vec::new(),
            tick: None,
            work: Some(work),
            handle: None,
            finished: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> StageStatus {
        *self.status.lock().expect("status mutex poisoned")
    }

    pub fn input_sender(&self) -> PacketQueueSender {
        self.queue.sender()
    }

    pub fn add_downstream(&mut self, sender: PacketQueueSender) {
        self.downstream.push(sender);
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    fn set_status(&self, status: StageStatus) {
        *self.status.lock().expect("status mutex poisoned") = status;
    }

    /// `tick_ns == 0` means "no sleep between ticks".
    pub fn init(&mut self, tick_ns: u64) -> Result<(), LifecycleError> {
        let current = self.status();
        if !current.permits_init() {
            return Err(LifecycleError::InitNotPermitted(current));
        }
        self.set_status(StageStatus::Initializing);
        let work = self
            .work
            .as_mut()
            .expect("work taken while stage not running");
        match work.init_function() {
            Ok(()) => {
                self.tick = if tick_ns == 0 {
                    None
                } else {
                    Some(Duration::from_nanos(tick_ns))
                };
                self.set_status(StageStatus::Initialized);
                Ok(())
            }
            Err(e) => {
                self.set_status(StageStatus::InitFailed);
                Err(LifecycleError::Init(e))
            }
        }
    }

    pub fn start(&mut self) -> Result<(), LifecycleError> {
        let current = self.status();
        if !current.permits_start() {
            return Err(LifecycleError::StartNotPermitted(current));
        }
        self.set_status(StageStatus::Starting);

        let mut work = self.work.take().expect("work missing at start()");
        let status = Arc::clone(&self.status);
        let queue = Arc::clone(&self.queue);
        let downstream = self.downstream.clone();
        let finished = Arc::clone(&self.finished);
        let tick = self.tick;
        let name = self.name.clone();

        let builder = thread::Builder::new().name(format!("wifibeat-{name}"));
        let spawned = builder.spawn(move || {
            *status.lock().expect("status mutex poisoned") = StageStatus::Running;
            let mut ctx = StageContext {
                queue: Arc::clone(&queue),
                downstream,
                finished: Arc::clone(&finished),
            };

            loop {
                let current = *status.lock().expect("status mutex poisoned");
                let drain_requested = current == StageStatus::Stopping;
                if current == StageStatus::Running {
                    // keep going
                } else if drain_requested && !queue.is_empty() {
                    // keep draining
                } else {
                    break;
                }

                let outcome = catch_unwind(AssertUnwindSafe(|| work.recurring(&mut ctx)));
                match outcome {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        log::error!("stage '{name}' crashed: {e}");
                        *status.lock().expect("status mutex poisoned") = StageStatus::Crashed;
                        break;
                    }
                    Err(_) => {
                        log::error!("stage '{name}' panicked");
                        *status.lock().expect("status mutex poisoned") = StageStatus::Crashed;
                        break;
                    }
                }

                if finished.load(Ordering::SeqCst) {
                    break;
                }

                if let Some(dwell) = tick {
                    thread::sleep(dwell);
                }
            }

            // Drain and drop anything left over; if we crashed, leave the
            // status as Crashed rather than overwriting it with Stopped.
            let _ = queue.drain_all();
            let mut guard = status.lock().expect("status mutex poisoned");
            if *guard != StageStatus::Crashed {
                *guard = StageStatus::Stopped;
            }
        });

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                self.set_status(StageStatus::Started);
                Ok(())
            }
            Err(_) => {
                self.set_status(StageStatus::Aborted);
                Err(LifecycleError::StartNotPermitted(StageStatus::Aborted))
            }
        }
    }

    /// Idempotent: succeeds (as a no-op) when the stage is already
    /// `Stopping`/`Stopped`/terminal, per the Design Note resolving the
    /// original's non-reentrant `stop()`.
    pub fn stop(&mut self, drain: bool) -> Result<(), LifecycleError> {
        let current = self.status();
        match current {
            StageStatus::Running => {
                self.finished.store(!drain, Ordering::SeqCst);
                self.set_status(StageStatus::Stopping);
                Ok(())
            }
            StageStatus::Stopping
            | StageStatus::Stopped
            | StageStatus::Crashed
            | StageStatus::Aborted
            | StageStatus::Killed => Ok(()),
            other => Err(LifecycleError::StartNotPermitted(other)),
        }
    }

    /// Refused while `Running`. Otherwise polls in ~10ms increments for up
    /// to `wait_ms` for a graceful `Stopped`/`Crashed`, then joins the
    /// worker. If the deadline elapses first, the stage is marked `Killed`
    /// and the thread is left to finish on its own in the background:
    /// std::thread has no safe forced-termination primitive, unlike the
    /// pthread cancellation the original relied on.
    pub fn kill(&mut self, wait_ms: u64) -> Result<(), LifecycleError> {
        if self.status() == StageStatus::Running {
            return Err(LifecycleError::KillWhileRunning);
        }

        let mut waited = 0u64;
        while waited < wait_ms {
            let s = self.status();
            if s == StageStatus::Stopped || s == StageStatus::Crashed {
                break;
            }
            thread::sleep(Duration::from_millis(10));
            waited += 10;
        }

        match self.status() {
            StageStatus::Stopped | StageStatus::Crashed => {
                if let Some(handle) = self.handle.take() {
                    let _ = handle.join();
                }
            }
            _ => {
                self.set_status(StageStatus::Killed);
            }
        }
        Ok(())
    }

    pub fn all_queues_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// A stage is considered drained once it has stopped (in any terminal
    /// way) and its input queue is empty.
    pub fn is_drained(&self) -> bool {
        self.all_queues_empty() && self.status().is_drained_terminal()
    }
}
