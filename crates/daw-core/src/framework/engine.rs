//! Threaded engine: one named worker thread, one command queue, a lifecycle
//!
//! ```text
//!   start() ──spawn──► worker: on_start ─► ready ──► loop { pop/drain ─► handle_message ; tick ; sleep }
//!      │                                       │
//!      └─────────── blocks until ◄─────────────┘
//!
//!   stop()  ──► running=false ─► queue.stop() ─► join
//! ```
//!
//! The engine owns thread lifecycle and the queue only. What a message means
//! is decided by the [`EngineHandler`] it is started with.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel;

use super::queue::{MessageQueue, QueueError};
use crate::error::ErrorKind;

/// Tick interval used by engines whose worker blocks on the queue
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(10);

/// Engine failure
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to spawn thread '{thread}': {message}")]
    Spawn { thread: String, message: String },

    #[error("engine '{0}' exited before signalling readiness")]
    StartFailed(String),

    #[error("logic error: {0}")]
    Logic(String),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Spawn { .. } | EngineError::StartFailed(_) => ErrorKind::Driver,
            EngineError::Logic(_) => ErrorKind::Logic,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Lifecycle of an engine's worker thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EngineStatus {
    NotStarted = 0,
    Starting = 1,
    Running = 2,
    Stopping = 3,
    Stopped = 4,
}

impl EngineStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => EngineStatus::Starting,
            2 => EngineStatus::Running,
            3 => EngineStatus::Stopping,
            4 => EngineStatus::Stopped,
            _ => EngineStatus::NotStarted,
        }
    }
}

/// How the worker takes messages off the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopMode {
    /// Block in `pop()` until a message arrives or the queue stops.
    /// `tick` runs after each wakeup.
    Blocking,
    /// Drain with `try_pop()`, then tick and sleep. For engines with
    /// periodic work of their own.
    Drain,
}

/// Worker loop tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub pop_mode: PopMode,
    /// Sleep between iterations
    pub tick_interval: Duration,
    /// Queue capacity, `None` for unbounded
    pub queue_capacity: Option<usize>,
}

impl EngineSettings {
    /// Block on the queue, short sleep between wakeups
    pub fn blocking() -> Self {
        Self {
            pop_mode: PopMode::Blocking,
            tick_interval: DEFAULT_TICK_INTERVAL,
            queue_capacity: None,
        }
    }

    /// Poll the queue every `interval`
    pub fn polling(interval: Duration) -> Self {
        Self {
            pop_mode: PopMode::Drain,
            tick_interval: interval,
            queue_capacity: None,
        }
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::blocking()
    }
}

/// Component-specific behaviour run on the worker thread
pub trait EngineHandler<T>: Send + Sync + 'static {
    /// Runs on the worker before readiness is signalled
    fn on_start(&self) {}

    /// Dispatch one dequeued message
    ///
    /// An error aborts this message only; the loop keeps running.
    fn handle_message(&self, message: T) -> EngineResult<()>;

    /// Per-iteration work
    fn tick(&self) {}

    /// Runs on the worker after the last message was handled
    fn on_stop(&self) {}
}

/// Live worker: its join handle and the loop flag owned by that start
struct WorkerSlot {
    handle: JoinHandle<()>,
    keep_running: Arc<AtomicBool>,
}

/// Engine owning a background worker thread and its command queue
pub struct ThreadedEngine<T: Send + 'static> {
    name: String,
    queue: Arc<MessageQueue<T>>,
    settings: EngineSettings,
    status: Arc<AtomicU8>,
    running: Arc<AtomicBool>,
    thread: Mutex<Option<WorkerSlot>>,
    /// Worker that stopped itself; joined by the next `start()`
    parked: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Send + 'static> ThreadedEngine<T> {
    pub fn new(name: impl Into<String>, settings: EngineSettings) -> Self {
        let queue = match settings.queue_capacity {
            Some(capacity) => MessageQueue::bounded(capacity),
            None => MessageQueue::unbounded(),
        };
        Self {
            name: name.into(),
            queue: Arc::new(queue),
            settings,
            status: Arc::new(AtomicU8::new(EngineStatus::NotStarted as u8)),
            running: Arc::new(AtomicBool::new(false)),
            thread: Mutex::new(None),
            parked: Mutex::new(None),
        }
    }

    /// Spawn the worker and wait until it is live
    ///
    /// No-op if already running. After `Ok(())`, `is_running()` is true and
    /// pushed messages will be seen by the worker.
    pub fn start<H: EngineHandler<T>>(&self, handler: Arc<H>) -> EngineResult<()> {
        let mut thread_slot = self.thread.lock().unwrap_or_else(PoisonError::into_inner);
        if thread_slot.is_some() {
            log::debug!("{}: already running", self.name);
            return Ok(());
        }

        self.join_parked();
        self.queue.reopen();
        self.set_status(EngineStatus::Starting);

        let keep_running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = channel::bounded::<()>(1);
        let worker = Worker {
            name: self.name.clone(),
            queue: Arc::clone(&self.queue),
            settings: self.settings,
            status: Arc::clone(&self.status),
            running: Arc::clone(&self.running),
            keep_running: Arc::clone(&keep_running),
            handler,
        };

        let handle = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || worker.run(ready_tx))
            .map_err(|e| {
                self.set_status(EngineStatus::NotStarted);
                EngineError::Spawn {
                    thread: self.name.clone(),
                    message: e.to_string(),
                }
            })?;

        // Sender dropped without a value means the worker died in on_start
        if ready_rx.recv().is_err() {
            let _ = handle.join();
            self.running.store(false, Ordering::Release);
            self.set_status(EngineStatus::Stopped);
            return Err(EngineError::StartFailed(self.name.clone()));
        }

        *thread_slot = Some(WorkerSlot {
            handle,
            keep_running,
        });
        log::debug!("{}: started", self.name);
        Ok(())
    }

    /// Stop the worker and wait for it to exit
    ///
    /// Idempotent. Messages queued before the call are still handled.
    /// Called from the worker itself, the thread is signalled but not joined;
    /// the next `start()` joins it before spawning a new worker.
    pub fn stop(&self) {
        let WorkerSlot {
            handle,
            keep_running,
        } = {
            let mut thread_slot = self.thread.lock().unwrap_or_else(PoisonError::into_inner);
            match thread_slot.take() {
                Some(slot) => slot,
                None => return,
            }
        };

        self.set_status(EngineStatus::Stopping);
        keep_running.store(false, Ordering::Release);
        self.running.store(false, Ordering::Release);
        self.queue.stop();

        if handle.thread().id() == thread::current().id() {
            log::debug!("{}: stop() called from worker thread, not joining", self.name);
            *self.parked.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
            return;
        }

        log::debug!("{}: waiting for worker to stop...", self.name);
        if handle.join().is_err() {
            log::error!("{}: worker thread panicked", self.name);
        }
        self.set_status(EngineStatus::Stopped);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enqueue a message, blocking only if a bounded queue is full
    pub fn push(&self, message: T) -> Result<(), QueueError<T>> {
        self.queue.push(message)
    }

    /// Enqueue a message without blocking
    pub fn try_push(&self, message: T) -> Result<(), QueueError<T>> {
        self.queue.try_push(message)
    }

    /// Shared handle to the command queue, for driver-side producers
    pub fn queue(&self) -> Arc<MessageQueue<T>> {
        Arc::clone(&self.queue)
    }

    fn set_status(&self, status: EngineStatus) {
        self.status.store(status as u8, Ordering::Release);
    }

    fn join_parked(&self) {
        let parked = self
            .parked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(handle) = parked else {
            return;
        };
        if handle.thread().id() == thread::current().id() {
            // Restarted from inside the old worker; it exits once this call returns
            return;
        }
        if handle.join().is_err() {
            log::error!("{}: worker thread panicked", self.name);
        }
    }
}

impl<T: Send + 'static> Drop for ThreadedEngine<T> {
    fn drop(&mut self) {
        self.stop();
        self.join_parked();
    }
}

/// State moved onto the worker thread
struct Worker<T, H> {
    name: String,
    queue: Arc<MessageQueue<T>>,
    settings: EngineSettings,
    status: Arc<AtomicU8>,
    running: Arc<AtomicBool>,
    /// Cleared by the `stop()` that ends this worker; never shared with a later start
    keep_running: Arc<AtomicBool>,
    handler: Arc<H>,
}

impl<T: Send + 'static, H: EngineHandler<T>> Worker<T, H> {
    fn run(self, ready_tx: channel::Sender<()>) {
        log::info!("[{}] thread started", self.name);

        if panic::catch_unwind(AssertUnwindSafe(|| self.handler.on_start())).is_err() {
            log::error!("[{}] on_start panicked, aborting start", self.name);
            return;
        }
        self.running.store(true, Ordering::Release);
        self.status
            .store(EngineStatus::Running as u8, Ordering::Release);
        let _ = ready_tx.send(());

        while self.keep_running.load(Ordering::Acquire) {
            match self.settings.pop_mode {
                PopMode::Blocking => match self.queue.pop() {
                    Some(message) => {
                        self.dispatch(message);
                        self.drain();
                    }
                    None => break,
                },
                PopMode::Drain => self.drain(),
            }

            self.guarded("tick", || self.handler.tick());
            thread::sleep(self.settings.tick_interval);
        }

        // Work queued before stop() is never discarded
        self.drain();
        self.guarded("on_stop", || self.handler.on_stop());

        // Still set means the queue was stopped under us, not via stop()
        if self.keep_running.swap(false, Ordering::AcqRel) {
            self.running.store(false, Ordering::Release);
        }
        let _ = self.status.compare_exchange(
            EngineStatus::Stopping as u8,
            EngineStatus::Stopped as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );

        log::info!("[{}] thread stopped", self.name);
    }

    fn drain(&self) {
        while let Some(message) = self.queue.try_pop() {
            self.dispatch(message);
        }
    }

    fn dispatch(&self, message: T) {
        match panic::catch_unwind(AssertUnwindSafe(|| self.handler.handle_message(message))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::error!("[{}] dropping message: {}", self.name, e),
            Err(_) => log::error!("[{}] message handler panicked", self.name),
        }
    }

    fn guarded(&self, stage: &str, f: impl FnOnce()) {
        if panic::catch_unwind(AssertUnwindSafe(f)).is_err() {
            log::error!("[{}] {} panicked", self.name, stage);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct Forward {
        tx: channel::Sender<u32>,
        ticks: AtomicUsize,
        stopped: AtomicBool,
    }

    impl Forward {
        fn new(tx: channel::Sender<u32>) -> Arc<Self> {
            Arc::new(Self {
                tx,
                ticks: AtomicUsize::new(0),
                stopped: AtomicBool::new(false),
            })
        }
    }

    impl EngineHandler<u32> for Forward {
        fn handle_message(&self, message: u32) -> EngineResult<()> {
            if message == 13 {
                return Err(EngineError::Logic("unlucky".into()));
            }
            if message == 99 {
                panic!("handler panic");
            }
            let _ = self.tx.send(message);
            Ok(())
        }

        fn tick(&self) {
            self.ticks.fetch_add(1, Ordering::Relaxed);
        }

        fn on_stop(&self) {
            self.stopped.store(true, Ordering::Relaxed);
        }
    }

    const WAIT: Duration = Duration::from_secs(2);

    #[test]
    fn test_start_handshake_then_push_is_observed() {
        let (tx, rx) = channel::unbounded();
        let engine = ThreadedEngine::new("test-engine", EngineSettings::blocking());
        assert_eq!(engine.status(), EngineStatus::NotStarted);

        engine.start(Forward::new(tx)).unwrap();
        assert!(engine.is_running());
        assert_eq!(engine.status(), EngineStatus::Running);

        engine.push(1).unwrap();
        engine.push(2).unwrap();
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), 1);
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), 2);

        engine.stop();
        assert!(!engine.is_running());
        assert_eq!(engine.status(), EngineStatus::Stopped);
    }

    #[test]
    fn test_stop_is_idempotent_and_wakes_blocked_worker() {
        let (tx, _rx) = channel::unbounded();
        let engine = ThreadedEngine::new("idle-engine", EngineSettings::blocking());
        engine.stop(); // never started

        let handler = Forward::new(tx);
        engine.start(Arc::clone(&handler)).unwrap();
        // Worker is parked in pop(); stop must still return
        engine.stop();
        engine.stop();

        assert!(handler.stopped.load(Ordering::Relaxed));
        assert_eq!(engine.status(), EngineStatus::Stopped);
    }

    #[test]
    fn test_handler_error_does_not_kill_worker() {
        let (tx, rx) = channel::unbounded();
        let engine = ThreadedEngine::new("error-engine", EngineSettings::blocking());
        engine.start(Forward::new(tx)).unwrap();

        engine.push(13).unwrap();
        engine.push(99).unwrap();
        engine.push(5).unwrap();

        assert_eq!(rx.recv_timeout(WAIT).unwrap(), 5);
        assert!(engine.is_running());
    }

    #[test]
    fn test_messages_before_stop_are_handled() {
        let (tx, rx) = channel::unbounded();
        let engine = ThreadedEngine::new("drain-engine", EngineSettings::polling(Duration::from_millis(1)));
        engine.start(Forward::new(tx)).unwrap();

        for i in 0..100 {
            engine.push(i).unwrap();
        }
        engine.stop();

        let received: Vec<u32> = rx.try_iter().collect();
        assert_eq!(received, (0..100).collect::<Vec<_>>());
        assert!(engine.push(1).unwrap_err().is_stopped());
    }

    #[test]
    fn test_drain_mode_ticks() {
        let (tx, _rx) = channel::unbounded();
        let handler = Forward::new(tx);
        let engine = ThreadedEngine::new("tick-engine", EngineSettings::polling(Duration::from_millis(1)));
        engine.start(Arc::clone(&handler)).unwrap();

        thread::sleep(Duration::from_millis(30));
        engine.stop();
        assert!(handler.ticks.load(Ordering::Relaxed) > 0);
    }

    #[test]
    fn test_restart_after_stop() {
        let (tx, rx) = channel::unbounded();
        let handler = Forward::new(tx);
        let engine = ThreadedEngine::new("restart-engine", EngineSettings::blocking());

        engine.start(Arc::clone(&handler)).unwrap();
        engine.stop();
        engine.start(Arc::clone(&handler)).unwrap();
        assert!(engine.is_running());

        engine.push(3).unwrap();
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), 3);
    }

    #[test]
    fn test_failed_on_start_reports_start_failed() {
        struct Broken;
        impl EngineHandler<u32> for Broken {
            fn on_start(&self) {
                panic!("cannot start");
            }
            fn handle_message(&self, _message: u32) -> EngineResult<()> {
                Ok(())
            }
        }

        let engine = ThreadedEngine::new("broken-engine", EngineSettings::blocking());
        let err = engine.start(Arc::new(Broken)).unwrap_err();
        assert!(matches!(err, EngineError::StartFailed(_)));
        assert_eq!(err.kind(), ErrorKind::Driver);
        assert!(!engine.is_running());
    }

    #[test]
    fn test_worker_thread_is_named() {
        struct NameProbe {
            tx: channel::Sender<Option<String>>,
        }
        impl EngineHandler<u32> for NameProbe {
            fn handle_message(&self, _message: u32) -> EngineResult<()> {
                let _ = self.tx.send(thread::current().name().map(str::to_owned));
                Ok(())
            }
        }

        let (tx, rx) = channel::unbounded();
        let engine = ThreadedEngine::new("named-engine", EngineSettings::blocking());
        engine.start(Arc::new(NameProbe { tx })).unwrap();
        engine.push(0).unwrap();

        assert_eq!(rx.recv_timeout(WAIT).unwrap().as_deref(), Some("named-engine"));
    }

    #[test]
    fn test_stop_from_worker_then_restart_runs_one_worker() {
        struct SelfStop {
            engine: Mutex<std::sync::Weak<ThreadedEngine<u32>>>,
            tx: channel::Sender<u32>,
            active: AtomicUsize,
            overlap: AtomicBool,
        }
        impl EngineHandler<u32> for SelfStop {
            fn on_start(&self) {
                if self.active.fetch_add(1, Ordering::SeqCst) > 0 {
                    self.overlap.store(true, Ordering::SeqCst);
                }
            }
            fn handle_message(&self, message: u32) -> EngineResult<()> {
                if message == 1 {
                    if let Some(engine) = self.engine.lock().unwrap().upgrade() {
                        engine.stop();
                    }
                }
                let _ = self.tx.send(message);
                Ok(())
            }
            fn on_stop(&self) {
                self.active.fetch_sub(1, Ordering::SeqCst);
            }
        }

        let (tx, rx) = channel::unbounded();
        let engine = Arc::new(ThreadedEngine::new("self-stop-engine", EngineSettings::blocking()));
        let handler = Arc::new(SelfStop {
            engine: Mutex::new(Arc::downgrade(&engine)),
            tx,
            active: AtomicUsize::new(0),
            overlap: AtomicBool::new(false),
        });

        engine.start(Arc::clone(&handler)).unwrap();
        engine.push(1).unwrap();
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), 1);
        assert!(!engine.is_running());

        // Restart right away, before the old worker has finished its tick sleep
        engine.start(Arc::clone(&handler)).unwrap();
        assert!(engine.is_running());
        assert_eq!(engine.status(), EngineStatus::Running);
        assert!(!handler.overlap.load(Ordering::SeqCst));

        engine.push(2).unwrap();
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), 2);

        engine.stop();
        assert_eq!(engine.status(), EngineStatus::Stopped);
        assert_eq!(handler.active.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_stop_from_worker_reaches_stopped_status() {
        struct StopOnMessage {
            engine: Mutex<std::sync::Weak<ThreadedEngine<u32>>>,
        }
        impl EngineHandler<u32> for StopOnMessage {
            fn handle_message(&self, _message: u32) -> EngineResult<()> {
                if let Some(engine) = self.engine.lock().unwrap().upgrade() {
                    engine.stop();
                }
                Ok(())
            }
        }

        let engine = Arc::new(ThreadedEngine::new("stopping-engine", EngineSettings::blocking()));
        let handler = Arc::new(StopOnMessage {
            engine: Mutex::new(Arc::downgrade(&engine)),
        });
        engine.start(handler).unwrap();
        engine.push(0).unwrap();

        let deadline = std::time::Instant::now() + WAIT;
        while engine.status() != EngineStatus::Stopped && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(engine.status(), EngineStatus::Stopped);
        assert!(!engine.is_running());
    }
}
