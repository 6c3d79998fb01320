//! Thread-safe FIFO message queue owned by every engine
//!
//! Producers push from any thread; driver callbacks use [`MessageQueue::try_push`],
//! which never blocks. The owning engine's worker pops.
//!
//! ```text
//!   producers ──push()/try_push()──► [ crossbeam channel ] ──pop()/try_pop()──► worker
//!                                          ▲
//!   stop() ── drops the stop sender ───────┘  every blocked pop() wakes up
//! ```
//!
//! Stopping never discards work: `pop()` and `try_pop()` keep returning items
//! that were queued before `stop()` and only report the stop signal once the
//! queue is empty.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, SendTimeoutError, Sender, TrySendError};

/// How long a blocking `push()` on a full bounded queue waits before it
/// re-checks the stop flag
const PUSH_RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// Rejected push; the message is handed back to the caller
pub enum QueueError<T> {
    /// Bounded queue has no free slot
    Full(T),
    /// Queue was stopped
    Stopped(T),
}

impl<T> QueueError<T> {
    /// Recover the rejected message
    pub fn into_inner(self) -> T {
        match self {
            QueueError::Full(message) | QueueError::Stopped(message) => message,
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, QueueError::Full(_))
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, QueueError::Stopped(_))
    }
}

impl<T> fmt::Debug for QueueError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::Full(_) => f.write_str("Full(..)"),
            QueueError::Stopped(_) => f.write_str("Stopped(..)"),
        }
    }
}

impl<T> fmt::Display for QueueError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::Full(_) => f.write_str("message queue is full"),
            QueueError::Stopped(_) => f.write_str("message queue is stopped"),
        }
    }
}

impl<T> std::error::Error for QueueError<T> {}

/// Stop broadcast: dropping `tx` disconnects `rx` for every waiter at once
struct StopSignal {
    tx: Option<Sender<()>>,
    rx: Receiver<()>,
}

impl StopSignal {
    fn new() -> Self {
        let (tx, rx) = channel::bounded(0);
        Self { tx: Some(tx), rx }
    }
}

/// Homogeneous FIFO queue with blocking and non-blocking pop
pub struct MessageQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
    stopped: AtomicBool,
    stop_signal: Mutex<StopSignal>,
}

impl<T> MessageQueue<T> {
    /// Create a queue without a capacity limit
    pub fn unbounded() -> Self {
        let (tx, rx) = channel::unbounded();
        Self::from_channel(tx, rx)
    }

    /// Create a queue holding at most `capacity` messages
    ///
    /// A capacity of zero is raised to one so `try_push` can ever succeed.
    pub fn bounded(capacity: usize) -> Self {
        let (tx, rx) = channel::bounded(capacity.max(1));
        Self::from_channel(tx, rx)
    }

    fn from_channel(tx: Sender<T>, rx: Receiver<T>) -> Self {
        Self {
            tx,
            rx,
            stopped: AtomicBool::new(false),
            stop_signal: Mutex::new(StopSignal::new()),
        }
    }

    /// Append a message
    ///
    /// Never blocks on an unbounded queue. On a full bounded queue this waits
    /// for a free slot, giving up if the queue is stopped meanwhile.
    pub fn push(&self, message: T) -> Result<(), QueueError<T>> {
        let mut message = message;
        loop {
            if self.is_stopped() {
                return Err(QueueError::Stopped(message));
            }
            match self.tx.send_timeout(message, PUSH_RETRY_INTERVAL) {
                Ok(()) => return Ok(()),
                Err(SendTimeoutError::Timeout(rejected)) => message = rejected,
                Err(SendTimeoutError::Disconnected(rejected)) => {
                    return Err(QueueError::Stopped(rejected))
                }
            }
        }
    }

    /// Append a message without ever blocking
    ///
    /// Safe to call from real-time driver callbacks.
    pub fn try_push(&self, message: T) -> Result<(), QueueError<T>> {
        if self.is_stopped() {
            return Err(QueueError::Stopped(message));
        }
        self.tx.try_send(message).map_err(|e| match e {
            TrySendError::Full(rejected) => QueueError::Full(rejected),
            TrySendError::Disconnected(rejected) => QueueError::Stopped(rejected),
        })
    }

    /// Take the oldest message, blocking until one arrives
    ///
    /// Returns `None` only once the queue is stopped *and* empty.
    pub fn pop(&self) -> Option<T> {
        if let Ok(message) = self.rx.try_recv() {
            return Some(message);
        }

        let stop_rx = self.stop_receiver();
        channel::select! {
            recv(self.rx) -> message => message.ok(),
            recv(stop_rx) -> _ => self.rx.try_recv().ok(),
        }
    }

    /// Take the oldest message if there is one
    pub fn try_pop(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Close the queue and wake every blocked `pop()`
    ///
    /// Idempotent. Items already queued stay poppable.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        let mut signal = self
            .stop_signal
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Dropping the only sender disconnects every cloned receiver
        signal.tx.take();
    }

    /// Re-arm a stopped queue so an engine can be restarted
    ///
    /// Must not be called while a consumer is blocked in `pop()`.
    pub fn reopen(&self) {
        let mut signal = self
            .stop_signal
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if signal.tx.is_none() {
            *signal = StopSignal::new();
        }
        self.stopped.store(false, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Number of queued messages
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Capacity limit, `None` for unbounded queues
    pub fn capacity(&self) -> Option<usize> {
        self.rx.capacity()
    }

    fn stop_receiver(&self) -> Receiver<()> {
        self.stop_signal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .rx
            .clone()
    }
}

impl<T> Default for MessageQueue<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_fifo_order_single_producer() {
        let queue = Arc::new(MessageQueue::unbounded());
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..1000u32 {
                    queue.push(i).unwrap();
                }
            })
        };

        let mut received = Vec::with_capacity(1000);
        while received.len() < 1000 {
            received.push(queue.pop().unwrap());
        }
        producer.join().unwrap();

        assert_eq!(received, (0..1000).collect::<Vec<_>>());
    }

    #[test]
    fn test_try_pop_empty() {
        let queue: MessageQueue<u8> = MessageQueue::unbounded();
        assert!(queue.try_pop().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_stop_wakes_all_waiters() {
        let queue: Arc<MessageQueue<u32>> = Arc::new(MessageQueue::unbounded());
        let (done_tx, done_rx) = channel::unbounded();

        for _ in 0..4 {
            let queue = Arc::clone(&queue);
            let done_tx = done_tx.clone();
            thread::spawn(move || {
                let result = queue.pop();
                done_tx.send(result).unwrap();
            });
        }

        // Give the waiters time to block
        thread::sleep(Duration::from_millis(50));
        let started = Instant::now();
        queue.stop();

        for _ in 0..4 {
            let result = done_rx.recv_timeout(Duration::from_secs(2)).unwrap();
            assert!(result.is_none());
        }
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_stop_drains_queued_items_first() {
        let queue = MessageQueue::unbounded();
        queue.push(1).unwrap();
        queue.push(2).unwrap();
        queue.stop();

        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.try_pop(), Some(2));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_push_after_stop_is_rejected() {
        let queue = MessageQueue::unbounded();
        queue.stop();
        queue.stop(); // idempotent

        let err = queue.push(7).unwrap_err();
        assert!(err.is_stopped());
        assert_eq!(err.into_inner(), 7);
        assert!(queue.try_push(8).unwrap_err().is_stopped());
    }

    #[test]
    fn test_bounded_try_push_full() {
        let queue = MessageQueue::bounded(2);
        queue.try_push('a').unwrap();
        queue.try_push('b').unwrap();

        let err = queue.try_push('c').unwrap_err();
        assert!(err.is_full());
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.capacity(), Some(2));
    }

    #[test]
    fn test_blocking_push_gives_up_on_stop() {
        let queue = Arc::new(MessageQueue::bounded(1));
        queue.push(0u8).unwrap();

        let pusher = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.push(1))
        };
        thread::sleep(Duration::from_millis(30));
        queue.stop();

        assert!(pusher.join().unwrap().unwrap_err().is_stopped());
        assert_eq!(queue.pop(), Some(0));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_reopen_after_stop() {
        let queue = MessageQueue::unbounded();
        queue.stop();
        assert!(queue.is_stopped());

        queue.reopen();
        assert!(!queue.is_stopped());
        queue.push(5).unwrap();
        assert_eq!(queue.pop(), Some(5));
    }
}
