//! Driver-side MIDI input handling
//!
//! [`MidiInputSink`] is the callback data handed to the driver. It runs on the
//! driver's thread and must stay fast and non-blocking.

use std::sync::Arc;

use daw_core::framework::{MessageQueue, QueueError};
use daw_core::midi::MidiMessage;

/// Parses raw driver bytes and enqueues them for the MIDI engine
pub struct MidiInputSink {
    queue: Arc<MessageQueue<MidiMessage>>,
    /// Driver timestamp (microseconds) of the previous message
    last_timestamp: Option<u64>,
    dropped: u64,
}

impl MidiInputSink {
    pub fn new(queue: Arc<MessageQueue<MidiMessage>>) -> Self {
        Self {
            queue,
            last_timestamp: None,
            dropped: 0,
        }
    }

    /// Handle one raw message from the driver
    ///
    /// `timestamp_us` is the driver's monotonic timestamp in microseconds.
    /// The first message on a connection has a delta time of 0.
    pub fn receive(&mut self, timestamp_us: u64, bytes: &[u8]) {
        let delta_time = match self.last_timestamp {
            Some(last) => timestamp_us.saturating_sub(last) as f64 / 1_000_000.0,
            None => 0.0,
        };
        self.last_timestamp = Some(timestamp_us);

        let Some(message) = MidiMessage::parse(delta_time, bytes) else {
            return;
        };

        if log::log_enabled!(log::Level::Trace) {
            log::trace!("[MIDI IN] {}", message);
        }

        match self.queue.try_push(message) {
            Ok(()) => {}
            Err(QueueError::Full(_)) => {
                self.dropped += 1;
                log::warn!("[MIDI IN] Message queue full, dropping message");
            }
            // Engine stopped; the port is about to be closed
            Err(QueueError::Stopped(_)) => self.dropped += 1,
        }
    }

    /// Messages that could not be enqueued
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
