//! Sample feed into a track
//!
//! One producer (a decoder thread or an input stream callback), one consumer
//! (the track, pulled from the audio callback). Both sides are lock-free.

/// Default ring capacity in samples
pub const DEFAULT_FEED_CAPACITY: usize = 1 << 16;

/// Producer side of a track's sample ring
pub struct AudioFeed {
    producer: rtrb::Producer<f32>,
}

impl AudioFeed {
    /// Create a connected producer/consumer pair
    pub(crate) fn channel(capacity: usize) -> (Self, rtrb::Consumer<f32>) {
        let (producer, consumer) = rtrb::RingBuffer::new(capacity.max(1));
        (Self { producer }, consumer)
    }

    /// Push as many samples as fit; returns how many were accepted
    pub fn push_samples(&mut self, samples: &[f32]) -> usize {
        let mut written = 0;
        for sample in samples {
            if self.producer.push(*sample).is_err() {
                break;
            }
            written += 1;
        }
        written
    }

    /// Free slots in the ring
    pub fn available(&self) -> usize {
        self.producer.slots()
    }

    /// True once the track replaced or dropped this feed's source
    pub fn is_disconnected(&self) -> bool {
        self.producer.is_abandoned()
    }
}

impl std::fmt::Debug for AudioFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioFeed")
            .field("available", &self.available())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_stops_when_full() {
        let (mut feed, mut consumer) = AudioFeed::channel(4);
        assert_eq!(feed.push_samples(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]), 4);
        assert_eq!(feed.available(), 0);

        assert_eq!(consumer.pop().ok(), Some(0.1));
        assert_eq!(feed.push_samples(&[0.7]), 1);
    }

    #[test]
    fn test_disconnect_is_visible() {
        let (feed, consumer) = AudioFeed::channel(8);
        assert!(!feed.is_disconnected());
        drop(consumer);
        assert!(feed.is_disconnected());
    }
}
