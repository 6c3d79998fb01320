//! Real-time audio callback context
//!
//! Runs on the driver's thread, never on the engine worker. Per block:
//!
//! 1. zero-fill the interleaved output buffer
//! 2. if the engine state is `Running`, let the mix source accumulate tracks
//!    into it, in chunks of at most `MAX_BUFFER_SIZE` frames
//! 3. update statistics (always the last step)
//!
//! The only state shared with the worker is [`AudioAtomics`]; the mix source
//! must use try-lock access so the callback never waits on another thread.

use std::sync::Arc;

use super::config::MAX_BUFFER_SIZE;
use super::state::AudioAtomics;

/// Something the callback can pull mixed track audio from
pub trait MixSource: Send + Sync {
    /// Accumulate contributions into interleaved `output`
    ///
    /// `output` is already zeroed and holds `scratch.len()` frames of
    /// `channels` samples. `scratch` is a preallocated mono buffer for pulling
    /// one track at a time. Returns the number of tracks that contributed.
    /// Must not block or allocate.
    fn mix_into(&self, output: &mut [f32], channels: usize, scratch: &mut [f32]) -> usize;
}

/// Mix source producing silence
pub struct Silence;

impl MixSource for Silence {
    fn mix_into(&self, _output: &mut [f32], _channels: usize, _scratch: &mut [f32]) -> usize {
        0
    }
}

/// Everything the driver callback needs, preallocated
pub struct AudioCallback {
    atomics: Arc<AudioAtomics>,
    mix: Arc<dyn MixSource>,
    scratch: Vec<f32>,
}

impl AudioCallback {
    pub fn new(atomics: Arc<AudioAtomics>, mix: Arc<dyn MixSource>) -> Self {
        Self {
            atomics,
            mix,
            scratch: vec![0.0; MAX_BUFFER_SIZE],
        }
    }

    /// Fill one driver block of interleaved samples
    pub fn process(&mut self, output: &mut [f32], channels: usize) {
        output.fill(0.0);

        let channels = channels.max(1);
        let n_frames = output.len() / channels;

        let mut tracks_playing = 0;
        if self.atomics.is_running() {
            let chunk_samples = MAX_BUFFER_SIZE * channels;
            for chunk in output.chunks_mut(chunk_samples) {
                let frames = chunk.len() / channels;
                let contributed = self
                    .mix
                    .mix_into(&mut chunk[..frames * channels], channels, &mut self.scratch[..frames]);
                tracks_playing = tracks_playing.max(contributed);
            }
        }

        self.atomics.record_block(tracks_playing, n_frames);
    }

    /// Output silence and count the block, for when `process` panicked
    pub fn process_silence(&self, output: &mut [f32], channels: usize) {
        output.fill(0.0);
        self.atomics.record_block(0, output.len() / channels.max(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::state::AudioState;

    /// Adds a constant to every sample of every channel
    struct Constant(f32);

    impl MixSource for Constant {
        fn mix_into(&self, output: &mut [f32], _channels: usize, scratch: &mut [f32]) -> usize {
            scratch.fill(self.0);
            for sample in output.iter_mut() {
                *sample += self.0;
            }
            1
        }
    }

    fn callback(state: AudioState, mix: Arc<dyn MixSource>) -> (AudioCallback, Arc<AudioAtomics>) {
        let atomics = Arc::new(AudioAtomics::new());
        atomics.set_state(state);
        (AudioCallback::new(Arc::clone(&atomics), mix), atomics)
    }

    #[test]
    fn test_zero_fills_when_not_running() {
        let (mut cb, atomics) = callback(AudioState::Stopped, Arc::new(Constant(0.5)));
        let mut output = vec![1.0f32; 512];

        cb.process(&mut output, 2);

        assert!(output.iter().all(|s| *s == 0.0));
        let stats = atomics.statistics();
        assert_eq!(stats.tracks_playing, 0);
        assert_eq!(stats.total_frames_processed, 256);
    }

    #[test]
    fn test_mixes_when_running() {
        let (mut cb, atomics) = callback(AudioState::Running, Arc::new(Constant(0.25)));
        let mut output = vec![9.0f32; 128];

        cb.process(&mut output, 2);

        assert!(output.iter().all(|s| (*s - 0.25).abs() < f32::EPSILON));
        assert_eq!(atomics.statistics().tracks_playing, 1);
    }

    #[test]
    fn test_frames_processed_is_monotonic() {
        let (mut cb, atomics) = callback(AudioState::Running, Arc::new(Silence));
        let mut output = vec![0.0f32; 1024];
        let mut last = 0;

        for _ in 0..10 {
            cb.process(&mut output, 2);
            let now = atomics.statistics().total_frames_processed;
            assert!(now > last);
            last = now;
        }
        assert_eq!(last, 5120);
    }

    #[test]
    fn test_oversized_block_is_chunked() {
        let (mut cb, atomics) = callback(AudioState::Running, Arc::new(Constant(1.0)));
        let mut output = vec![0.0f32; (MAX_BUFFER_SIZE + 100) * 2];

        cb.process(&mut output, 2);

        assert!(output.iter().all(|s| *s == 1.0));
        assert_eq!(
            atomics.statistics().total_frames_processed,
            (MAX_BUFFER_SIZE + 100) as u64
        );
    }
}
