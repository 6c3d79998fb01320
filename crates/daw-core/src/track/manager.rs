//! Track manager: owns the tracks, keyed by stable index
//!
//! Indices are never reused or shifted: `remove_track` and `clear_tracks`
//! leave holes, so the ids of the remaining tracks stay valid and a stale id
//! reports `TrackRemoved` instead of resolving to a newer track.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use super::error::{TrackError, TrackResult};
use super::track::Track;
use crate::audio::{DeviceCatalog, MixSource};

/// Stable handle to a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(pub usize);

impl TrackId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for TrackId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

type Slots = Vec<Option<Arc<Track>>>;

/// Shared track slots, also the audio callback's mix source
#[derive(Clone, Default)]
pub struct TrackList {
    slots: Arc<Mutex<Slots>>,
}

impl TrackList {
    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MixSource for TrackList {
    fn mix_into(&self, output: &mut [f32], channels: usize, scratch: &mut [f32]) -> usize {
        // Skip the block rather than wait for the control thread
        let slots = match self.slots.try_lock() {
            Ok(slots) => slots,
            Err(TryLockError::WouldBlock) => return 0,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        let n_frames = scratch.len();
        let mut playing = 0;
        for track in slots.iter().flatten() {
            if !track.get_next_audio_frame(scratch, n_frames) {
                continue;
            }
            playing += 1;
            // Mono track, duplicated to every output channel
            for (frame, sample) in output.chunks_mut(channels).zip(scratch.iter()) {
                for out in frame.iter_mut() {
                    *out += *sample;
                }
            }
        }
        playing
    }
}

/// Owns the ordered collection of tracks
pub struct TrackManager {
    catalog: Arc<dyn DeviceCatalog>,
    tracks: TrackList,
}

impl TrackManager {
    pub fn new(catalog: Arc<dyn DeviceCatalog>) -> Self {
        Self {
            catalog,
            tracks: TrackList::default(),
        }
    }

    /// Create a track; returns its stable id
    pub fn add_track(&self) -> TrackId {
        let mut slots = self.tracks.lock();
        let id = TrackId(slots.len());
        let track = Track::new(format!("Track {}", id.0 + 1), Arc::clone(&self.catalog));
        slots.push(Some(Arc::new(track)));
        log::debug!("TrackManager: added track {}", id);
        id
    }

    pub fn get_track(&self, id: TrackId) -> TrackResult<Arc<Track>> {
        let slots = self.tracks.lock();
        match slots.get(id.0) {
            Some(Some(track)) => Ok(Arc::clone(track)),
            Some(None) => Err(TrackError::TrackRemoved { index: id.0 }),
            None => Err(TrackError::IndexOutOfRange {
                index: id.0,
                count: slots.len(),
            }),
        }
    }

    /// Release the manager's ownership of a track
    ///
    /// Other ids are unaffected.
    pub fn remove_track(&self, id: TrackId) -> TrackResult<Arc<Track>> {
        let mut slots = self.tracks.lock();
        let count = slots.len();
        let slot = slots.get_mut(id.0).ok_or(TrackError::IndexOutOfRange {
            index: id.0,
            count,
        })?;
        let track = slot
            .take()
            .ok_or(TrackError::TrackRemoved { index: id.0 })?;
        log::debug!("TrackManager: removed track {}", id);
        Ok(track)
    }

    /// Release every track; their ids are not handed out again
    pub fn clear_tracks(&self) {
        let mut slots = self.tracks.lock();
        let count = slots.iter_mut().filter_map(Option::take).count();
        log::debug!("TrackManager: cleared {} tracks", count);
    }

    /// Number of live tracks
    pub fn track_count(&self) -> usize {
        self.tracks.lock().iter().flatten().count()
    }

    /// Live tracks in index order
    pub fn tracks(&self) -> Vec<(TrackId, Arc<Track>)> {
        self.tracks
            .lock()
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|t| (TrackId(i), Arc::clone(t))))
            .collect()
    }

    /// View of the tracks for the audio callback
    pub fn mix_source(&self) -> Arc<dyn MixSource> {
        Arc::new(self.tracks.clone())
    }

    pub fn catalog(&self) -> &Arc<dyn DeviceCatalog> {
        &self.catalog
    }
}
