//! Tracks and the track manager

pub mod error;
pub mod feed;
pub mod manager;
#[allow(clippy::module_inception)]
pub mod track;

pub use error::{Direction, TrackError, TrackResult};
pub use feed::{AudioFeed, DEFAULT_FEED_CAPACITY};
pub use manager::{TrackId, TrackList, TrackManager};
pub use track::{Track, TrackSource};
