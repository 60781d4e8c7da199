//! Track metadata extraction.
//!
//! The catalog never parses audio files itself; it asks a
//! [`MetadataExtractor`] for the handful of fields it stores.
//!
//! - [`TagExtractor`] reads embedded tags and stream properties with `lofty`
//! - [`FilenameExtractor`] guesses everything from the path alone

mod filename;
mod tags;

use std::path::Path;
use std::time::Duration;

use serde::Serialize;

use crate::Result;

pub use filename::FilenameExtractor;
pub use tags::TagExtractor;

/// Artist name used when neither tags nor the filename provide one.
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Album name used when neither tags nor the directory provide one.
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// The fields the catalog keeps for one audio file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackMetadata {
    /// Track title.
    pub title: String,
    /// Performing artist.
    pub artist: String,
    /// Album name. The album's identity is its directory, not this name.
    pub album: String,
    /// Position on the album, zero when unknown.
    pub track_number: u32,
    /// Playing time.
    pub duration: Duration,
}

/// Turns a path into [`TrackMetadata`].
///
/// Implementations are called concurrently from every walker and from the
/// watcher's event handler.
pub trait MetadataExtractor: Send + Sync {
    /// Extract metadata from the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::error::MetadataError`] when the file cannot be read.
    fn extract(&self, path: &Path) -> Result<TrackMetadata>;
}

impl<F> MetadataExtractor for F
where
    F: Fn(&Path) -> Result<TrackMetadata> + Send + Sync,
{
    fn extract(&self, path: &Path) -> Result<TrackMetadata> {
        self(path)
    }
}
