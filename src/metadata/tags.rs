//! Embedded tag reading with `lofty`.

use std::path::Path;

use lofty::prelude::*;
use lofty::probe::Probe;

use super::{FilenameExtractor, MetadataExtractor, TrackMetadata};
use crate::error::MetadataError;
use crate::Result;

/// Extractor backed by the file's own tags (ID3, Vorbis comments, MP4
/// atoms, ...).
///
/// Fields missing from the tags are filled in from
/// [`FilenameExtractor::guess`]. Files without any tag still succeed as long
/// as `lofty` can parse the container.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagExtractor;

impl TagExtractor {
    /// Create a new tag extractor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl MetadataExtractor for TagExtractor {
    fn extract(&self, path: &Path) -> Result<TrackMetadata> {
        let tagged_file = Probe::open(path)
            .and_then(|probe| probe.read())
            .map_err(|e| MetadataError::unreadable(path, e))?;

        let mut meta = FilenameExtractor::guess(path);
        meta.duration = tagged_file.properties().duration();

        let Some(tag) = tagged_file
            .primary_tag()
            .or_else(|| tagged_file.first_tag())
        else {
            tracing::debug!(path = %path.display(), "No embedded tags, using filename");
            return Ok(meta);
        };

        if let Some(title) = non_blank(tag.title().as_deref()) {
            meta.title = title;
        }
        if let Some(artist) = non_blank(tag.artist().as_deref()) {
            meta.artist = artist;
        }
        if let Some(album) = non_blank(tag.album().as_deref()) {
            meta.album = album;
        }
        if let Some(track) = tag.track() {
            meta.track_number = track;
        }

        tracing::trace!(
            path = %path.display(),
            title = %meta.title,
            artist = %meta.artist,
            album = %meta.album,
            "Read tags"
        );

        Ok(meta)
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}
