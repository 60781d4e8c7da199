//! Metadata guessed from file and directory names.

use std::path::Path;
use std::time::Duration;

use super::{MetadataExtractor, TrackMetadata, UNKNOWN_ALBUM, UNKNOWN_ARTIST};
use crate::error::MetadataError;
use crate::Result;

/// Extractor that never opens the file.
///
/// Understands stems shaped like `"03 - Artist - Title"`, `"03. Title"`,
/// `"Artist - Title"` and plain `"Title"`. The album is the name of the
/// parent directory. Duration is always zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilenameExtractor;

impl FilenameExtractor {
    /// Create a new filename extractor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Guess metadata from `path` without touching the filesystem.
    #[must_use]
    pub fn guess(path: &Path) -> TrackMetadata {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let (track_number, artist, title) = parse_stem(&stem);

        let album = path
            .parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_ALBUM.to_string());

        TrackMetadata {
            title: if title.is_empty() { stem } else { title },
            artist: artist.unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            album,
            track_number: track_number.unwrap_or(0),
            duration: Duration::ZERO,
        }
    }
}

impl MetadataExtractor for FilenameExtractor {
    fn extract(&self, path: &Path) -> Result<TrackMetadata> {
        if !path.is_file() {
            return Err(MetadataError::unreadable(path, "not a regular file").into());
        }
        Ok(Self::guess(path))
    }
}

/// Split a file stem into (track number, artist, title).
fn parse_stem(stem: &str) -> (Option<u32>, Option<String>, String) {
    let mut parts: Vec<String> = stem
        .split(" - ")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect();

    let mut number = None;
    if let Some(first) = parts.first() {
        let digits: String = first.chars().take_while(char::is_ascii_digit).collect();
        let rest = first[digits.len()..].trim_start_matches(['.', ' ', '_', '-']);
        let separated = rest.len() < first.len() - digits.len() || rest.is_empty();

        number = digits.parse().ok().filter(|_| separated);
        if number.is_some() {
            if rest.is_empty() {
                parts.remove(0);
            } else {
                parts[0] = rest.to_string();
            }
        }
    }

    match parts.len() {
        0 => (number, None, String::new()),
        1 => (number, None, parts.remove(0)),
        _ => {
            let artist = parts.remove(0);
            (number, Some(artist), parts.join(" - "))
        }
    }
}
