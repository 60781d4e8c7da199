//! Audio format filtering.

use std::path::Path;

/// Extensions of the audio files the library indexes.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "ogg", "oga", "opus", "flac", "fla", "m4a", "wav"];

/// Decides whether a path looks like a supported audio file.
///
/// Only the extension is consulted; the file is never opened.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatFilter;

impl FormatFilter {
    /// Check if a path has a supported audio extension (case-insensitive).
    #[must_use]
    pub fn is_supported(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                SUPPORTED_EXTENSIONS
                    .iter()
                    .any(|supported| supported.eq_ignore_ascii_case(ext))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_formats() {
        for name in [
            "song.mp3", "song.ogg", "song.oga", "song.opus", "song.flac", "song.fla", "song.m4a",
            "song.wav",
        ] {
            assert!(FormatFilter::is_supported(Path::new(name)), "{name}");
        }
    }

    #[test]
    fn test_case_insensitive() {
        assert!(FormatFilter::is_supported(Path::new("/music/LOUD.MP3")));
        assert!(FormatFilter::is_supported(Path::new("/music/Mixed.FlAc")));
    }

    #[test]
    fn test_unsupported() {
        assert!(!FormatFilter::is_supported(Path::new("cover.jpg")));
        assert!(!FormatFilter::is_supported(Path::new("notes.txt")));
        assert!(!FormatFilter::is_supported(Path::new("playlist.m3u")));
        assert!(!FormatFilter::is_supported(Path::new("mp3")));
        assert!(!FormatFilter::is_supported(Path::new("song.mp3.part")));
    }
}
