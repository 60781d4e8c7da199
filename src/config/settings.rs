//! Configuration settings and validation.

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serializer};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Throttling knobs for library scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Pause before a scan touches the filesystem.
    #[serde(rename = "initial_wait_duration", deserialize_with = "de_duration")]
    pub initial_wait: Duration,

    /// Media files a walker processes before it pauses. Zero disables pausing.
    pub files_per_operation: u64,

    /// Length of each walker pause. Zero disables pausing.
    #[serde(rename = "sleep_after_operation", deserialize_with = "de_duration")]
    pub sleep_per_operation: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            initial_wait: Duration::ZERO,
            files_per_operation: 1500,
            sleep_per_operation: Duration::from_millis(15),
        }
    }
}

/// Main configuration for the media library.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory for the `SQLite` catalog.
    pub data_dir: PathBuf,

    /// Library roots, scanned in parallel.
    #[serde(rename = "libraries")]
    pub roots: Vec<PathBuf>,

    /// Scan throttling.
    #[serde(rename = "library_scan")]
    pub scan: ScanConfig,

    /// Disable every throttling sleep. Used by tests and tools.
    pub fast_scan: bool,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            roots: Vec::new(),
            scan: ScanConfig::default(),
            fast_scan: false,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Create a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a JSON file.
    ///
    /// Missing keys keep their default values. Durations are written the
    /// human way, e.g. `"1s"` or `"15ms"`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            Error::config(format!("invalid config file '{}': {e}", path.display()))
        })
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.roots.is_empty() {
            return Err(Error::config("no library roots configured"));
        }

        for (i, root) in self.roots.iter().enumerate() {
            if root.as_os_str().is_empty() {
                return Err(Error::config("library root cannot be empty"));
            }
            if self.roots[..i].contains(root) {
                return Err(Error::config(format!(
                    "library root '{}' listed twice",
                    root.display()
                )));
            }
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(Error::config(format!(
                "invalid log level '{}', must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }

        Ok(())
    }

    /// Get the path to the `SQLite` database file.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("library.db")
    }
}

fn de_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
}

/// Serialize a duration the way config files spell them, e.g. `"1s 500ms"`.
pub(crate) fn ser_duration<S>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(&humantime::format_duration(*duration))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn with_root() -> Config {
        Config {
            roots: vec![PathBuf::from("/srv/music")],
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.roots.is_empty());
        assert!(!config.fast_scan);
        assert_eq!(config.scan.files_per_operation, 1500);
        assert_eq!(config.scan.sleep_per_operation, Duration::from_millis(15));
    }

    #[test]
    fn test_validate_requires_roots() {
        let err = Config::new().validate().unwrap_err();
        assert!(err.to_string().contains("roots"));
        assert!(with_root().validate().is_ok());
    }

    #[test]
    fn test_validate_duplicate_root() {
        let mut config = with_root();
        config.roots.push(PathBuf::from("/srv/music"));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("twice"));
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let config = Config {
            log_level: "loud".to_string(),
            ..with_root()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log level"));
    }

    #[test]
    fn test_log_level_case_insensitive() {
        for level in ["TRACE", "Debug", "INFO", "Warn", "ERROR"] {
            let config = Config {
                log_level: level.to_string(),
                ..with_root()
            };
            assert!(config.validate().is_ok(), "Level '{level}' should be valid");
        }
    }

    #[test]
    fn test_database_path() {
        let config = Config {
            data_dir: PathBuf::from("/var/lib/medialib"),
            ..Default::default()
        };
        assert_eq!(
            config.database_path(),
            PathBuf::from("/var/lib/medialib/library.db")
        );
    }

    #[test]
    fn test_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "libraries": ["/srv/music", "/home/me/Music"],
                "library_scan": {
                    "initial_wait_duration": "2s",
                    "files_per_operation": 100,
                    "sleep_after_operation": "50ms"
                }
            }"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.roots.len(), 2);
        assert_eq!(config.scan.initial_wait, Duration::from_secs(2));
        assert_eq!(config.scan.files_per_operation, 100);
        assert_eq!(config.scan.sleep_per_operation, Duration::from_millis(50));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_from_file_bad_duration() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"library_scan": {"initial_wait_duration": "soon"}}"#,
        )
        .unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("invalid config file"));
    }
}
