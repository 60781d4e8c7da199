//! medialib
//!
//! A local music library engine: walks library roots into a relational
//! catalog of tracks, albums and artists, keeps it current from file system
//! change notifications, and answers search and browse queries.
//!
//! ```no_run
//! # async fn demo() -> medialib::Result<()> {
//! let config = medialib::Config::from_file("medialib.json")?;
//! let library = medialib::LocalLibrary::open(&config)?;
//! let report = library.scan().await;
//! println!("{} media files", report.totals().media_files);
//! for hit in library.search("album of tests") {
//!     println!("{} - {}", hit.artist, hit.title);
//! }
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod library;
pub mod metadata;
pub mod observability;
pub mod storage;
pub mod watcher;

pub use config::Config;
pub use error::{Error, Result};
pub use library::{LocalLibrary, ScanReport};
