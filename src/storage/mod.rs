// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod csv;
mod json;

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::StorageError;
use crate::model::Feed;

pub use self::csv::{EPISODES_FILENAME, FEEDS_FILENAME, MEDIA_FILENAME, read_csv, write_csv};
pub use self::json::{EpisodeRecord, FeedRecord, read_json, write_json};

/// Location used when no other database path has been chosen
pub const DEFAULT_DATABASE_PATH: &str = "data/podblast_db";

/// On-disk representation of the feed database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageFormat {
    /// A single JSON document holding every feed
    #[default]
    Json,
    /// A directory with feeds, episodes and media tables
    Csv,
}

impl fmt::Display for StorageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageFormat::Json => f.write_str("json"),
            StorageFormat::Csv => f.write_str("csv"),
        }
    }
}

/// Write every valid feed to `path`. Invalid feeds are dropped silently.
///
/// Returns the number of feeds written.
pub fn save_feeds(path: &Path, format: StorageFormat, feeds: &[Feed]) -> Result<usize, StorageError> {
    info!(path = %path.display(), %format, "saving database");

    let saved = match format {
        StorageFormat::Json => write_json(path, feeds)?,
        StorageFormat::Csv => write_csv(path, feeds)?,
    };

    debug!(saved, skipped = feeds.len() - saved, "database saved");
    Ok(saved)
}

/// Rebuild the feed list stored at `path`
pub fn load_feeds(path: &Path, format: StorageFormat) -> Result<Vec<Feed>, StorageError> {
    info!(path = %path.display(), %format, "loading database");

    let feeds = match format {
        StorageFormat::Json => read_json(path)?,
        StorageFormat::Csv => read_csv(path)?,
    };

    debug!(feeds = feeds.len(), "database loaded");
    Ok(feeds)
}

/// Write `contents` to `<path>.part`, then rename it over `path`.
///
/// A failed write leaves whatever was at `path` in place.
fn replace_file(path: &Path, contents: &[u8]) -> Result<(), StorageError> {
    let mut part = path.as_os_str().to_owned();
    part.push(".part");
    let part = PathBuf::from(part);

    if let Err(e) = std::fs::write(&part, contents) {
        let _ = std::fs::remove_file(&part);
        return Err(StorageError::WriteFailed {
            path: part,
            source: e,
        });
    }

    std::fs::rename(&part, path).map_err(|e| {
        let _ = std::fs::remove_file(&part);
        StorageError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

/// Create the directory `path` if it is missing
fn ensure_dir(path: &Path) -> Result<(), StorageError> {
    if path.as_os_str().is_empty() || path.exists() {
        return Ok(());
    }

    std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectoryFailed {
        path: path.to_path_buf(),
        source: e,
    })
}
