// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::model::{Episode, Feed, PackedTime};

/// Serializable form of a feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedRecord {
    pub url: String,
    pub title: String,
    pub description: String,
    pub valid: bool,
    /// Absent in databases written before subscriptions existed
    #[serde(default)]
    pub subscribed: bool,
    pub episodes: Vec<EpisodeRecord>,
}

/// Serializable form of an episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub url: String,
    pub title: String,
    pub description: String,
    pub media: Vec<String>,
    #[serde(default)]
    pub dtg_published: Option<PackedTime>,
    pub downloaded: bool,
    pub is_new: bool,
}

impl FeedRecord {
    /// Create a record from a registered Feed
    pub fn from_feed(feed: &Feed) -> Self {
        Self {
            url: feed.url.clone(),
            title: feed.title.clone(),
            description: feed.description.clone(),
            valid: feed.valid,
            subscribed: feed.subscribed,
            episodes: feed.episodes.iter().map(EpisodeRecord::from_episode).collect(),
        }
    }

    pub fn into_feed(self) -> Feed {
        Feed {
            url: self.url,
            title: self.title,
            description: self.description,
            episodes: self
                .episodes
                .into_iter()
                .map(EpisodeRecord::into_episode)
                .collect(),
            valid: self.valid,
            subscribed: self.subscribed,
        }
    }
}

impl EpisodeRecord {
    pub fn from_episode(episode: &Episode) -> Self {
        Self {
            url: episode.url.clone(),
            title: episode.title.clone(),
            description: episode.description.clone(),
            media: episode.media_urls.clone(),
            dtg_published: episode.published,
            downloaded: episode.downloaded,
            is_new: episode.is_new(),
        }
    }

    pub fn into_episode(self) -> Episode {
        Episode::new(
            self.url,
            self.title,
            self.description,
            self.dtg_published,
            self.media,
        )
        .with_flags(self.downloaded, self.is_new)
    }
}

/// Write the valid feeds to a JSON file, returning how many were written
pub fn write_json(path: &Path, feeds: &[Feed]) -> Result<usize, StorageError> {
    let records: Vec<FeedRecord> = feeds
        .iter()
        .filter(|feed| feed.valid)
        .map(FeedRecord::from_feed)
        .collect();

    if let Some(parent) = path.parent() {
        super::ensure_dir(parent)?;
    }

    let json = serde_json::to_string_pretty(&records)?;
    super::replace_file(path, json.as_bytes())?;

    Ok(records.len())
}

/// Read feeds from a JSON file
pub fn read_json(path: &Path) -> Result<Vec<Feed>, StorageError> {
    let content = std::fs::read_to_string(path).map_err(|e| StorageError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let records: Vec<FeedRecord> =
        serde_json::from_str(&content).map_err(|e| StorageError::JsonParseFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(records.into_iter().map(FeedRecord::into_feed).collect())
}
