// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::StorageError;
use crate::model::{Episode, Feed, PackedTime};

pub const FEEDS_FILENAME: &str = "feeds.csv";
pub const EPISODES_FILENAME: &str = "episodes.csv";
pub const MEDIA_FILENAME: &str = "media.csv";

#[derive(Debug, Serialize, Deserialize)]
struct FeedRow {
    url: String,
    title: String,
    description: String,
    valid: bool,
    subscribed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct EpisodeRow {
    feed_url: String,
    episode_url: String,
    title: String,
    description: String,
    published: Option<String>,
    downloaded: bool,
    is_new: bool,
}

/// Episode links are not unique within a feed, so media rows are keyed by
/// the episode's position in its feed.
#[derive(Debug, Serialize, Deserialize)]
struct MediaRow {
    feed_url: String,
    episode: usize,
    episode_url: String,
    media_url: String,
}

/// Write the valid feeds as three tables inside the directory `dir`.
///
/// Each table is replaced whole, but the three are not replaced together:
/// a failure part way leaves the earlier tables already updated.
///
/// Returns the number of feeds written.
pub fn write_csv(dir: &Path, feeds: &[Feed]) -> Result<usize, StorageError> {
    super::ensure_dir(dir)?;

    let valid: Vec<&Feed> = feeds.iter().filter(|feed| feed.valid).collect();

    let feed_rows = valid.iter().map(|feed| FeedRow {
        url: feed.url.clone(),
        title: feed.title.clone(),
        description: feed.description.clone(),
        valid: feed.valid,
        subscribed: feed.subscribed,
    });
    write_table(&dir.join(FEEDS_FILENAME), feed_rows)?;

    let episode_rows = valid.iter().flat_map(|feed| {
        feed.episodes.iter().map(|episode| EpisodeRow {
            feed_url: feed.url.clone(),
            episode_url: episode.url.clone(),
            title: episode.title.clone(),
            description: episode.description.clone(),
            published: episode.published.map(|t| t.to_string()),
            downloaded: episode.downloaded,
            is_new: episode.is_new(),
        })
    });
    write_table(&dir.join(EPISODES_FILENAME), episode_rows)?;

    let media_rows = valid.iter().flat_map(|feed| {
        feed.episodes.iter().enumerate().flat_map(move |(position, episode)| {
            episode.media_urls.iter().map(move |media| MediaRow {
                feed_url: feed.url.clone(),
                episode: position,
                episode_url: episode.url.clone(),
                media_url: media.clone(),
            })
        })
    });
    write_table(&dir.join(MEDIA_FILENAME), media_rows)?;

    Ok(valid.len())
}

/// Read the three tables inside `dir` and join them back into feeds
pub fn read_csv(dir: &Path) -> Result<Vec<Feed>, StorageError> {
    let feed_rows: Vec<FeedRow> = read_table(&dir.join(FEEDS_FILENAME))?;
    let episode_rows: Vec<EpisodeRow> = read_table(&dir.join(EPISODES_FILENAME))?;
    let media_rows: Vec<MediaRow> = read_table(&dir.join(MEDIA_FILENAME))?;

    let mut media_by_episode: HashMap<(String, usize), Vec<String>> = HashMap::new();
    for row in media_rows {
        media_by_episode
            .entry((row.feed_url, row.episode))
            .or_default()
            .push(row.media_url);
    }

    let episodes_path = dir.join(EPISODES_FILENAME);
    let mut episodes_by_feed: HashMap<String, Vec<Episode>> = HashMap::new();
    for row in episode_rows {
        let published = row
            .published
            .filter(|p| !p.trim().is_empty())
            .map(|p| {
                p.parse::<PackedTime>()
                    .map_err(|e| StorageError::MalformedRecord {
                        path: episodes_path.clone(),
                        reason: e.to_string(),
                    })
            })
            .transpose()?;

        let episodes = episodes_by_feed.entry(row.feed_url.clone()).or_default();
        let media = media_by_episode
            .remove(&(row.feed_url, episodes.len()))
            .unwrap_or_default();

        let episode = Episode::new(row.episode_url, row.title, row.description, published, media)
            .with_flags(row.downloaded, row.is_new);
        episodes.push(episode);
    }

    let feeds: Vec<Feed> = feed_rows
        .into_iter()
        .map(|row| Feed {
            episodes: episodes_by_feed.remove(&row.url).unwrap_or_default(),
            url: row.url,
            title: row.title,
            description: row.description,
            valid: row.valid,
            subscribed: row.subscribed,
        })
        .collect();

    for orphan in episodes_by_feed.keys() {
        warn!(feed_url = %orphan, "ignoring episodes of unknown feed");
    }
    for (feed_url, episode) in media_by_episode.keys() {
        warn!(feed_url = %feed_url, episode, "ignoring media of unknown episode");
    }

    Ok(feeds)
}

fn csv_error(path: &Path) -> impl Fn(::csv::Error) -> StorageError + '_ {
    move |source| StorageError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

fn write_table<T, I>(path: &Path, rows: I) -> Result<(), StorageError>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut writer = ::csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row).map_err(csv_error(path))?;
    }

    let contents = writer
        .into_inner()
        .map_err(|e| StorageError::WriteFailed {
            path: path.to_path_buf(),
            source: e.into_error(),
        })?;
    super::replace_file(path, &contents)
}

fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StorageError> {
    let file = File::open(path).map_err(|e| StorageError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    ::csv::Reader::from_reader(file)
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(csv_error(path))
}
