// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::Episode;
use crate::feed::FetchedFeed;

/// A registered podcast feed and its episodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    /// Source URL, unique within a registry
    pub url: String,
    pub title: String,
    pub description: String,
    /// Oldest first
    pub episodes: Vec<Episode>,
    /// False when the feed could not be fetched or parsed
    pub valid: bool,
    pub subscribed: bool,
}

impl Feed {
    /// Build a feed from a successful fetch.
    ///
    /// Sources list their newest entry first, so the entries are reversed once
    /// here: index 0 is the oldest episode and "next" moves forward in time.
    pub fn from_fetched(url: impl Into<String>, fetched: FetchedFeed) -> Self {
        let episodes = fetched
            .entries
            .into_iter()
            .rev()
            .map(Episode::from_entry)
            .collect();

        Self {
            url: url.into(),
            title: fetched.title,
            description: fetched.description,
            episodes,
            valid: true,
            subscribed: false,
        }
    }

    /// Placeholder for a feed whose fetch failed
    pub fn invalid(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            title: url.clone(),
            url,
            description: String::new(),
            episodes: Vec::new(),
            valid: false,
            subscribed: false,
        }
    }

    pub fn new_episode_count(&self) -> usize {
        self.episodes.iter().filter(|e| e.is_new()).count()
    }
}
