// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::PackedTime;
use crate::feed::FetchedEntry;

/// A single episode of a registered feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Episode {
    /// Link to the episode's web page
    pub url: String,
    pub title: String,
    pub description: String,
    pub published: Option<PackedTime>,
    /// Playable media, in feed order. Playback always uses the first one.
    pub media_urls: Vec<String>,
    pub downloaded: bool,
    is_new: bool,
}

impl Episode {
    /// Create a fresh, not yet downloaded, unplayed episode
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        published: Option<PackedTime>,
        media_urls: Vec<String>,
    ) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            description: description.into(),
            published,
            media_urls,
            downloaded: false,
            is_new: true,
        }
    }

    /// Build an episode from a freshly fetched feed entry
    pub fn from_entry(entry: FetchedEntry) -> Self {
        Self::new(
            entry.link,
            entry.title,
            entry.description,
            entry.published,
            entry.media_urls,
        )
    }

    /// Reapply persisted flags to an episode rebuilt from storage
    pub(crate) fn with_flags(mut self, downloaded: bool, is_new: bool) -> Self {
        self.downloaded = downloaded;
        self.is_new = is_new;
        self
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Mark the episode as played. There is no way back to "new".
    pub fn mark_old(&mut self) {
        self.is_new = false;
    }

    /// The media URL handed to the player
    pub fn playback_url(&self) -> Option<&str> {
        self.media_urls.first().map(String::as_str)
    }
}
