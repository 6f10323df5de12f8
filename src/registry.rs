// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{FeedError, RegistryError, StorageError};
use crate::feed::FeedSource;
use crate::model::Feed;
use crate::storage::{StorageFormat, load_feeds, save_feeds};

/// Outcome of a registration that got as far as fetching
#[derive(Debug)]
pub struct Registration {
    /// Position of the new feed in the registry
    pub index: usize,
    /// Why the feed was stored as invalid, if it was
    pub error: Option<FeedError>,
}

/// The collection of known feeds and where it is stored.
///
/// Feeds are looked up by a linear scan on their URL.
#[derive(Debug, Clone)]
pub struct Registry {
    feeds: Vec<Feed>,
    default_path: PathBuf,
    path: PathBuf,
    format: StorageFormat,
}

impl Registry {
    /// Create an empty registry stored at `default_path`
    pub fn new(default_path: impl Into<PathBuf>, format: StorageFormat) -> Self {
        let default_path = default_path.into();
        Self {
            feeds: Vec::new(),
            path: default_path.clone(),
            default_path,
            format,
        }
    }

    pub fn feeds(&self) -> &[Feed] {
        &self.feeds
    }

    pub fn feed(&self, index: usize) -> Option<&Feed> {
        self.feeds.get(index)
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.feeds.iter().any(|feed| feed.url == url)
    }

    /// Index of the first feed registered under `url`
    pub fn position(&self, url: &str) -> Option<usize> {
        self.feeds.iter().position(|feed| feed.url == url)
    }

    /// Fetch `url` and append the result.
    ///
    /// An already registered URL is refused before anything is fetched. A
    /// failed fetch still registers the feed, marked invalid, and the cause is
    /// handed back in the [`Registration`].
    pub async fn register<S>(&mut self, source: &S, url: &str) -> Result<Registration, RegistryError>
    where
        S: FeedSource + ?Sized,
    {
        if self.contains(url) {
            info!(url, "feed already registered");
            return Err(RegistryError::AlreadyRegistered {
                url: url.to_string(),
            });
        }

        let (feed, error) = match source.fetch(url).await {
            Ok(fetched) => (Feed::from_fetched(url, fetched), None),
            Err(e) => {
                warn!(url, error = %e, "failed to fetch feed, registering it as invalid");
                (Feed::invalid(url), Some(e))
            }
        };

        info!(
            url,
            valid = feed.valid,
            episodes = feed.episodes.len(),
            "registered feed"
        );
        self.feeds.push(feed);

        Ok(Registration {
            index: self.feeds.len() - 1,
            error,
        })
    }

    /// Remove every feed registered under `url`.
    ///
    /// Returns the positions the removed feeds occupied, in ascending order.
    pub fn delete(&mut self, url: &str) -> Vec<usize> {
        let removed: Vec<usize> = self
            .feeds
            .iter()
            .enumerate()
            .filter(|(_, feed)| feed.url == url)
            .map(|(index, _)| index)
            .collect();

        self.feeds.retain(|feed| feed.url != url);

        if removed.is_empty() {
            warn!(url, "no feed to delete");
        } else {
            info!(url, count = removed.len(), "deleted feed");
        }
        removed
    }

    pub fn subscribe(&mut self, url: &str) -> bool {
        self.set_subscribed(url, true)
    }

    pub fn unsubscribe(&mut self, url: &str) -> bool {
        self.set_subscribed(url, false)
    }

    fn set_subscribed(&mut self, url: &str, subscribed: bool) -> bool {
        let mut found = false;
        for feed in self.feeds.iter_mut().filter(|feed| feed.url == url) {
            feed.subscribed = subscribed;
            found = true;
        }

        if found {
            debug!(url, subscribed, "subscription changed");
        } else {
            warn!(url, subscribed, "no feed to change subscription on");
        }
        found
    }

    /// Whether the addressed episode is unplayed. Unknown episodes are not new.
    pub fn is_new(&self, feed: usize, episode: usize) -> bool {
        self.feeds
            .get(feed)
            .and_then(|f| f.episodes.get(episode))
            .is_some_and(|e| e.is_new())
    }

    /// Mark the addressed episode as played
    pub fn mark_old(&mut self, feed: usize, episode: usize) {
        if let Some(e) = self
            .feeds
            .get_mut(feed)
            .and_then(|f| f.episodes.get_mut(episode))
        {
            debug!(feed, episode, "marking episode old");
            e.mark_old();
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn default_path(&self) -> &Path {
        &self.default_path
    }

    pub fn format(&self) -> StorageFormat {
        self.format
    }

    pub fn set_format(&mut self, format: StorageFormat) {
        self.format = format;
    }

    /// Forget every feed and go back to the default location
    pub fn clear(&mut self) {
        self.feeds.clear();
        self.path = self.default_path.clone();
    }

    /// Replace the feeds with the contents of `path`, which becomes the active
    /// location. When loading fails the registry is left empty.
    pub fn load(&mut self, path: impl Into<PathBuf>) -> Result<usize, StorageError> {
        self.path = path.into();
        match load_feeds(&self.path, self.format) {
            Ok(feeds) => {
                self.feeds = feeds;
                Ok(self.feeds.len())
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to load database");
                self.feeds.clear();
                Err(e)
            }
        }
    }

    /// Write the valid feeds to the active location
    pub fn save(&self) -> Result<usize, StorageError> {
        save_feeds(&self.path, self.format, &self.feeds).inspect_err(|e| {
            warn!(path = %self.path.display(), error = %e, "failed to save database");
        })
    }

    /// Make `path` the active location and save there
    pub fn save_as(&mut self, path: impl Into<PathBuf>) -> Result<usize, StorageError> {
        self.path = path.into();
        self.save()
    }

    /// Add an already built feed, bypassing the uniqueness check
    #[cfg(test)]
    pub(crate) fn push(&mut self, feed: Feed) {
        self.feeds.push(feed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tempfile::tempdir;

    use crate::feed::{FetchedEntry, FetchedFeed};
    use crate::model::Episode;

    /// Serves a two-episode feed for every URL containing "feed", fails otherwise
    #[derive(Default)]
    struct MockSource {
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl FeedSource for MockSource {
        async fn fetch(&self, url: &str) -> Result<FetchedFeed, FeedError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if !url.contains("feed") {
                return Err(FeedError::HttpStatus {
                    url: url.to_string(),
                    status: 404,
                });
            }

            let entry = |n: u32| FetchedEntry {
                link: format!("{url}/ep{n}"),
                title: format!("Episode {n}"),
                description: String::new(),
                published: None,
                media_urls: vec![format!("{url}/ep{n}.mp3")],
            };

            Ok(FetchedFeed {
                title: format!("Feed at {url}"),
                description: String::new(),
                entries: vec![entry(2), entry(1)],
            })
        }
    }

    fn registry() -> Registry {
        Registry::new("data/podblast_db", StorageFormat::Json)
    }

    fn placeholder(url: &str) -> Feed {
        let mut feed = Feed::invalid(url);
        feed.valid = true;
        feed.episodes.push(Episode::new(url, "Episode", "", None, vec![]));
        feed
    }

    #[tokio::test]
    async fn register_appends_fetched_feed_oldest_first() {
        let source = MockSource::default();
        let mut registry = registry();

        let registration = registry
            .register(&source, "https://example.com/feed")
            .await
            .unwrap();

        assert_eq!(registration.index, 0);
        assert!(registration.error.is_none());
        let feed = registry.feed(0).unwrap();
        assert!(feed.valid);
        assert_eq!(feed.episodes[0].title, "Episode 1");
        assert_eq!(feed.episodes[1].title, "Episode 2");
        assert!(feed.episodes.iter().all(|e| e.is_new() && !e.downloaded));
    }

    #[tokio::test]
    async fn register_refuses_duplicates_without_fetching() {
        let source = MockSource::default();
        let mut registry = registry();
        registry
            .register(&source, "https://example.com/feed")
            .await
            .unwrap();
        let before = registry.feeds().to_vec();

        let result = registry.register(&source, "https://example.com/feed").await;

        assert_eq!(
            result.unwrap_err(),
            RegistryError::AlreadyRegistered {
                url: "https://example.com/feed".to_string()
            }
        );
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(registry.feeds(), before.as_slice());
    }

    #[tokio::test]
    async fn register_keeps_urls_unique() {
        let source = MockSource::default();
        let mut registry = registry();

        for url in [
            "https://a.example.com/feed",
            "https://b.example.com/feed",
            "https://a.example.com/feed",
            "https://broken.example.com/",
            "https://broken.example.com/",
            "https://b.example.com/feed",
        ] {
            let _ = registry.register(&source, url).await;
        }

        let urls: HashSet<_> = registry.feeds().iter().map(|f| f.url.as_str()).collect();
        assert_eq!(registry.len(), 3);
        assert_eq!(urls.len(), 3);
    }

    #[tokio::test]
    async fn failed_fetch_registers_an_invalid_feed() {
        let source = MockSource::default();
        let mut registry = registry();

        let registration = registry
            .register(&source, "https://broken.example.com/")
            .await
            .unwrap();

        assert!(registration.error.is_some());
        assert!(!registry.feed(0).unwrap().valid);
    }

    #[test]
    fn delete_removes_every_match() {
        let mut registry = registry();
        registry.push(placeholder("https://a.example.com/feed"));
        registry.push(placeholder("https://b.example.com/feed"));
        registry.push(placeholder("https://a.example.com/feed"));

        let removed = registry.delete("https://a.example.com/feed");

        assert_eq!(removed, vec![0, 2]);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.feeds()[0].url, "https://b.example.com/feed");
        assert!(registry.delete("https://a.example.com/feed").is_empty());
    }

    #[test]
    fn subscription_toggles_without_deleting() {
        let mut registry = registry();
        registry.push(placeholder("https://a.example.com/feed"));

        assert!(registry.subscribe("https://a.example.com/feed"));
        assert!(registry.feeds()[0].subscribed);

        assert!(registry.unsubscribe("https://a.example.com/feed"));
        assert!(!registry.feeds()[0].subscribed);
        assert_eq!(registry.len(), 1);

        assert!(!registry.subscribe("https://unknown.example.com/feed"));
        assert!(!registry.unsubscribe("https://unknown.example.com/feed"));
    }

    #[test]
    fn mark_old_flips_is_new_once() {
        let mut registry = registry();
        registry.push(placeholder("https://a.example.com/feed"));

        assert!(registry.is_new(0, 0));
        registry.mark_old(0, 0);
        assert!(!registry.is_new(0, 0));

        // Out of range addresses are ignored
        registry.mark_old(3, 0);
        registry.mark_old(0, 3);
        assert!(!registry.is_new(3, 0));
    }

    #[test]
    fn save_and_load_keep_only_valid_feeds() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("podblast_db");

        let mut registry = registry();
        registry.push(placeholder("https://good.example.com/feed"));
        registry.push(Feed::invalid("https://bad.example.com/feed"));

        assert_eq!(registry.save_as(&path).unwrap(), 1);
        assert_eq!(registry.path(), path.as_path());

        let mut reloaded = Registry::new(&path, StorageFormat::Json);
        assert_eq!(reloaded.load(&path).unwrap(), 1);
        assert_eq!(reloaded.feeds()[0].url, "https://good.example.com/feed");
    }

    #[test]
    fn failed_load_leaves_registry_empty() {
        let dir = tempdir().unwrap();
        let mut registry = registry();
        registry.push(placeholder("https://a.example.com/feed"));

        let result = registry.load(dir.path().join("missing"));

        assert!(result.is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn failed_save_leaves_previous_file_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("podblast_db");
        std::fs::write(&path, "previous").unwrap();
        // Occupy the staging name so the write cannot complete
        std::fs::create_dir(dir.path().join("podblast_db.part")).unwrap();

        let mut registry = Registry::new(&path, StorageFormat::Json);
        registry.push(placeholder("https://a.example.com/feed"));
        let result = registry.save();

        assert!(matches!(result, Err(StorageError::WriteFailed { .. })));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "previous");
    }

    #[test]
    fn save_replaces_previous_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("podblast_db");
        std::fs::write(&path, "previous").unwrap();

        let mut registry = Registry::new(&path, StorageFormat::Json);
        registry.push(placeholder("https://a.example.com/feed"));
        registry.save().unwrap();

        assert!(std::fs::read_to_string(&path).unwrap().starts_with('['));
        assert!(!dir.path().join("podblast_db.part").exists());
    }

    #[test]
    fn clear_restores_default_path() {
        let dir = tempdir().unwrap();
        let mut registry = registry();
        registry.push(placeholder("https://a.example.com/feed"));
        registry.save_as(dir.path().join("elsewhere")).unwrap();
        assert_ne!(registry.path(), registry.default_path());

        registry.clear();

        assert!(registry.is_empty());
        assert_eq!(registry.path(), Path::new("data/podblast_db"));
        assert_eq!(registry.path(), registry.default_path());
    }
}
