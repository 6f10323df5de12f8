// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use tracing::{debug, info};

use crate::error::TrackerError;
use crate::player::Player;
use crate::registry::Registry;

/// Result of stepping through a feed's episodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Now playing the episode at this index
    Moved(usize),
    /// Already at the last episode, nothing changed
    EndOfPlaylist,
    /// Already at the first episode, nothing changed
    StartOfPlaylist,
}

/// Which feed and episode are selected for playback.
///
/// An episode is only ever selected together with a feed, and both indices
/// are checked against the registry before they are committed. A failed
/// operation leaves the selection as it was.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tracker {
    feed: Option<usize>,
    episode: Option<usize>,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_feed(&self) -> Option<usize> {
        self.feed
    }

    pub fn active_episode(&self) -> Option<usize> {
        self.episode
    }

    pub fn is_idle(&self) -> bool {
        self.feed.is_none()
    }

    /// Deselect everything without touching the player
    pub fn clear(&mut self) {
        self.feed = None;
        self.episode = None;
    }

    /// Select a feed and optionally one of its episodes, then load the
    /// episode into the player.
    ///
    /// `feed = None` deselects everything regardless of `episode`. Selecting a
    /// new episode marks it old.
    pub fn set<P: Player + ?Sized>(
        &mut self,
        registry: &mut Registry,
        player: &mut P,
        feed: Option<usize>,
        episode: Option<usize>,
    ) -> Result<(), TrackerError> {
        let Some(feed) = feed else {
            debug!("deselecting feed and episode");
            self.clear();
            return Ok(());
        };

        let episode_count = registry
            .feed(feed)
            .ok_or(TrackerError::FeedIndexOutOfRange {
                index: feed,
                len: registry.len(),
            })?
            .episodes
            .len();

        if let Some(index) = episode
            && index >= episode_count
        {
            return Err(TrackerError::EpisodeIndexOutOfRange {
                index,
                len: episode_count,
            });
        }

        debug!(feed, episode, "selection committed");
        self.feed = Some(feed);
        self.episode = episode;

        if let Some(index) = episode
            && registry.is_new(feed, index)
        {
            registry.mark_old(feed, index);
        }

        self.resolve_playback_target(registry, player)
    }

    /// Stop the player and load the selected episode's first media URL.
    ///
    /// With no episode selected the player is left stopped and empty.
    pub fn resolve_playback_target<P: Player + ?Sized>(
        &self,
        registry: &Registry,
        player: &mut P,
    ) -> Result<(), TrackerError> {
        player.stop();

        let (Some(feed), Some(episode)) = (self.feed, self.episode) else {
            return Ok(());
        };

        let url = registry
            .feed(feed)
            .and_then(|f| f.episodes.get(episode))
            .and_then(|e| e.playback_url())
            .ok_or(TrackerError::NoMedia { feed, episode })?;

        player.set(url);
        Ok(())
    }

    /// Advance to the following episode of the active feed and play it
    pub fn next<P: Player + ?Sized>(
        &mut self,
        registry: &mut Registry,
        player: &mut P,
    ) -> Result<Navigation, TrackerError> {
        let (feed, episode) = self.require_selection()?;
        let count = registry.feed(feed).map_or(0, |f| f.episodes.len());

        if episode + 1 >= count {
            info!(feed, episode, "already at the end of the playlist");
            return Ok(Navigation::EndOfPlaylist);
        }

        self.step_to(registry, player, feed, episode + 1)
    }

    /// Go back to the preceding episode of the active feed and play it
    pub fn prev<P: Player + ?Sized>(
        &mut self,
        registry: &mut Registry,
        player: &mut P,
    ) -> Result<Navigation, TrackerError> {
        let (feed, episode) = self.require_selection()?;

        if episode == 0 {
            info!(feed, "already at the start of the playlist");
            return Ok(Navigation::StartOfPlaylist);
        }

        self.step_to(registry, player, feed, episode - 1)
    }

    /// Stop playback and deselect the episode, keeping the feed
    pub fn stop<P: Player + ?Sized>(
        &mut self,
        registry: &mut Registry,
        player: &mut P,
    ) -> Result<(), TrackerError> {
        player.stop();
        self.set(registry, player, self.feed, None)
    }

    /// Deselect everything and release the player
    pub fn null<P: Player + ?Sized>(&mut self, player: &mut P) {
        self.clear();
        player.null();
    }

    /// Keep the selection pointing at the same feed after the feeds at
    /// `removed` (ascending, pre-removal positions) were deleted.
    ///
    /// Returns true when the active feed itself was removed, in which case
    /// the tracker is now idle.
    pub fn feeds_removed(&mut self, removed: &[usize]) -> bool {
        let Some(feed) = self.feed else {
            return false;
        };

        if removed.contains(&feed) {
            self.clear();
            return true;
        }

        let shift = removed.iter().filter(|&&index| index < feed).count();
        self.feed = Some(feed - shift);
        false
    }

    fn require_selection(&self) -> Result<(usize, usize), TrackerError> {
        let feed = self.feed.ok_or(TrackerError::NoActiveFeed)?;
        let episode = self.episode.ok_or(TrackerError::NoActiveEpisode)?;
        Ok((feed, episode))
    }

    fn step_to<P: Player + ?Sized>(
        &mut self,
        registry: &mut Registry,
        player: &mut P,
        feed: usize,
        episode: usize,
    ) -> Result<Navigation, TrackerError> {
        self.set(registry, player, Some(feed), Some(episode))?;
        player.play()?;
        Ok(Navigation::Moved(episode))
    }
}
