// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::error::{PlayerError, RegistryError, SessionError, StorageError, TrackerError};
use crate::events::{ButtonState, SharedEventReporter, UiEvent};
use crate::feed::FeedSource;
use crate::model::{Episode, Feed};
use crate::player::{Player, PlayerState, Position};
use crate::registry::Registry;
use crate::tracker::{Navigation, Tracker};

/// Everything a front end talks to: the feed registry, the playback
/// selection and the audio player.
///
/// Each user intent maps to one method. Degraded outcomes that are not
/// errors (a feed that failed to fetch, the end of a playlist) are reported
/// to the front end as notices.
pub struct Session<P> {
    registry: Registry,
    tracker: Tracker,
    player: P,
    reporter: SharedEventReporter,
}

impl<P: Player> Session<P> {
    pub fn new(registry: Registry, player: P, reporter: SharedEventReporter) -> Self {
        Self {
            registry,
            tracker: Tracker::new(),
            player,
            reporter,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    pub fn feeds(&self) -> &[Feed] {
        self.registry.feeds()
    }

    pub fn episodes(&self, feed_index: usize) -> Option<&[Episode]> {
        self.registry
            .feed(feed_index)
            .map(|feed| feed.episodes.as_slice())
    }

    /// The currently selected episode, if any
    pub fn active_episode(&self) -> Option<&Episode> {
        let feed = self.tracker.active_feed()?;
        let episode = self.tracker.active_episode()?;
        self.registry.feed(feed)?.episodes.get(episode)
    }

    /// Start over with an empty database at the default location
    pub fn new_database(&mut self) {
        info!("starting a new database");
        self.player.stop();
        self.tracker.clear();
        self.registry.clear();
        self.refresh_all();
    }

    /// Replace the registry with the database at `path`.
    ///
    /// On failure the registry is left empty. Either way playback is stopped
    /// and nothing is selected afterwards.
    pub fn load(&mut self, path: impl Into<PathBuf>) -> Result<usize, StorageError> {
        self.player.stop();
        self.tracker.clear();
        let result = self.registry.load(path);
        self.refresh_all();
        result
    }

    /// Load the database at the registry's active location
    pub fn load_current(&mut self) -> Result<usize, StorageError> {
        let path = self.registry.path().to_path_buf();
        self.load(path)
    }

    pub fn save(&self) -> Result<usize, StorageError> {
        self.registry.save()
    }

    pub fn save_as(&mut self, path: impl Into<PathBuf>) -> Result<usize, StorageError> {
        self.registry.save_as(path)
    }

    /// Fetch and register a feed, returning its index.
    ///
    /// A feed that cannot be fetched is still registered, marked invalid, and
    /// the reason is reported as a notice.
    pub async fn register<S>(&mut self, source: &S, url: &str) -> Result<usize, RegistryError>
    where
        S: FeedSource + ?Sized,
    {
        let registration = self.registry.register(source, url).await?;

        if let Some(error) = registration.error {
            self.notice(format!("Failed to parse feed {url}: {error}"));
        }

        self.reporter.report(UiEvent::FeedListChanged);
        self.report_buttons();
        Ok(registration.index)
    }

    /// Delete every feed registered under `url`, returning how many went.
    ///
    /// Deleting the active feed stops playback and clears the selection.
    pub fn delete(&mut self, url: &str) -> usize {
        let removed = self.registry.delete(url);

        if self.tracker.feeds_removed(&removed) {
            info!(url, "active feed deleted, stopping playback");
            self.player.stop();
            self.reporter
                .report(UiEvent::EpisodeListChanged { feed_index: None });
        }

        if !removed.is_empty() {
            self.reporter.report(UiEvent::FeedListChanged);
        }
        self.report_buttons();
        removed.len()
    }

    pub fn subscribe(&mut self, url: &str) -> bool {
        let found = self.registry.subscribe(url);
        self.subscription_changed(url, found)
    }

    pub fn unsubscribe(&mut self, url: &str) -> bool {
        let found = self.registry.unsubscribe(url);
        self.subscription_changed(url, found)
    }

    fn subscription_changed(&self, url: &str, found: bool) -> bool {
        if found {
            self.reporter.report(UiEvent::FeedListChanged);
        } else {
            self.notice(format!("Feed not recognized: {url}"));
        }
        found
    }

    /// Show a feed's episodes: playback stops and no episode is selected
    pub fn select_feed(&mut self, feed_index: usize) -> Result<(), TrackerError> {
        self.player.stop();
        self.tracker
            .set(&mut self.registry, &mut self.player, Some(feed_index), None)?;

        self.reporter.report(UiEvent::EpisodeListChanged {
            feed_index: Some(feed_index),
        });
        self.report_buttons();
        Ok(())
    }

    /// Select an episode of the active feed and start playing it
    pub fn select_episode(&mut self, episode_index: usize) -> Result<(), SessionError> {
        let feed_index = self
            .tracker
            .active_feed()
            .ok_or(TrackerError::NoActiveFeed)?;

        self.play_episode(feed_index, episode_index)
    }

    /// Select any episode of any feed and start playing it
    pub fn play_episode(
        &mut self,
        feed_index: usize,
        episode_index: usize,
    ) -> Result<(), SessionError> {
        let selected = self.tracker.set(
            &mut self.registry,
            &mut self.player,
            Some(feed_index),
            Some(episode_index),
        );

        if let Err(e) = selected {
            // The selection stands even when there is nothing to play
            if matches!(e, TrackerError::NoMedia { .. }) {
                self.reporter.report(UiEvent::EpisodeListChanged {
                    feed_index: Some(feed_index),
                });
                self.report_buttons();
            }
            return Err(e.into());
        }
        let played = self.player.play_pause();

        self.reporter.report(UiEvent::EpisodeListChanged {
            feed_index: Some(feed_index),
        });
        self.report_buttons();
        played.map_err(SessionError::from)
    }

    /// Toggle playback of the selected episode
    pub fn play_pause(&mut self) -> Result<(), SessionError> {
        if self.tracker.active_episode().is_none() {
            return Err(TrackerError::NoActiveEpisode.into());
        }

        let result = self.player.play_pause();
        self.report_buttons();
        result.map_err(SessionError::from)
    }

    /// Stop playback, keeping the feed selected
    pub fn stop(&mut self) -> Result<(), TrackerError> {
        let result = self.tracker.stop(&mut self.registry, &mut self.player);
        self.reporter.report(UiEvent::EpisodeListChanged {
            feed_index: self.tracker.active_feed(),
        });
        self.report_buttons();
        result
    }

    pub fn next(&mut self) -> Result<Navigation, TrackerError> {
        let navigation = self.tracker.next(&mut self.registry, &mut self.player);
        self.navigated(navigation)
    }

    pub fn prev(&mut self) -> Result<Navigation, TrackerError> {
        let navigation = self.tracker.prev(&mut self.registry, &mut self.player);
        self.navigated(navigation)
    }

    fn navigated(
        &self,
        navigation: Result<Navigation, TrackerError>,
    ) -> Result<Navigation, TrackerError> {
        match &navigation {
            Ok(Navigation::EndOfPlaylist) => {
                self.notice("Already at the end of the current playlist.".to_string());
            }
            Ok(Navigation::StartOfPlaylist) => {
                self.notice("Already at the beginning of the current playlist.".to_string());
            }
            Ok(Navigation::Moved(_)) => {
                self.reporter.report(UiEvent::EpisodeListChanged {
                    feed_index: self.tracker.active_feed(),
                });
            }
            Err(e) => warn!(error = %e, "navigation failed"),
        }

        self.report_buttons();
        navigation
    }

    pub fn ffwd(&mut self) -> Result<(), PlayerError> {
        self.player.ffwd()?;
        self.poll_position();
        Ok(())
    }

    pub fn rwnd(&mut self) -> Result<(), PlayerError> {
        self.player.rwnd()?;
        self.poll_position();
        Ok(())
    }

    pub fn seek(&mut self, seconds: f64) -> Result<(), PlayerError> {
        self.player.set_position(seconds)?;
        self.poll_position();
        Ok(())
    }

    /// Read the player position and report it for the time display
    pub fn poll_position(&self) -> Position {
        let position = self.player.position();
        self.reporter.report(UiEvent::TimeScale {
            duration: position.duration,
            position: position.position,
        });
        position
    }

    pub fn button_state(&self) -> ButtonState {
        if self.tracker.active_feed().is_none() {
            return ButtonState::Dead;
        }
        if self.tracker.active_episode().is_none() {
            return ButtonState::Null;
        }

        match self.player.state() {
            PlayerState::Null => ButtonState::Null,
            PlayerState::Ready => ButtonState::Ready,
            PlayerState::Paused => ButtonState::Paused,
            PlayerState::Playing => ButtonState::Playing,
        }
    }

    /// Deselect everything and release the player
    pub fn shutdown(&mut self) {
        info!("shutting down playback");
        self.tracker.null(&mut self.player);
        self.report_buttons();
    }

    fn notice(&self, message: String) {
        info!(%message, "notice");
        self.reporter.report(UiEvent::Notice { message });
    }

    fn report_buttons(&self) {
        self.reporter.report(UiEvent::PlayerButtons {
            state: self.button_state(),
        });
    }

    fn refresh_all(&self) {
        self.reporter.report(UiEvent::FeedListChanged);
        self.reporter
            .report(UiEvent::EpisodeListChanged { feed_index: None });
        self.report_buttons();
    }
}
