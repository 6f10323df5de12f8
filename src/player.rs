// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::PlayerError;

/// How far `ffwd` and `rwnd` jump, in seconds
pub const SEEK_STEP_SECONDS: f64 = 30.0;

/// Coarse state reported by an audio engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerState {
    /// Released, nothing loaded
    #[default]
    Null,
    /// Stopped
    Ready,
    Paused,
    Playing,
}

/// Stream length and playback position, in seconds. Zero when unknown.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub duration: f64,
    pub position: f64,
}

/// The audio engine driven by the playback tracker
pub trait Player {
    /// Load a media URL
    fn set(&mut self, url: &str);

    /// Start or resume playback of the loaded URL
    fn play(&mut self) -> Result<(), PlayerError>;

    fn pause(&mut self);

    /// Stop playback and unload the URL
    fn stop(&mut self);

    /// Release the engine, for shutdown
    fn null(&mut self);

    fn state(&self) -> PlayerState;

    fn position(&self) -> Position;

    fn set_position(&mut self, seconds: f64) -> Result<(), PlayerError>;

    /// Pause when playing, play otherwise
    fn play_pause(&mut self) -> Result<(), PlayerError> {
        if self.state() == PlayerState::Playing {
            self.pause();
            Ok(())
        } else {
            self.play()
        }
    }

    fn ffwd(&mut self) -> Result<(), PlayerError> {
        let current = self.position().position;
        self.set_position(current + SEEK_STEP_SECONDS)
    }

    fn rwnd(&mut self) -> Result<(), PlayerError> {
        let current = self.position().position;
        self.set_position((current - SEEK_STEP_SECONDS).max(0.0))
    }
}

/// Lets a front end lend its player to a [`crate::Session`] instead of moving it in
impl<P: Player + ?Sized> Player for &mut P {
    fn set(&mut self, url: &str) {
        (**self).set(url)
    }

    fn play(&mut self) -> Result<(), PlayerError> {
        (**self).play()
    }

    fn pause(&mut self) {
        (**self).pause()
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn null(&mut self) {
        (**self).null()
    }

    fn state(&self) -> PlayerState {
        (**self).state()
    }

    fn position(&self) -> Position {
        (**self).position()
    }

    fn set_position(&mut self, seconds: f64) -> Result<(), PlayerError> {
        (**self).set_position(seconds)
    }
}

/// Plays media by launching an external command with the URL appended,
/// e.g. `mpv --no-video <url>`.
///
/// The process cannot be suspended or sought, so pausing ends it and playing
/// again starts the episode over. Position is wall-clock time since launch.
#[derive(Debug)]
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
    source: Option<String>,
    state: PlayerState,
    child: Option<Child>,
    started: Option<Instant>,
}

impl CommandPlayer {
    /// Parse a whitespace separated command line
    pub fn new(command: &str) -> Result<Self, PlayerError> {
        let mut parts = command.split_whitespace().map(String::from);
        let program = parts.next().ok_or(PlayerError::EmptyCommand)?;

        Ok(Self {
            program,
            args: parts.collect(),
            source: None,
            state: PlayerState::Null,
            child: None,
            started: None,
        })
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Check whether the external process ran to completion.
    ///
    /// A finished process puts the player back into the ready state.
    pub fn is_finished(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return self.state != PlayerState::Playing;
        };

        match child.try_wait() {
            Ok(Some(status)) => {
                debug!(%status, "player command exited");
                self.child = None;
                self.started = None;
                self.state = PlayerState::Ready;
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "failed to poll player command");
                false
            }
        }
    }

    fn kill(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                debug!(error = %e, "player command already gone");
            }
            let _ = child.wait();
        }
        self.started = None;
    }

    fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Player for CommandPlayer {
    fn set(&mut self, url: &str) {
        self.kill();
        self.source = Some(url.to_string());
        info!(url, "stream source set");
    }

    fn play(&mut self) -> Result<(), PlayerError> {
        let source = self.source.clone().ok_or(PlayerError::NoSource)?;
        if self.state == PlayerState::Playing && self.child.is_some() {
            return Ok(());
        }

        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(&source)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| PlayerError::SpawnFailed {
                command: self.command_line(),
                source: e,
            })?;

        debug!(pid = child.id(), url = %source, "player command started");
        self.child = Some(child);
        self.started = Some(Instant::now());
        self.state = PlayerState::Playing;
        Ok(())
    }

    fn pause(&mut self) {
        self.kill();
        self.state = PlayerState::Paused;
    }

    fn stop(&mut self) {
        self.kill();
        self.source = None;
        self.state = PlayerState::Ready;
    }

    fn null(&mut self) {
        self.kill();
        self.source = None;
        self.state = PlayerState::Null;
    }

    fn state(&self) -> PlayerState {
        self.state
    }

    fn position(&self) -> Position {
        let elapsed = self
            .started
            .map(|started| started.elapsed())
            .unwrap_or(Duration::ZERO);

        Position {
            duration: 0.0,
            position: elapsed.as_secs_f64(),
        }
    }

    fn set_position(&mut self, _seconds: f64) -> Result<(), PlayerError> {
        Err(PlayerError::SeekUnsupported)
    }
}

impl Drop for CommandPlayer {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Render a number of seconds as `H:MM:SS`
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };

    format!("{}:{:02}:{:02}", total / 3600, total / 60 % 60, total % 60)
}


#[cfg(test)]
mod tests {
    use super::mock::RecordingPlayer;
    use super::*;

    #[test]
    fn play_pause_toggles_on_reported_state() {
        let mut player = RecordingPlayer::new();
        player.set("https://example.com/ep1.mp3");

        player.play_pause().unwrap();
        assert_eq!(player.state(), PlayerState::Playing);

        player.play_pause().unwrap();
        assert_eq!(player.state(), PlayerState::Paused);

        player.play_pause().unwrap();
        assert_eq!(player.state(), PlayerState::Playing);
    }

    #[test]
    fn seeking_moves_thirty_seconds_and_stops_at_zero() {
        let mut player = RecordingPlayer::new();
        player.position = Position {
            duration: 600.0,
            position: 45.0,
        };

        player.ffwd().unwrap();
        assert_eq!(player.position().position, 75.0);

        player.rwnd().unwrap();
        player.rwnd().unwrap();
        assert_eq!(player.position().position, 15.0);

        player.rwnd().unwrap();
        assert_eq!(player.position().position, 0.0);
    }

    #[test]
    fn format_time_renders_hours_minutes_seconds() {
        assert_eq!(format_time(0.0), "0:00:00");
        assert_eq!(format_time(59.9), "0:00:59");
        assert_eq!(format_time(61.0), "0:01:01");
        assert_eq!(format_time(3_723.0), "1:02:03");
        assert_eq!(format_time(-5.0), "0:00:00");
        assert_eq!(format_time(f64::NAN), "0:00:00");
    }

    #[test]
    fn command_player_requires_a_command() {
        assert!(matches!(
            CommandPlayer::new("   "),
            Err(PlayerError::EmptyCommand)
        ));

        let player = CommandPlayer::new("mpv --no-video").unwrap();
        assert_eq!(player.command_line(), "mpv --no-video");
        assert_eq!(player.state(), PlayerState::Null);
    }

    #[test]
    fn command_player_refuses_to_play_without_source() {
        let mut player = CommandPlayer::new("true").unwrap();
        assert!(matches!(player.play(), Err(PlayerError::NoSource)));
        assert_eq!(player.state(), PlayerState::Null);
    }

    #[test]
    fn command_player_reports_spawn_failures() {
        let mut player = CommandPlayer::new("podblast-no-such-player-binary").unwrap();
        player.set("https://example.com/ep1.mp3");

        assert!(matches!(
            player.play(),
            Err(PlayerError::SpawnFailed { .. })
        ));
        assert_ne!(player.state(), PlayerState::Playing);
    }

    #[test]
    fn command_player_stop_unloads_source() {
        let mut player = CommandPlayer::new("true").unwrap();
        player.set("https://example.com/ep1.mp3");
        assert_eq!(player.source(), Some("https://example.com/ep1.mp3"));

        player.stop();
        assert_eq!(player.source(), None);
        assert_eq!(player.state(), PlayerState::Ready);
        assert!(matches!(
            player.set_position(10.0),
            Err(PlayerError::SeekUnsupported)
        ));
    }
}
