use std::sync::Arc;

/// What the player controls of a front end should offer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    /// No feed selected, nothing can be played
    Dead,
    /// A feed but no episode is selected
    Null,
    Ready,
    Paused,
    Playing,
}

/// Events emitted by a session so a front end can refresh itself
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// Feeds were added, removed or reloaded
    FeedListChanged,

    /// The episodes shown for a feed changed (new/old marks, selection)
    EpisodeListChanged { feed_index: Option<usize> },

    /// Player controls need to reflect a new state
    PlayerButtons { state: ButtonState },

    /// Periodic position update, in seconds
    TimeScale { duration: f64, position: f64 },

    /// Something the user should be told about; never fatal
    Notice { message: String },
}

/// Trait for receiving session events.
///
/// Implementations can use this to redraw a UI, log messages,
/// or collect events in tests.
pub trait EventReporter: Send + Sync {
    /// Report an event
    fn report(&self, event: UiEvent);
}

/// A shared reference to an event reporter
pub type SharedEventReporter = Arc<dyn EventReporter>;

/// A no-op reporter that silently ignores all events.
/// Useful for tests or quiet mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl EventReporter for NoopReporter {
    fn report(&self, _event: UiEvent) {
        // Intentionally empty
    }
}

impl NoopReporter {
    /// Create a new NoopReporter wrapped in an Arc
    pub fn shared() -> SharedEventReporter {
        Arc::new(Self)
    }
}
