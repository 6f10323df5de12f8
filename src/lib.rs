pub mod error;
pub mod events;
pub mod feed;
pub mod http;
pub mod model;
pub mod player;
pub mod registry;
pub mod session;
pub mod storage;
pub mod tracker;

// Re-export main types for convenience
pub use error::{
    FeedError, PackedTimeParseError, PlayerError, RegistryError, SessionError, StorageError,
    TrackerError,
};
pub use events::{ButtonState, EventReporter, NoopReporter, SharedEventReporter, UiEvent};
pub use feed::{FeedSource, FetchedEntry, FetchedFeed, HttpFeedSource, is_url, parse_feed};
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use model::{Episode, Feed, PackedTime};
pub use player::{CommandPlayer, Player, PlayerState, Position, format_time};
pub use registry::{Registration, Registry};
pub use session::Session;
pub use storage::{DEFAULT_DATABASE_PATH, StorageFormat, load_feeds, save_feeds};
pub use tracker::{Navigation, Tracker};
