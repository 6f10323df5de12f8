use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when fetching or parsing RSS feeds
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Failed to fetch feed from {url}: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to read feed file {path}: {source}")]
    FileReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse RSS feed: {0}")]
    ParseFailed(#[from] rss::Error),

    #[error("Failed to parse Atom feed: {0}")]
    AtomParseFailed(#[from] atom_syndication::Error),

    #[error("Invalid feed URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// A packed timestamp that could not be read back from text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid packed timestamp '{value}': expected nine integers")]
pub struct PackedTimeParseError {
    pub value: String,
}

/// Errors that can occur while loading or saving the feed database
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to read database {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write database {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory {path}: {source}")]
    CreateDirectoryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse database JSON in {path}: {source}")]
    JsonParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize database: {0}")]
    JsonSerializeFailed(#[from] serde_json::Error),

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Malformed record in {path}: {reason}")]
    MalformedRecord { path: PathBuf, reason: String },
}

/// Errors raised by feed registry operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Feed already registered: {url}")]
    AlreadyRegistered { url: String },

    #[error("No registered feed matches {url}")]
    NotFound { url: String },
}

/// Errors raised when the playback position cannot be moved
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Feed index {index} out of range ({len} feeds)")]
    FeedIndexOutOfRange { index: usize, len: usize },

    #[error("Episode index {index} out of range ({len} episodes)")]
    EpisodeIndexOutOfRange { index: usize, len: usize },

    #[error("No feed is selected")]
    NoActiveFeed,

    #[error("No episode is selected")]
    NoActiveEpisode,

    #[error("Episode {episode} of feed {feed} has no media to play")]
    NoMedia { feed: usize, episode: usize },

    #[error("Player error: {0}")]
    Player(#[from] PlayerError),
}

/// Errors reported by an audio player
#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("No media source has been set")]
    NoSource,

    #[error("Failed to start player command '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Player command is empty")]
    EmptyCommand,

    #[error("Seeking is not supported by this player")]
    SeekUnsupported,
}

/// Top-level errors for session operations
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Playback error: {0}")]
    Tracker(#[from] TrackerError),

    #[error("Player error: {0}")]
    Player(#[from] PlayerError),
}
