mod atom;
mod fetch;
mod parse;

pub use fetch::{FeedSource, HttpFeedSource, fetch_feed, is_url, parse_feed_file};
pub use atom::parse_atom;
pub use parse::{FetchedEntry, FetchedFeed, parse_feed};
