mod episode;
mod feed;
mod time;

pub use episode::Episode;
pub use feed::Feed;
pub use time::PackedTime;
