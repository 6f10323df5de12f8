// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;
use url::Url;

use crate::error::FeedError;
use crate::http::HttpClient;

use super::parse::{FetchedFeed, parse_feed};

/// Anything that can turn a feed URL into feed contents
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedFeed, FeedError>;
}

/// Fetches http(s) feeds over the network and reads anything else from disk
#[derive(Clone, Default)]
pub struct HttpFeedSource<C> {
    client: C,
}

impl<C: HttpClient> HttpFeedSource<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C: HttpClient> FeedSource for HttpFeedSource<C> {
    async fn fetch(&self, source: &str) -> Result<FetchedFeed, FeedError> {
        if is_url(source) {
            fetch_feed(&self.client, source).await
        } else {
            parse_feed_file(Path::new(source))
        }
    }
}

/// Fetch raw feed bytes from a URL (without parsing)
async fn fetch_feed_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Bytes, FeedError> {
    debug!(url, "fetching feed");
    let response = client.get(url).await.map_err(|e| FeedError::FetchFailed {
        url: url.to_string(),
        source: e,
    })?;

    if response.status >= 400 {
        return Err(FeedError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        });
    }

    Ok(response.body)
}

/// Read raw feed bytes from a local file (without parsing)
fn read_feed_file(path: &Path) -> Result<Vec<u8>, FeedError> {
    std::fs::read(path).map_err(|e| FeedError::FileReadFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Fetch and parse a podcast feed from a URL
pub async fn fetch_feed<C: HttpClient>(client: &C, url: &str) -> Result<FetchedFeed, FeedError> {
    Url::parse(url)?;
    let bytes = fetch_feed_bytes(client, url).await?;
    parse_feed(&bytes)
}

/// Parse a podcast feed from a local file
pub fn parse_feed_file(path: &Path) -> Result<FetchedFeed, FeedError> {
    let bytes = read_feed_file(path)?;
    parse_feed(&bytes)
}

/// Determine if a string is a URL or a file path
pub fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}
