// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use chrono::{DateTime, FixedOffset};
use tracing::debug;

use crate::error::FeedError;
use crate::model::PackedTime;

use super::atom::parse_atom;

/// A feed as delivered by its source, before it is registered
#[derive(Debug, Clone, Default)]
pub struct FetchedFeed {
    pub title: String,
    pub description: String,
    /// Entries in source order, usually newest first
    pub entries: Vec<FetchedEntry>,
}

/// One entry of a fetched feed
#[derive(Debug, Clone, Default)]
pub struct FetchedEntry {
    pub link: String,
    pub title: String,
    pub description: String,
    pub published: Option<PackedTime>,
    pub media_urls: Vec<String>,
}

/// Parse RSS or Atom feed XML bytes into a FetchedFeed
pub fn parse_feed(xml_bytes: &[u8]) -> Result<FetchedFeed, FeedError> {
    match parse_rss(xml_bytes) {
        Err(FeedError::ParseFailed(rss::Error::InvalidStartTag)) => {
            debug!("not an rss document, trying atom");
            parse_atom(xml_bytes)
        }
        result => result,
    }
}

fn parse_rss(xml_bytes: &[u8]) -> Result<FetchedFeed, FeedError> {
    let channel = rss::Channel::read_from(xml_bytes)?;

    let entries = channel.items().iter().filter_map(parse_entry).collect();

    Ok(FetchedFeed {
        title: decode_text(channel.title()),
        description: decode_text(channel.description()),
        entries,
    })
}

/// Items that carry no playable media are skipped
fn parse_entry(item: &rss::Item) -> Option<FetchedEntry> {
    let media_urls = collect_media_urls(item);
    let first_media = media_urls.first()?.clone();

    let title = item
        .title()
        .map(decode_text)
        .unwrap_or_else(|| "Untitled Episode".to_string());

    let description = item
        .description()
        .or_else(|| item.itunes_ext().and_then(|ext| ext.summary()))
        .map(decode_text)
        .unwrap_or_default();

    let link = item
        .link()
        .map(String::from)
        .or_else(|| item.guid().map(|g| g.value().to_string()))
        .unwrap_or(first_media);

    let published = item
        .pub_date()
        .and_then(parse_date)
        .map(|dt| PackedTime::from_datetime(&dt));

    Some(FetchedEntry {
        link,
        title,
        description,
        published,
        media_urls,
    })
}

/// The enclosure URL followed by any `media:content` URLs, without duplicates
fn collect_media_urls(item: &rss::Item) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();

    let enclosure = item.enclosure().map(|e| e.url());
    let media_content = item
        .extensions()
        .get("media")
        .and_then(|media| media.get("content"))
        .into_iter()
        .flatten()
        .filter_map(|ext| ext.attrs().get("url").map(String::as_str));

    for url in enclosure.into_iter().chain(media_content) {
        let url = url.trim();
        if !url.is_empty() && !urls.iter().any(|u| u == url) {
            urls.push(url.to_string());
        }
    }

    urls
}

pub(super) fn decode_text(text: &str) -> String {
    html_escape::decode_html_entities(text.trim()).into_owned()
}

/// Parse a publication date, accepting common deviations from RFC 2822
fn parse_date(date_str: &str) -> Option<DateTime<FixedOffset>> {
    let date_str = date_str.trim();

    if let Ok(dt) = DateTime::parse_from_rfc2822(date_str) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(date_str) {
        return Some(dt);
    }

    let formats = [
        "%a, %d %b %Y %H:%M:%S %z",
        "%d %b %Y %H:%M:%S %z",
        "%Y-%m-%d %H:%M:%S %z",
    ];

    formats
        .iter()
        .find_map(|format| DateTime::parse_from_str(date_str, format).ok())
}
