// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use atom_syndication::{Entry, Feed as AtomFeed};

use crate::error::FeedError;
use crate::model::PackedTime;

use super::parse::{FetchedEntry, FetchedFeed, decode_text};

/// Parse Atom feed XML bytes into a FetchedFeed
pub fn parse_atom(xml_bytes: &[u8]) -> Result<FetchedFeed, FeedError> {
    let feed = AtomFeed::read_from(xml_bytes)?;

    Ok(FetchedFeed {
        title: decode_text(&feed.title().value),
        description: feed
            .subtitle()
            .map(|s| decode_text(&s.value))
            .unwrap_or_default(),
        entries: feed.entries().iter().filter_map(parse_entry).collect(),
    })
}

/// Entries without an enclosure link are skipped
fn parse_entry(entry: &Entry) -> Option<FetchedEntry> {
    let media_urls = collect_media_urls(entry);
    let first_media = media_urls.first()?.clone();

    let link = entry
        .links()
        .iter()
        .find(|link| link.rel() == "alternate")
        .map(|link| link.href().trim().to_string())
        .filter(|href| !href.is_empty())
        .or_else(|| Some(entry.id().trim().to_string()).filter(|id| !id.is_empty()))
        .unwrap_or(first_media);

    let title = Some(decode_text(&entry.title().value))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Untitled Episode".to_string());

    let description = entry
        .summary()
        .map(|s| decode_text(&s.value))
        .or_else(|| entry.content().and_then(|c| c.value()).map(decode_text))
        .unwrap_or_default();

    let published = entry.published().unwrap_or(entry.updated());

    Some(FetchedEntry {
        link,
        title,
        description,
        published: Some(PackedTime::from_datetime(published)),
        media_urls,
    })
}

fn collect_media_urls(entry: &Entry) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();

    for link in entry.links().iter().filter(|link| link.rel() == "enclosure") {
        let url = link.href().trim();
        if !url.is_empty() && !urls.iter().any(|u| u == url) {
            urls.push(url.to_string());
        }
    }

    urls
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom &amp; Audio</title>
  <subtitle>An Atom podcast</subtitle>
  <id>urn:uuid:60a76c80-d399-11d9-b93c-0003939e0af6</id>
  <updated>2024-01-02T12:00:00Z</updated>
  <entry>
    <title>Episode 2</title>
    <id>urn:uuid:ep2</id>
    <link href="https://example.com/ep2"/>
    <link rel="enclosure" type="audio/mpeg" href="https://example.com/ep2.mp3"/>
    <link rel="enclosure" type="audio/ogg" href="https://example.com/ep2.ogg"/>
    <updated>2024-01-02T12:00:00Z</updated>
    <summary>Second episode</summary>
  </entry>
  <entry>
    <title>Episode 1</title>
    <id>urn:uuid:ep1</id>
    <link rel="enclosure" type="audio/mpeg" href="https://example.com/ep1.mp3"/>
    <published>2024-01-01T08:30:00+02:00</published>
    <updated>2024-01-03T00:00:00Z</updated>
    <content type="text">First episode</content>
  </entry>
  <entry>
    <title>Announcement</title>
    <id>urn:uuid:news</id>
    <link href="https://example.com/news"/>
    <updated>2024-01-01T00:00:00Z</updated>
  </entry>
</feed>"#;

    #[test]
    fn parse_atom_reads_feed_metadata() {
        let feed = parse_atom(SAMPLE_ATOM.as_bytes()).unwrap();

        assert_eq!(feed.title, "Atom & Audio");
        assert_eq!(feed.description, "An Atom podcast");
    }

    #[test]
    fn parse_atom_turns_enclosure_links_into_media() {
        let feed = parse_atom(SAMPLE_ATOM.as_bytes()).unwrap();

        let titles: Vec<_> = feed.entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["Episode 2", "Episode 1"]);
        assert_eq!(
            feed.entries[0].media_urls,
            ["https://example.com/ep2.mp3", "https://example.com/ep2.ogg"]
        );
        assert_eq!(feed.entries[1].media_urls, ["https://example.com/ep1.mp3"]);
    }

    #[test]
    fn parse_atom_falls_back_for_link_description_and_date() {
        let feed = parse_atom(SAMPLE_ATOM.as_bytes()).unwrap();

        assert_eq!(feed.entries[0].link, "https://example.com/ep2");
        assert_eq!(feed.entries[0].description, "Second episode");
        assert_eq!(feed.entries[1].link, "urn:uuid:ep1");
        assert_eq!(feed.entries[1].description, "First episode");

        let ep2 = feed.entries[0].published.unwrap();
        assert_eq!((ep2.year, ep2.month, ep2.day, ep2.hour), (2024, 1, 2, 12));
        let ep1 = feed.entries[1].published.unwrap();
        assert_eq!((ep1.day, ep1.hour, ep1.minute), (1, 6, 30));
    }
}
