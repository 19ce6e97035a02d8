use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::escape::{resolve_html5_entity, unescape_with};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use reqwest::Client;
use tracing::debug;

use guildkeeper_core::feeds::{
    truncate_chars, FeedItem, FeedSource, FetchError, SUMMARY_MAX_CHARS,
};

use crate::http::get_text;

const UNTITLED: &str = "(untitled)";

/// Reads RSS 2.0 `<item>` and Atom `<entry>` elements.
#[derive(Clone)]
pub struct RssFeedSource {
    client: Client,
}

impl RssFeedSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FeedSource for RssFeedSource {
    async fn fetch(&self, feed_url: &str, limit: usize) -> Result<Vec<FeedItem>, FetchError> {
        let body = get_text(&self.client, feed_url, feed_url).await?;
        let items = parse_feed(&body, limit)
            .map_err(|message| FetchError::Malformed { target: feed_url.to_owned(), message })?;

        debug!(event_name = "feeds.rss.fetched", feed_url, items = items.len(), "feed parsed");
        Ok(items)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Published,
    Summary,
}

#[derive(Default)]
struct PartialItem {
    title: String,
    link: String,
    published: String,
    summary: String,
}

impl PartialItem {
    fn push(&mut self, field: Field, text: &str) {
        let target = match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Published => &mut self.published,
            Field::Summary => &mut self.summary,
        };
        target.push_str(text);
    }

    fn finish(self) -> FeedItem {
        let title = self.title.trim();
        FeedItem {
            title: if title.is_empty() { UNTITLED.to_owned() } else { title.to_owned() },
            link: self.link.trim().to_owned(),
            published_at: parse_published(self.published.trim()),
            summary: truncate_chars(strip_markup(&self.summary).trim(), SUMMARY_MAX_CHARS),
        }
    }
}

fn field_for(name: &[u8]) -> Option<Field> {
    match name {
        b"title" => Some(Field::Title),
        b"link" => Some(Field::Link),
        b"pubDate" | b"published" | b"updated" | b"date" => Some(Field::Published),
        b"description" | b"summary" | b"content" => Some(Field::Summary),
        _ => None,
    }
}

fn is_item(name: &[u8]) -> bool {
    matches!(name, b"item" | b"entry")
}

/// Atom links carry the target in `href`; only `rel="alternate"` or no rel counts.
fn atom_href(element: &BytesStart<'_>) -> Option<String> {
    let mut href = None;
    let mut alternate = true;
    for attribute in element.attributes().flatten() {
        match attribute.key.local_name().as_ref() {
            b"href" => href = attribute.unescape_value().ok().map(|value| value.into_owned()),
            b"rel" => alternate = &*attribute.value == b"alternate",
            _ => {}
        }
    }
    href.filter(|_| alternate)
}

pub(crate) fn parse_feed(xml: &str, limit: usize) -> Result<Vec<FeedItem>, String> {
    let mut reader = Reader::from_str(xml);
    let mut items = Vec::new();
    let mut current: Option<PartialItem> = None;
    let mut field: Option<Field> = None;

    while items.len() < limit {
        match reader.read_event().map_err(|error| error.to_string())? {
            Event::Start(element) => {
                let name = element.local_name();
                if is_item(name.as_ref()) {
                    current = Some(PartialItem::default());
                    field = None;
                } else if let Some(item) = current.as_mut() {
                    field = field_for(name.as_ref());
                    if field == Some(Field::Link) && item.link.is_empty() {
                        if let Some(href) = atom_href(&element) {
                            item.link = href;
                            field = None;
                        }
                    }
                }
            }
            Event::Empty(element) => {
                if let Some(item) = current.as_mut() {
                    if element.local_name().as_ref() == b"link" && item.link.is_empty() {
                        if let Some(href) = atom_href(&element) {
                            item.link = href;
                        }
                    }
                }
            }
            Event::Text(text) => {
                if let (Some(item), Some(active)) = (current.as_mut(), field) {
                    let value = text.unescape().map_err(|error| error.to_string())?;
                    item.push(active, &value);
                }
            }
            Event::CData(data) => {
                if let (Some(item), Some(active)) = (current.as_mut(), field) {
                    item.push(active, &decode_entities(&String::from_utf8_lossy(&data)));
                }
            }
            Event::End(element) => {
                if is_item(element.local_name().as_ref()) {
                    if let Some(item) = current.take() {
                        items.push(item.finish());
                    }
                }
                field = None;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(items)
}

fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|value| value.with_timezone(&Utc))
}

/// The reader leaves CDATA untouched, but feeds routinely put HTML entities such as
/// `&nbsp;` in it. Text with a stray `&` is kept as written.
fn decode_entities(raw: &str) -> String {
    unescape_with(raw, resolve_html5_entity)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_owned())
}

fn strip_markup(raw: &str) -> String {
    let mut plain = String::with_capacity(raw.len());
    let mut in_tag = false;
    for character in raw.chars() {
        match character {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => plain.push(character),
            _ => {}
        }
    }
    plain
}
