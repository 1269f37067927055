pub mod cleaner;
pub mod date;
pub mod syndication;

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use feed_rs::model::{Entry as AtomEntry, Link as AtomLink};
use html_escape::decode_html_entities;
use regex::Regex;
use rss::Item as RssItem;
use tracing::debug;

use crate::domain::{Article, FeedType};
use cleaner::clean_html;
use date::{parse_or_now, DateDialect};
use syndication::DeserializeError;

static REGEX_TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

#[derive(Debug, Clone)]
pub struct Normalized {
    /// Dialect the document was actually read as.
    pub feed_type: FeedType,
    pub title: Option<String>,
    pub articles: Vec<Article>,
}

#[derive(Clone)]
pub struct Normalizer;

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Map a feed document to articles.
    ///
    /// With an unknown `feed_type` the document is read as RSS first and,
    /// failing that, as Atom; [`Normalized::feed_type`] reports which one
    /// succeeded so the caller can remember it.
    pub fn normalize(
        &self,
        feed_id: i64,
        feed_type: FeedType,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Normalized, DeserializeError> {
        match feed_type {
            FeedType::Rss => self.normalize_rss(feed_id, body, now),
            FeedType::Atom => self.normalize_atom(feed_id, body, now),
            FeedType::Unknown => match self.normalize_rss(feed_id, body, now) {
                Err(e) if e.is_mismatch() => {
                    debug!("Feed {} is not RSS ({}), trying Atom", feed_id, e);
                    self.normalize_atom(feed_id, body, now)
                }
                result => result,
            },
        }
    }

    pub fn normalize_rss(
        &self,
        feed_id: i64,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Normalized, DeserializeError> {
        let channel = syndication::read_rss(body)?;

        let feed_date = parse_or_now(
            channel.last_build_date().or(channel.pub_date()),
            DateDialect::Rfc1123,
            now,
        );

        let articles: Vec<Article> = channel
            .items()
            .iter()
            .filter_map(|item| rss_article(feed_id, item, feed_date, now))
            .collect();

        debug!(
            "Feed {}: {} of {} RSS items usable",
            feed_id,
            articles.len(),
            channel.items().len()
        );

        Ok(Normalized {
            feed_type: FeedType::Rss,
            title: non_empty(channel.title()).map(plain_text),
            articles,
        })
    }

    pub fn normalize_atom(
        &self,
        feed_id: i64,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Normalized, DeserializeError> {
        let feed = syndication::read_atom(body)?;

        let articles: Vec<Article> = feed
            .entries
            .iter()
            .filter_map(|entry| atom_article(feed_id, entry, feed.updated, now))
            .collect();

        debug!(
            "Feed {}: {} of {} Atom entries usable",
            feed_id,
            articles.len(),
            feed.entries.len()
        );

        Ok(Normalized {
            feed_type: FeedType::Atom,
            title: feed.title.as_ref().map(|t| plain_text(&t.content)),
            articles,
        })
    }
}

/// Items without a title or without any body are skipped.
fn rss_article(
    feed_id: i64,
    item: &RssItem,
    feed_date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<Article> {
    let raw_title = item.title()?;
    let body = item.content().or(item.description())?;

    let link = item.link().and_then(non_empty);
    let key = item
        .guid()
        .and_then(|g| non_empty(g.value()))
        .or(link)
        .unwrap_or(raw_title);

    let mut article = Article::new(feed_id, key, now);
    article.title = plain_text(raw_title);
    article.text = clean_html(body);
    article.author = rss_author(item);
    article.pub_date = match item.pub_date() {
        Some(pub_date) => parse_or_now(Some(pub_date), DateDialect::Rfc1123, now),
        None => feed_date,
    };
    article.upd_date = Some(feed_date);
    article.link = link.map(String::from);

    Some(article)
}

fn rss_author(item: &RssItem) -> Option<String> {
    let creators = item
        .dublin_core_ext()
        .map(|dc| join_names(dc.creators().iter().map(String::as_str)))
        .unwrap_or_default();

    if creators.is_empty() {
        item.author().and_then(non_empty).map(String::from)
    } else {
        Some(creators)
    }
}

/// Entries with neither content, summary nor link are skipped.
fn atom_article(
    feed_id: i64,
    entry: &AtomEntry,
    feed_updated: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<Article> {
    let link = atom_link(&entry.links);

    let body = entry
        .content
        .as_ref()
        .and_then(|c| c.body.as_deref())
        .or(entry.summary.as_ref().map(|s| s.content.as_str()))
        .and_then(non_empty);

    let text = match (body, link.as_deref()) {
        (Some(body), _) => clean_html(body),
        (None, Some(link)) => clean_html(&format!("<a href=\"{link}\">{link}</a>")),
        (None, None) => return None,
    };

    let title = entry
        .title
        .as_ref()
        .map(|t| plain_text(&t.content))
        .unwrap_or_default();

    let key = non_empty(&entry.id)
        .or(link.as_deref())
        .unwrap_or(&title)
        .to_string();

    let known = |date: DateTime<Utc>| {
        if date == syndication::UNPARSEABLE_DATE {
            debug!("Unparseable Atom date in entry {:?}, falling back to now", entry.id);
            now
        } else {
            date
        }
    };
    let updated = entry.updated.or(feed_updated).map(known).unwrap_or(now);

    let mut article = Article::new(feed_id, &key, now);
    article.title = title;
    article.text = text;
    article.author = Some(join_names(entry.authors.iter().map(|a| a.name.as_str())))
        .filter(|names| !names.is_empty());
    article.pub_date = entry.published.map(known).unwrap_or(updated);
    article.upd_date = Some(updated);
    article.link = link;

    Some(article)
}

fn atom_link(links: &[AtomLink]) -> Option<String> {
    let candidates: Vec<(&str, Option<&str>)> = links
        .iter()
        .map(|l| (l.href.as_str(), l.rel.as_deref()))
        .collect();
    choose_link(&candidates).and_then(non_empty).map(String::from)
}

/// A lone link is used as is; among several, the first `alternate` wins,
/// otherwise the last link without a `rel`.
fn choose_link<'a>(links: &[(&'a str, Option<&str>)]) -> Option<&'a str> {
    match links {
        [] => None,
        [(href, _)] => Some(*href),
        many => {
            let mut chosen = None;
            for (href, rel) in many {
                match rel {
                    Some(rel) if rel.eq_ignore_ascii_case("alternate") => return Some(*href),
                    None => chosen = Some(*href),
                    Some(_) => {}
                }
            }
            chosen
        }
    }
}

fn join_names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names
        .filter_map(non_empty)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Title text: markup dropped, entities decoded, whitespace trimmed.
fn plain_text(raw: &str) -> String {
    let stripped = REGEX_TAGS.replace_all(raw.trim(), "");
    decode_html_entities(&stripped).trim().to_string()
}

fn non_empty(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
