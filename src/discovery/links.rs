//! Line-oriented scan for `<link rel="alternate">` feed announcements.
//!
//! Pages are not parsed as HTML. Each line is searched on its own, so a
//! `<link>` tag broken over several lines is not found, and scanning
//! ends with the line that opens `<body`.

use html_escape::decode_html_entities;
use tracing::debug;
use url::Url;

use crate::domain::{FeedType, FoundFeed};

const RSS_MIME: &str = "application/rss+xml";
const ATOM_MIME: &str = "application/atom+xml";

pub fn scan_links(html: &str, base: &Url) -> Vec<FoundFeed> {
    let mut found = Vec::new();

    for line in html.lines() {
        // ASCII lowercasing keeps byte offsets valid for `line`
        let lower = line.to_ascii_lowercase();
        let body_at = find_body_tag(&lower);
        let limit = body_at.unwrap_or(lower.len());

        let mut from = 0;
        while let Some(pos) = lower.get(from..limit).and_then(|s| s.find("<link ")) {
            let start = from + pos;
            let Some(end) = tag_end(&lower, start) else {
                break;
            };

            if let Some(feed) = link_candidate(&line[start..end], &lower[start..end], base) {
                found.push(feed);
            }
            from = end;
        }

        if body_at.is_some() {
            break;
        }
    }

    found
}

fn find_body_tag(lower: &str) -> Option<usize> {
    lower.match_indices("<body").map(|(i, _)| i).find(|&i| {
        matches!(
            lower.as_bytes().get(i + "<body".len()).copied(),
            None | Some(b'>' | b' ' | b'\t' | b'/')
        )
    })
}

/// Offset just past the closing `>` of the tag opening at `start`,
/// skipping any `>` inside quoted attribute values.
fn tag_end(lower: &str, start: usize) -> Option<usize> {
    let mut quote = None;
    for (i, b) in lower.bytes().enumerate().skip(start) {
        match (quote, b) {
            (None, b'"' | b'\'') => quote = Some(b),
            (Some(q), _) if q == b => quote = None,
            (None, b'>') => return Some(i + 1),
            _ => {}
        }
    }
    None
}

fn link_candidate(tag: &str, lower: &str, base: &Url) -> Option<FoundFeed> {
    let rel = attribute(tag, lower, "rel")?;
    if !rel.eq_ignore_ascii_case("alternate") {
        return None;
    }

    let mime = attribute(tag, lower, "type")?;
    let feed_type = if mime.eq_ignore_ascii_case(RSS_MIME) {
        FeedType::Rss
    } else if mime.eq_ignore_ascii_case(ATOM_MIME) {
        FeedType::Atom
    } else {
        return None;
    };

    let href = decode_html_entities(attribute(tag, lower, "href")?.trim()).into_owned();
    let url = match base.join(&href) {
        Ok(url) => url.to_string(),
        Err(e) => {
            debug!("Ignoring feed link {:?}: {}", href, e);
            return None;
        }
    };

    let title = attribute(tag, lower, "title")
        .map(|t| decode_html_entities(t.trim()).into_owned())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| url.clone());

    Some(FoundFeed::new(title, url, feed_type))
}

/// Quoted value of ` name=` in `tag`, matching the name case-insensitively.
fn attribute<'a>(tag: &'a str, lower: &str, name: &str) -> Option<&'a str> {
    let needle = format!(" {}=", name);
    let value_at = lower.find(&needle)? + needle.len();

    let quote = *lower.as_bytes().get(value_at)?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }

    let rest = &tag[value_at + 1..];
    let len = rest.bytes().position(|b| b == quote)?;
    Some(&rest[..len])
}
