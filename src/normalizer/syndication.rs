//! Deserialization of raw feed bytes into dialect-specific documents.
//!
//! RSS documents are read with the `rss` crate so entry dates stay raw
//! strings for the RFC 1123 parser. Atom documents go through `feed-rs`
//! with its timestamp hook pointed at the ISO 8601 parser. A document of
//! the other dialect yields [`DeserializeError::Mismatch`], which drives
//! type detection.

use chrono::{DateTime, Utc};
use feed_rs::model::{Feed as AtomFeed, FeedType as ParsedFeedType};
use feed_rs::parser;
use rss::Channel;
use thiserror::Error;

use super::date;

#[derive(Error, Debug)]
pub enum DeserializeError {
    /// The document is well-formed but not of the requested dialect.
    #[error("document is not {expected}")]
    Mismatch { expected: &'static str },

    #[error("malformed {dialect} document: {reason}")]
    Malformed {
        dialect: &'static str,
        reason: String,
    },
}

impl DeserializeError {
    pub fn is_mismatch(&self) -> bool {
        matches!(self, DeserializeError::Mismatch { .. })
    }
}

pub fn read_rss(body: &[u8]) -> Result<Channel, DeserializeError> {
    Channel::read_from(body).map_err(|e| match e {
        rss::Error::InvalidStartTag | rss::Error::Eof => {
            DeserializeError::Mismatch { expected: "RSS" }
        }
        other => DeserializeError::Malformed {
            dialect: "RSS",
            reason: other.to_string(),
        },
    })
}

/// Stands in for an Atom timestamp that is present but unparseable, so it
/// can fall back to the fetch time instead of being treated as absent.
pub const UNPARSEABLE_DATE: DateTime<Utc> = DateTime::<Utc>::MIN_UTC;

fn atom_timestamp(text: &str) -> Option<DateTime<Utc>> {
    Some(date::parse_iso8601(text).unwrap_or(UNPARSEABLE_DATE))
}

pub fn read_atom(body: &[u8]) -> Result<AtomFeed, DeserializeError> {
    let feed = parser::Builder::new()
        .timestamp_parser(atom_timestamp)
        .build()
        .parse(body)
        .map_err(|e| DeserializeError::Malformed {
            dialect: "Atom",
            reason: e.to_string(),
        })?;

    if feed.feed_type != ParsedFeedType::Atom {
        return Err(DeserializeError::Mismatch { expected: "Atom" });
    }

    Ok(feed)
}
