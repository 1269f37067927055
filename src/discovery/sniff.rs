use std::io::BufRead;

use tracing::debug;

use crate::domain::FeedType;

const RSS_TAG: &str = "<rss ";
const ATOM_TAG: &str = "<feed ";

/// Classify a document by whichever root tag shows up first, line by line.
pub fn sniff(body: &[u8]) -> FeedType {
    sniff_reader(body)
}

pub fn sniff_reader<R: BufRead>(mut reader: R) -> FeedType {
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => return FeedType::Unknown,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                if let Some(feed_type) = sniff_line(&line) {
                    return feed_type;
                }
            }
            Err(e) => {
                debug!("Stopped sniffing on read error: {}", e);
                return FeedType::Unknown;
            }
        }
    }
}

fn sniff_line(line: &str) -> Option<FeedType> {
    let line = line.to_ascii_lowercase();
    match (line.find(RSS_TAG), line.find(ATOM_TAG)) {
        (Some(rss), Some(atom)) if atom < rss => Some(FeedType::Atom),
        (Some(_), _) => Some(FeedType::Rss),
        (None, Some(_)) => Some(FeedType::Atom),
        (None, None) => None,
    }
}
