//! Normalisation of embedded entry HTML into the display format.
//!
//! This is not an HTML-to-text converter. A few constructs are removed
//! with regex passes (images, `<small>` blocks, empty tag pairs), a stray
//! `<` glued to a `<br>` becomes a newline, and a single left-to-right scan then
//! rewrites every newline into the one break marker the display layer
//! understands, collapsing runs and skipping breaks at paragraph edges.

use std::sync::LazyLock;

use regex::Regex;

/// The only line break emitted by [`clean_html`].
pub const BREAK: &str = "<br>";

static REGEX_TAG_IMG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<img[^>]+src\s*=\s*['"]([^'"]+)['"][^>]*>([^<]*</img>)*"#)
        .expect("valid img regex")
});

static REGEX_TAG_SMALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<small>.*</small>").expect("valid small regex"));

static REGEX_EMPTY_TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(<[^>]*>\s*</[^>]*>)+").expect("valid empty tags regex"));

static REGEX_TAG_BR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<\s*<br\s*/?>\s*").expect("valid br regex"));

pub fn clean_html(html: &str) -> String {
    let txt = REGEX_TAG_IMG.replace_all(html, "");
    let txt = REGEX_TAG_SMALL.replace_all(&txt, "");
    let txt = REGEX_EMPTY_TAGS.replace_all(&txt, "");
    let txt = REGEX_TAG_BR.replace_all(&txt, "\n");
    let txt = txt.replace("\r\n", "\n");

    normalize_breaks(txt.trim_matches(|c: char| c <= ' '))
}

/// Newline policy, per run of consecutive `\n`:
/// - 1st: one marker, unless right after `</p>` or right before `<p>`
/// - 2nd: one more marker
/// - 3rd and later: nothing
///
/// A marker is always appended at the end.
fn normalize_breaks(txt: &str) -> String {
    let mut out = String::with_capacity(txt.len() + BREAK.len() * 2);
    let mut run = 0usize;

    for (i, c) in txt.char_indices() {
        if c != '\n' {
            run = 0;
            out.push(c);
            continue;
        }

        run += 1;
        match run {
            1 => {
                let after_paragraph = ends_with_ignore_case(&txt[..i], "</p>");
                let before_paragraph = starts_with_ignore_case(&txt[i + 1..], "<p>");
                if !after_paragraph && !before_paragraph {
                    out.push_str(BREAK);
                }
            }
            2 => out.push_str(BREAK),
            _ => {}
        }
    }

    out.push_str(BREAK);
    out
}

fn ends_with_ignore_case(haystack: &str, suffix: &str) -> bool {
    let (h, s) = (haystack.as_bytes(), suffix.as_bytes());
    h.len() >= s.len() && h[h.len() - s.len()..].eq_ignore_ascii_case(s)
}

fn starts_with_ignore_case(haystack: &str, prefix: &str) -> bool {
    let (h, p) = (haystack.as_bytes(), prefix.as_bytes());
    h.len() >= p.len() && h[..p.len()].eq_ignore_ascii_case(p)
}
