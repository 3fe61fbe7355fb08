//! Text-field sanitization for inbound chat messages.
//!
//! The gateway accepts free text from anonymous callers and hands it to a webhook, so
//! markup, control whitespace and percent-encoded octets are stripped before the
//! emptiness check.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// A `<` followed by anything up to the next `<`, the next `>` or the end of input.
/// Matches without the closing `>` are a lone less-than sign rather than a tag.
static LESS_THAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^<>]*>?").expect("less-than pattern is valid"));

/// Script and style elements, contents included.
static RAW_TEXT_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script[^>]*?>.*?</script>|<style[^>]*?>.*?</style>")
        .expect("raw text element pattern is valid")
});

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\r\n\t ]+").expect("whitespace pattern is valid"));

static SPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" +").expect("space pattern is valid"));

static PERCENT_OCTET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)%[a-f0-9]{2}").expect("percent octet pattern is valid"));

/// Clean a single-line text field.
///
/// - markup is removed; `<script>` and `<style>` elements lose their contents too
/// - a `<` that does not open a tag is kept as `&lt;`
/// - runs of spaces, tabs and line breaks collapse to a single space
/// - percent-encoded octets such as `%2F` are removed
/// - the result is trimmed
pub fn sanitize_text_field(input: &str) -> String {
    let filtered = if input.contains('<') {
        strip_tags(input)
    } else {
        input.to_string()
    };
    let filtered = WHITESPACE_RUN.replace_all(&filtered, " ");
    let mut filtered = trim(&filtered).to_string();

    let mut found = false;
    while let Some(octet) = PERCENT_OCTET.find(&filtered) {
        filtered = filtered.replace(octet.as_str(), "");
        found = true;
    }
    if found {
        let collapsed = SPACE_RUN.replace_all(&filtered, " ").into_owned();
        filtered = trim(&collapsed).to_string();
    }
    filtered
}

fn trim(s: &str) -> &str {
    s.trim_matches(&[' ', '\t', '\n', '\r', '\0', '\x0B'][..])
}

fn strip_tags(input: &str) -> String {
    let escaped = LESS_THAN.replace_all(input, |caps: &Captures| {
        let matched = &caps[0];
        if matched.ends_with('>') {
            matched.to_string()
        } else {
            format!("&lt;{}", &matched[1..])
        }
    });
    let without_raw = RAW_TEXT_ELEMENT.replace_all(&escaped, "");
    TAG.replace_all(&without_raw, "").into_owned()
}
