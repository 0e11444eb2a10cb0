//! @ai:module:intent Recognize @! markers in comment text and split out their raw parts
//! @ai:module:layer application
//! @ai:module:public_api tokenize, RawAnnotation, MarkerKind, MARKER
//! @ai:module:stateless true

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// The reserved prefix every annotation starts with.
pub const MARKER: &str = "@!";

const BEGIN: &str = "begin";
const END: &str = "end";
const TAGS_PREFIX: &str = "tags=";

static KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*").expect("Invalid regex"));

/// @ai:intent Which of the three marker forms a line uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    Inline,
    BlockBegin,
    BlockEnd,
}

/// @ai:intent Unparsed pieces of one annotation line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAnnotation {
    pub marker: MarkerKind,
    pub key: String,
    /// Quoted string or bare token after the key.
    pub raw_value: Option<String>,
    /// Brace span including the braces; unterminated spans run to end of line.
    pub raw_props: Option<String>,
    /// Text after `tags=`, normally a bracketed list.
    pub raw_tags: Option<String>,
}

impl RawAnnotation {
    fn new(marker: MarkerKind, key: &str) -> Self {
        Self {
            marker,
            key: key.to_string(),
            raw_value: None,
            raw_props: None,
            raw_tags: None,
        }
    }
}

/// @ai:intent Tokenize stripped comment content into a raw annotation
/// @ai:pre content has comment delimiters already removed
/// @ai:post None when the content does not start with a valid marker and key
/// @ai:example ("@!readonly true") -> Some(Inline readonly, value "true")
/// @ai:example ("@!9lives") -> None
/// @ai:example ("see @!todo") -> None
/// @ai:effects pure
pub fn tokenize(content: &str) -> Option<RawAnnotation> {
    let rest = content.trim_start().strip_prefix(MARKER)?;
    let (key, rest) = take_key(rest)?;

    match key {
        BEGIN => {
            let (key, rest) = take_key(require_whitespace(rest)?)?;
            let mut raw = RawAnnotation::new(MarkerKind::BlockBegin, key);
            scan_payload(rest, &mut raw);
            Some(raw)
        }
        END => {
            let (key, _) = take_key(require_whitespace(rest)?)?;
            Some(RawAnnotation::new(MarkerKind::BlockEnd, key))
        }
        _ => {
            let mut raw = RawAnnotation::new(MarkerKind::Inline, key);
            scan_payload(rest, &mut raw);
            Some(raw)
        }
    }
}

/// @ai:intent Check whether content looks like an annotation attempt at all
/// @ai:effects pure
pub fn has_marker(content: &str) -> bool {
    content.trim_start().starts_with(MARKER)
}

/// Split a key off the front of `text`; the key must end at whitespace, `{` or end of text.
fn take_key(text: &str) -> Option<(&str, &str)> {
    let m = KEY_PATTERN.find(text)?;
    let rest = &text[m.end()..];
    match rest.chars().next() {
        None => Some((m.as_str(), rest)),
        Some(c) if c.is_whitespace() || c == '{' => Some((m.as_str(), rest)),
        Some(_) => None,
    }
}

fn require_whitespace(text: &str) -> Option<&str> {
    if text.starts_with(char::is_whitespace) {
        Some(text.trim_start())
    } else {
        None
    }
}

/// @ai:intent Pull the value, tags shorthand and property span from the text after a key
/// @ai:effects pure
fn scan_payload(text: &str, raw: &mut RawAnnotation) {
    let mut rest = text.trim_start();

    if rest.starts_with('"') {
        let end = quoted_end(rest).unwrap_or(rest.len());
        raw.raw_value = Some(rest[..end].to_string());
        rest = &rest[end..];
    } else if !rest.is_empty() && !rest.starts_with('{') && !rest.starts_with(TAGS_PREFIX) {
        let end = rest
            .find(|c: char| c.is_whitespace() || c == '{')
            .unwrap_or(rest.len());
        raw.raw_value = Some(rest[..end].to_string());
        rest = &rest[end..];
    }

    loop {
        rest = rest.trim_start();

        if raw.raw_tags.is_none() {
            if let Some(after) = rest.strip_prefix(TAGS_PREFIX) {
                let end = if after.starts_with('[') {
                    matching_close(after, '[', ']').unwrap_or(after.len())
                } else {
                    after
                        .find(|c: char| c.is_whitespace() || c == '{')
                        .unwrap_or(after.len())
                };
                raw.raw_tags = Some(after[..end].to_string());
                rest = &after[end..];
                continue;
            }
        }

        if raw.raw_props.is_none() && rest.starts_with('{') {
            let end = matching_close(rest, '{', '}').unwrap_or(rest.len());
            raw.raw_props = Some(rest[..end].to_string());
            rest = &rest[end..];
            continue;
        }

        // Anything else is a trailing remark.
        break;
    }
}

/// Byte offset just past the closing quote of the string starting at `text[0]`.
fn quoted_end(text: &str) -> Option<usize> {
    let mut escaped = false;
    for (idx, c) in text.char_indices().skip(1) {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some(idx + 1),
            _ => {}
        }
    }
    None
}

/// @ai:intent Find the byte offset just past the delimiter closing `text[0]`
/// @ai:pre text starts with `open`
/// @ai:post nested pairs and quoted strings (with escapes) are skipped
/// @ai:example ("{\"a\": \"}\"} rest", '{', '}') -> Some(10)
/// @ai:effects pure
pub fn matching_close(text: &str, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        if c == '"' {
            in_string = true;
        } else if c == open {
            depth += 1;
        } else if c == close {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(idx + c.len_utf8());
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_with_value_and_props() {
        let raw = tokenize(r#"@!readonly true { "author": "alice" }"#).unwrap();
        assert_eq!(raw.marker, MarkerKind::Inline);
        assert_eq!(raw.key, "readonly");
        assert_eq!(raw.raw_value.as_deref(), Some("true"));
        assert_eq!(raw.raw_props.as_deref(), Some(r#"{ "author": "alice" }"#));
        assert_eq!(raw.raw_tags, None);
    }

    #[test]
    fn test_quoted_value_with_escapes() {
        let raw = tokenize(r#"@!link "say \"hi\" {x}" {"a": 1}"#).unwrap();
        assert_eq!(raw.raw_value.as_deref(), Some(r#""say \"hi\" {x}""#));
        assert_eq!(raw.raw_props.as_deref(), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn test_key_only() {
        let raw = tokenize("  @!pure").unwrap();
        assert_eq!(raw.key, "pure");
        assert_eq!(raw.raw_value, None);
        assert_eq!(raw.raw_props, None);
    }

    #[test]
    fn test_props_directly_after_key() {
        let raw = tokenize(r#"@!owner{"team": "core"}"#).unwrap();
        assert_eq!(raw.key, "owner");
        assert_eq!(raw.raw_props.as_deref(), Some(r#"{"team": "core"}"#));
    }

    #[test]
    fn test_nested_braces_and_braces_in_strings() {
        let raw = tokenize(r#"@!cfg { "a": { "b": "}" }, "c": "{" } trailing remark"#).unwrap();
        assert_eq!(
            raw.raw_props.as_deref(),
            Some(r#"{ "a": { "b": "}" }, "c": "{" }"#)
        );
    }

    #[test]
    fn test_unterminated_props_run_to_end() {
        let raw = tokenize(r#"@!cfg { "a": 1"#).unwrap();
        assert_eq!(raw.raw_props.as_deref(), Some(r#"{ "a": 1"#));
    }

    #[test]
    fn test_tags_shorthand_before_and_after_props() {
        let raw = tokenize(r#"@!todo 3 tags=[a, "b c"] {"x": 1}"#).unwrap();
        assert_eq!(raw.raw_value.as_deref(), Some("3"));
        assert_eq!(raw.raw_tags.as_deref(), Some(r#"[a, "b c"]"#));
        assert_eq!(raw.raw_props.as_deref(), Some(r#"{"x": 1}"#));

        let raw = tokenize(r#"@!todo {"x": 1} tags=[a]"#).unwrap();
        assert_eq!(raw.raw_value, None);
        assert_eq!(raw.raw_tags.as_deref(), Some("[a]"));
    }

    #[test]
    fn test_bare_word_value_stops_at_remark() {
        let raw = tokenize(r#"@!todo fix the parser {"x": 1}"#).unwrap();
        assert_eq!(raw.raw_value.as_deref(), Some("fix"));
        assert_eq!(raw.raw_props, None);
    }

    #[test]
    fn test_begin_and_end() {
        let raw = tokenize(r#"@!begin experimental "v2" {"owner": "x"}"#).unwrap();
        assert_eq!(raw.marker, MarkerKind::BlockBegin);
        assert_eq!(raw.key, "experimental");
        assert_eq!(raw.raw_value.as_deref(), Some(r#""v2""#));

        let raw = tokenize("@!end experimental -- done").unwrap();
        assert_eq!(raw.marker, MarkerKind::BlockEnd);
        assert_eq!(raw.key, "experimental");
    }

    #[test]
    fn test_begin_without_key_is_not_an_annotation() {
        assert_eq!(tokenize("@!begin"), None);
        assert_eq!(tokenize("@!begin {}"), None);
        assert_eq!(tokenize("@!end"), None);
        assert_eq!(tokenize("@!beginning"), Some(RawAnnotation::new(MarkerKind::Inline, "beginning")));
    }

    #[test]
    fn test_invalid_keys_are_rejected() {
        assert_eq!(tokenize("@!9lives"), None);
        assert_eq!(tokenize("@!foo.bar"), None);
        assert_eq!(tokenize("@! spaced"), None);
        assert_eq!(tokenize("@!"), None);
        assert!(has_marker("@!9lives"));
    }

    #[test]
    fn test_marker_must_lead() {
        assert_eq!(tokenize("see @!todo"), None);
        assert!(!has_marker("see @!todo"));
        assert!(tokenize("@!under_score-dash").is_some());
    }

    #[test]
    fn test_matching_close() {
        assert_eq!(matching_close(r#"{"a": "}"} rest"#, '{', '}'), Some(10));
        assert_eq!(matching_close("{{}", '{', '}'), None);
        assert_eq!(matching_close("[a, [b]] x", '[', ']'), Some(8));
    }
}
