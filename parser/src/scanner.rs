//! @ai:module:intent Split text into numbered lines and strip comment delimiters
//! @ai:module:layer application
//! @ai:module:public_api scan_lines, ScannedLine
//! @ai:module:depends_on language
//! @ai:module:stateless true

use crate::language::{BlockDelimiter, CommentProfile, Opener};

/// @ai:intent One physical line with its comment content, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedLine {
    /// 1-based line number.
    pub number: usize,
    /// Comment text with delimiters and surrounding whitespace removed.
    pub stripped: Option<String>,
    pub raw: String,
    /// Whether anything outside a comment appears on the line.
    pub has_code: bool,
}

impl ScannedLine {
    /// @ai:intent Check if the line carries neither code nor comment text
    /// @ai:example ("   ") -> true
    /// @ai:example (" */") -> true
    /// @ai:effects pure
    pub fn is_blank(&self) -> bool {
        !self.has_code && self.stripped.as_deref().map_or(true, str::is_empty)
    }
}

/// @ai:intent Scan every line of `text` with the given comment profile
/// @ai:post result has one entry per line, numbered from 1
/// @ai:effects pure
pub fn scan_lines(text: &str, profile: &CommentProfile) -> Vec<ScannedLine> {
    let mut open_block: Option<&BlockDelimiter> = None;

    text.lines()
        .enumerate()
        .map(|(idx, raw)| {
            let (stripped, has_code) = scan_line(raw, profile, &mut open_block);
            ScannedLine {
                number: idx + 1,
                stripped,
                raw: raw.to_string(),
                has_code,
            }
        })
        .collect()
}

/// @ai:intent Extract the first comment content from a single line
/// @ai:effects pure
fn scan_line<'p>(
    line: &str,
    profile: &'p CommentProfile,
    open_block: &mut Option<&'p BlockDelimiter>,
) -> (Option<String>, bool) {
    let mut pieces: Vec<String> = Vec::new();
    let mut has_code = false;
    let mut rest = line;

    loop {
        if let Some(block) = *open_block {
            match rest.find(block.close.as_str()) {
                Some(pos) => {
                    pieces.push(clean_block_text(&rest[..pos], block));
                    rest = &rest[pos + block.close.len()..];
                    *open_block = None;
                    continue;
                }
                None => {
                    pieces.push(clean_block_text(rest, block));
                    break;
                }
            }
        }

        match profile.first_opener(rest) {
            Some((pos, opener)) => {
                if !rest[..pos].trim().is_empty() {
                    has_code = true;
                }
                match opener {
                    Opener::Line(prefix) => {
                        pieces.push(clean_line_text(&rest[pos + prefix.len()..], prefix));
                        break;
                    }
                    Opener::Block(block) => {
                        rest = &rest[pos + block.open.len()..];
                        *open_block = Some(block);
                    }
                }
            }
            None => {
                if !rest.trim().is_empty() {
                    has_code = true;
                }
                break;
            }
        }
    }

    let stripped = if pieces.is_empty() {
        None
    } else {
        let first = pieces.iter().position(|p| !p.is_empty()).unwrap_or(0);
        Some(pieces.swap_remove(first))
    };

    (stripped, has_code)
}

/// @ai:intent Strip repeated prefix characters and a doc `!` after a line prefix
/// @ai:example ("/ text", "//") -> "text"
/// @ai:example ("## text", "#") -> "text"
/// @ai:effects pure
fn clean_line_text(text: &str, prefix: &str) -> String {
    let mut text = match prefix.chars().last() {
        Some(last) => text.trim_start_matches(last),
        None => text,
    };
    if let Some(after) = text.strip_prefix('!') {
        if after.is_empty() || after.starts_with(char::is_whitespace) {
            text = after;
        }
    }
    text.trim().to_string()
}

fn clean_block_text(text: &str, block: &BlockDelimiter) -> String {
    let text = text.trim();
    match block.continuation.as_deref() {
        Some(cont) if !cont.is_empty() => text.trim_start_matches(cont).trim().to_string(),
        _ => text.to_string(),
    }
}
