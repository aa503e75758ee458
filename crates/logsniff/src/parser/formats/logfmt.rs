use crate::parser::registry::FormatDescriptor;
use crate::parser::timestamp::TimestampLayout;
use crate::parser::traits::{LineCaptures, LineMatcher};

pub const LOGFMT_NAME: &str = "Logfmt (key=value)";

const TIME_KEYS: [&str; 3] = ["ts", "time", "timestamp"];

/// Minimum number of pairs before a line counts as logfmt.
const MIN_PAIRS: usize = 2;

/// `key=value key="quoted value" ...` covering the whole line.
pub struct LogfmtMatcher;

impl LineMatcher for LogfmtMatcher {
    fn captures(&self, line: &str) -> Option<LineCaptures> {
        let pairs = parse_pairs(line)?;
        if pairs.len() < MIN_PAIRS {
            return None;
        }

        let timestamp_key = TIME_KEYS
            .iter()
            .copied()
            .find(|key| pairs.iter().any(|(k, _)| k == key));

        let mut captures = LineCaptures::default();
        for (key, value) in pairs {
            if captures.timestamp.is_none() && Some(key.as_str()) == timestamp_key {
                captures.timestamp = Some(value);
            } else {
                captures.fields.push((key, value));
            }
        }

        Some(captures)
    }
}

/// Strict tokenizer: every token must be a `key=value` pair and every quote
/// must be closed, otherwise the line is not logfmt.
fn parse_pairs(text: &str) -> Option<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    let mut chars = text.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        if chars.peek().is_none() {
            return Some(pairs);
        }

        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c.is_whitespace() || c == '"' {
                break;
            }
            key.push(c);
            chars.next();
        }

        if key.is_empty() || chars.next() != Some('=') {
            return None;
        }

        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '\\' => value.push(chars.next()?),
                    '"' => {
                        closed = true;
                        break;
                    }
                    _ => value.push(c),
                }
            }
            if !closed {
                return None;
            }
            // a closing quote must end the token
            if chars.peek().is_some_and(|c| !c.is_whitespace()) {
                return None;
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                if c == '"' {
                    return None;
                }
                value.push(c);
                chars.next();
            }
        }

        pairs.push((key, value));
    }
}

pub fn logfmt() -> FormatDescriptor {
    FormatDescriptor::new(LOGFMT_NAME, LogfmtMatcher, TimestampLayout::Rfc3339OrEpoch)
}
