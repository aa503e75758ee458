/// ANSI escape code stripping
///
/// Log files captured from terminals or containers often carry color codes
/// (`\x1b[31mERROR\x1b[0m`). They break anchored grammars, so lines are
/// cleaned before detection.

use std::borrow::Cow;

const ESC: char = '\u{1b}';
const BEL: char = '\u{07}';

/// Strip ANSI escape sequences from a line.
///
/// Handles CSI (`ESC [ ... final`), OSC (`ESC ] ... BEL` or `ESC ] ... ESC \`)
/// and two-byte Fe sequences. A lone trailing ESC is dropped.
///
/// Returns `Cow::Borrowed` when the line has no ESC at all.
pub fn strip_ansi_codes(input: &str) -> Cow<'_, str> {
    if !input.contains(ESC) {
        return Cow::Borrowed(input);
    }

    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != ESC {
            output.push(c);
            continue;
        }

        match chars.peek().copied() {
            None => {}
            Some('[') => {
                chars.next();
                // parameters and intermediates up to the final byte 0x40-0x7E
                for b in chars.by_ref() {
                    if ('\u{40}'..='\u{7e}').contains(&b) {
                        break;
                    }
                }
            }
            Some(']') => {
                chars.next();
                while let Some(b) = chars.next() {
                    if b == BEL {
                        break;
                    }
                    if b == ESC && chars.peek() == Some(&'\\') {
                        chars.next();
                        break;
                    }
                }
            }
            Some(next) if ('\u{40}'..='\u{5f}').contains(&next) => {
                chars.next();
            }
            // not a sequence we know; keep the following text
            Some(_) => {}
        }
    }

    Cow::Owned(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_escape_is_borrowed() {
        let out = strip_ansi_codes("plain line");
        assert!(matches!(out, Cow::Borrowed("plain line")));
    }

    #[test]
    fn test_strip_color_codes() {
        let input = "\x1b[32mINFO\x1b[0m server started";
        assert_eq!(strip_ansi_codes(input), "INFO server started");
    }

    #[test]
    fn test_strip_around_syslog_line() {
        let input = "\x1b[1;31m<34>Oct 11 22:14:15 mymachine su: failure\x1b[0m";
        assert_eq!(strip_ansi_codes(input), "<34>Oct 11 22:14:15 mymachine su: failure");
    }

    #[test]
    fn test_strip_osc_hyperlink() {
        let input = "see \x1b]8;;http://example.com\x07link\x1b]8;;\x1b\\ here";
        assert_eq!(strip_ansi_codes(input), "see link here");
    }

    #[test]
    fn test_lone_trailing_escape() {
        assert_eq!(strip_ansi_codes("text\x1b"), "text");
    }

    #[test]
    fn test_fe_sequence() {
        assert_eq!(strip_ansi_codes("a\x1bMb"), "ab");
    }

    #[test]
    fn test_unicode_preserved() {
        assert_eq!(strip_ansi_codes("\x1b[33mwarn\x1b[0m: café ☕"), "warn: café ☕");
    }
}
