//! MBOX boundary splitter.
//!
//! Cuts an in-memory archive into raw per-message segments. A boundary is a
//! line starting with `From ` that follows an empty line. Escaped `>From `
//! lines never start a message.
//!
//! The start of the archive counts as an empty line, so a `From ` line at
//! offset 0 (after an optional BOM) is a boundary too. The strict rule
//! requires the empty line even there and would skip that first message.

use tracing::debug;

/// Lazy iterator over the raw segments of an archive.
///
/// Segments borrow from the archive text and come out in archive order.
/// The iterator is `Clone`, so a copy taken before iteration restarts it.
///
/// A segment runs from its `From ` line up to the end of the line before
/// the blank line that precedes the next boundary; the last one runs to the
/// end of the archive, minus its final line break. Either way the line
/// break that terminated the message's last line is not part of it.
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    text: &'a str,
    pos: usize,
    prev_blank: bool,
}

/// Split an archive into raw segments.
pub fn split_segments(text: &str) -> Segments<'_> {
    // Skip BOM if present at very start
    let pos = if text.starts_with('\u{feff}') {
        '\u{feff}'.len_utf8()
    } else {
        0
    };
    Segments {
        text,
        pos,
        // Archive start stands in for the empty line before a boundary.
        prev_blank: true,
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let text = self.text;
        let mut start: Option<usize> = None;
        let mut prev_blank = self.prev_blank;
        let mut prev_content_end = self.pos;
        let mut cut = self.pos;

        while self.pos < text.len() {
            let line_start = self.pos;
            let line_end = text[line_start..]
                .find('\n')
                .map_or(text.len(), |i| line_start + i + 1);
            let line = &text[line_start..line_end];
            let content = line_content(line);

            if is_mbox_separator(line) {
                if prev_blank {
                    if let Some(s) = start {
                        let segment = &text[s..cut];
                        if !segment.is_empty() {
                            // Leave `pos` on this line so the next call starts here.
                            self.prev_blank = true;
                            return Some(segment);
                        }
                    }
                    start = Some(line_start);
                } else if start.is_some() {
                    debug!(
                        offset = line_start,
                        "Unescaped 'From ' line without preceding blank line, not a boundary"
                    );
                }
            }

            if content.is_empty() {
                cut = prev_content_end;
            }
            prev_content_end = line_start + content.len();
            prev_blank = content.is_empty();
            self.pos = line_end;
        }

        // The last line break of the archive closes the final message.
        self.prev_blank = prev_blank;
        start
            .map(|s| &text[s..prev_content_end.max(s)])
            .filter(|s| !s.is_empty())
    }
}

/// A line without its `\n` or `\r\n` terminator.
fn line_content(line: &str) -> &str {
    match line.strip_suffix('\n') {
        Some(l) => l.strip_suffix('\r').unwrap_or(l),
        None => line,
    }
}

/// Check whether a line is an MBOX separator (`From ` at the start).
fn is_mbox_separator(line: &str) -> bool {
    line.starts_with("From ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_mbox_separator() {
        assert!(is_mbox_separator(
            "From user@example.com Thu Jan 01 00:00:00 2024\n"
        ));
        assert!(!is_mbox_separator("from user@example.com\n")); // lowercase
        assert!(!is_mbox_separator(">From user@example.com\n")); // escaped
        assert!(!is_mbox_separator("Subject: From here\n"));
    }

    #[test]
    fn test_line_content() {
        assert_eq!(line_content("abc\n"), "abc");
        assert_eq!(line_content("abc\r\n"), "abc");
        assert_eq!(line_content("\n"), "");
        assert_eq!(line_content("abc"), "abc");
    }

    #[test]
    fn test_two_messages() {
        let archive = "\nFrom a@x.org  Mon Jan 01 00:00:00 2024\nMessage-Id: 1\n\nHello\n\
                       \nFrom b@x.org  Mon Jan 01 00:01:00 2024\nMessage-Id: 2\n\nReply\n";
        let segments: Vec<&str> = split_segments(archive).collect();
        assert_eq!(
            segments,
            vec![
                "From a@x.org  Mon Jan 01 00:00:00 2024\nMessage-Id: 1\n\nHello",
                "From b@x.org  Mon Jan 01 00:01:00 2024\nMessage-Id: 2\n\nReply",
            ]
        );
    }

    #[test]
    fn test_no_boundaries() {
        assert_eq!(split_segments("").count(), 0);
        assert_eq!(split_segments("just some text\n\nmore\n").count(), 0);
    }

    #[test]
    fn test_boundary_at_archive_start() {
        let segments: Vec<&str> = split_segments("From a  date\nMessage-Id: 1\n").collect();
        assert_eq!(segments, vec!["From a  date\nMessage-Id: 1"]);
    }

    #[test]
    fn test_preamble_is_ignored() {
        let segments: Vec<&str> = split_segments("junk\n\nFrom a  date\nX: y\n").collect();
        assert_eq!(segments, vec!["From a  date\nX: y"]);
    }

    #[test]
    fn test_escaped_and_unpreceded_from_lines_stay_in_body() {
        let archive = "From a  date\nMessage-Id: 1\n\nbody\n>From the top\n\n>>From again\nFrom no blank before\n";
        let segments: Vec<&str> = split_segments(archive).collect();
        assert_eq!(segments.len(), 1);
        assert_eq!(Some(segments[0]), archive.strip_suffix('\n'));
    }

    #[test]
    fn test_extra_blank_lines_belong_to_previous_message() {
        let archive = "\nFrom a  d\n\nHello\n\n\nFrom b  d\n\nBye";
        let segments: Vec<&str> = split_segments(archive).collect();
        assert_eq!(segments, vec!["From a  d\n\nHello\n", "From b  d\n\nBye"]);
    }

    #[test]
    fn test_consecutive_boundaries() {
        let archive = "From a  d\n\nFrom b  d\n\nFrom c  d\n";
        let segments: Vec<&str> = split_segments(archive).collect();
        assert_eq!(segments, vec!["From a  d", "From b  d", "From c  d"]);
    }

    #[test]
    fn test_crlf_line_endings() {
        let archive = "\r\nFrom a  d\r\nX: 1\r\n\r\nFrom b  d\r\nX: 2\r\n";
        let segments: Vec<&str> = split_segments(archive).collect();
        assert_eq!(segments, vec!["From a  d\r\nX: 1", "From b  d\r\nX: 2"]);
    }

    #[test]
    fn test_trailing_blank_lines_keep_body_newlines() {
        let segments: Vec<&str> = split_segments("From a  d\n\nbody\n\n").collect();
        assert_eq!(segments, vec!["From a  d\n\nbody\n"]);
    }

    #[test]
    fn test_with_bom() {
        let archive = "\u{feff}From a  d\nX: 1\n";
        assert_eq!(split_segments(archive).count(), 1);
    }

    #[test]
    fn test_restartable() {
        let archive = "From a  d\n\nFrom b  d\n";
        let segments = split_segments(archive);
        let again = segments.clone();
        assert_eq!(segments.count(), 2);
        assert_eq!(again.count(), 2);
    }
}
