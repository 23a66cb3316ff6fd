//! Archive-level entry points: split, decode, parse, and thread.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MboxError, Result};
use crate::model::conversation::Conversation;
use crate::model::message::Message;
use crate::parser::escape::{decode_encoded_words, unescape_from_lines};
use crate::parser::header::HeaderParser;
use crate::parser::split::split_segments;
use crate::parser::MessageParser;
use crate::threading::{build_conversations, Diagnostics, Resolution, TracingDiagnostics};

/// Options for [`parse_archive_with`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveOptions {
    pub resolution: Resolution,
}

/// Rebuild the conversations of an archive.
///
/// Uses [`HeaderParser`], single-pass reply resolution, and reports dropped
/// replies as `tracing` events.
pub fn parse_archive(text: &str) -> Result<Vec<Conversation>> {
    parse_archive_with(
        text,
        &HeaderParser,
        &mut TracingDiagnostics,
        &ArchiveOptions::default(),
    )
}

/// Rebuild the conversations of an archive with an explicit parser,
/// diagnostics sink, and options.
///
/// Fails on the first segment that cannot be decoded or parsed; no partial
/// result is returned in that case.
pub fn parse_archive_with(
    text: &str,
    parser: &dyn MessageParser,
    diagnostics: &mut dyn Diagnostics,
    options: &ArchiveOptions,
) -> Result<Vec<Conversation>> {
    let messages = parse_messages(text, parser)?;
    let count = messages.len();
    let conversations = build_conversations(messages, options.resolution, diagnostics);
    debug!(
        messages = count,
        conversations = conversations.len(),
        "Parsed archive"
    );
    Ok(conversations)
}

/// Split and decode every segment, returning the messages in archive order.
pub fn parse_messages(text: &str, parser: &dyn MessageParser) -> Result<Vec<Message>> {
    split_segments(text)
        .enumerate()
        .map(|(segment, raw)| decode_segment(segment, raw, parser))
        .collect()
}

fn decode_segment(segment: usize, raw: &str, parser: &dyn MessageParser) -> Result<Message> {
    let unescaped = unescape_from_lines(raw);
    let decoded = decode_encoded_words(&unescaped)
        .map_err(|source| MboxError::Codec { segment, source })?;
    parser
        .parse_message(&decoded)
        .map_err(|source| MboxError::MalformedMessage { segment, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MalformedMessageError;
    use crate::threading::UnresolvedReply;

    const TWO: &str = "\n\
        From a@x.org  Mon Jan 01 00:00:00 2024\n\
        From: A <a@x.org>\n\
        Message-Id: 1\n\
        \n\
        Hello\n\
        \n\
        From b@x.org  Mon Jan 01 00:01:00 2024\n\
        From: B <b@x.org>\n\
        Message-Id: 2\n\
        In-Reply-To: 1\n\
        \n\
        Reply\n";

    #[test]
    fn test_parse_two_message_thread() {
        let convs = parse_archive(TWO).unwrap();
        assert_eq!(convs.len(), 1);
        assert_eq!(convs[0].first().id, "1");
        assert_eq!(convs[0].first().body, "Hello");
        let replies: Vec<&str> = convs[0].replies("1").map(|m| m.id.as_str()).collect();
        assert_eq!(replies, vec!["2"]);
    }

    #[test]
    fn test_empty_archive() {
        assert!(parse_archive("").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_segment_fails_whole_parse() {
        let archive = format!("{TWO}\nFrom c@x.org  Mon Jan 01 00:02:00 2024\nFrom: C <c@x.org>\n\nNo id\n");
        let err = parse_archive(&archive).unwrap_err();
        assert!(matches!(err, MboxError::MalformedMessage { segment: 2, .. }));
    }

    #[test]
    fn test_codec_error_carries_segment() {
        let archive = "From a  d\nMessage-Id: 1\nSubject: =?utf-8?b?@@@?=\n\nx\n";
        let err = parse_archive(archive).unwrap_err();
        assert!(matches!(err, MboxError::Codec { segment: 0, .. }));
    }

    #[test]
    fn test_injected_parser_and_diagnostics() {
        let parser = |raw: &str| -> std::result::Result<Message, MalformedMessageError> {
            HeaderParser.parse_message(raw).map(|mut m| {
                m.subject = "seen".to_string();
                m
            })
        };
        let archive = format!("{TWO}\nFrom c  d\nMessage-Id: 3\nIn-Reply-To: 42\n\nlost\n");
        let mut diags: Vec<UnresolvedReply> = Vec::new();
        let convs =
            parse_archive_with(&archive, &parser, &mut diags, &ArchiveOptions::default()).unwrap();
        assert_eq!(convs.len(), 1);
        assert_eq!(convs[0].first().subject, "seen");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message_id, "3");
    }
}
