//! Archive parsing: boundary splitting, escape decoding, and message parsing.

pub mod escape;
pub mod header;
pub mod split;

use crate::error::MalformedMessageError;
use crate::model::message::Message;

/// Turns one decoded raw segment into a [`Message`].
///
/// [`header::HeaderParser`] is the built-in implementation. Closures with the
/// same signature work too, which keeps the archive code independent of any
/// particular header grammar.
pub trait MessageParser {
    /// Parse a segment, failing when no identifier can be extracted.
    fn parse_message(&self, raw: &str) -> Result<Message, MalformedMessageError>;
}

impl<F> MessageParser for F
where
    F: Fn(&str) -> Result<Message, MalformedMessageError>,
{
    fn parse_message(&self, raw: &str) -> Result<Message, MalformedMessageError> {
        self(raw)
    }
}
