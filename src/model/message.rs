//! The structured message entity exchanged with the parser and the encoder.

use chrono::{DateTime, FixedOffset};

use super::address::EmailAddress;

/// A single archived message.
///
/// The well-known headers (`From`, `Sender`, `To`, `Date`, `Subject`,
/// `Message-Id`) are lifted into fields. Everything else, including
/// `In-Reply-To`, stays in [`Message::headers`] in the order it was seen.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    /// Normalized `Message-Id` (see [`normalize_id`]).
    pub id: String,

    /// Who wrote the message (`From:`).
    pub author: EmailAddress,

    /// Who sent the message (`Sender:`); equal to `author` when absent.
    pub sender: EmailAddress,

    /// Primary recipients (`To:`), in header order.
    pub recipients: Vec<EmailAddress>,

    /// Parsed `Date:` header, keeping the original UTC offset.
    pub date: DateTime<FixedOffset>,

    pub subject: String,

    /// Remaining headers as `(name, value)` pairs, original casing preserved.
    pub headers: Vec<(String, String)>,

    pub body: String,
}

impl Message {
    /// Create a message with only an identifier and an author.
    ///
    /// The sender defaults to the author and the date to the Unix epoch.
    pub fn new(id: impl Into<String>, author: EmailAddress) -> Self {
        Self {
            id: id.into(),
            sender: author.clone(),
            author,
            recipients: Vec::new(),
            date: DateTime::UNIX_EPOCH.fixed_offset(),
            subject: String::new(),
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Append a header to the ordered header sequence.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Whether a header with this name (case-insensitive) is present.
    pub fn has_header(&self, name: &str) -> bool {
        self.header_value(name).is_some()
    }

    /// Value of the first header with this name (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The message this one replies to, if it is not a thread root.
    ///
    /// Only the presence of the header matters: a blank `In-Reply-To` still
    /// makes the message a reply (to the empty id, which never resolves).
    pub fn in_reply_to(&self) -> Option<&str> {
        self.header_value("In-Reply-To").map(normalize_id)
    }
}

/// Normalize a `Message-Id` / `In-Reply-To` value for lookups.
///
/// Surrounding whitespace is dropped. When the value contains a `<...>`
/// token, only the first one (brackets included) is kept.
pub fn normalize_id(raw: &str) -> &str {
    let trimmed = raw.trim();
    if let Some(start) = trimmed.find('<') {
        if let Some(end) = trimmed[start..].find('>') {
            return &trimmed[start..start + end + 1];
        }
    }
    trimmed
}
