//! Format messages as appendable MBOX fragments.

use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{MboxError, Result};
use crate::model::address::EmailAddress;
use crate::model::message::Message;
use crate::parser::escape::{encode_encoded_words, escape_from_lines};

/// `ctime`-style timestamp used on the envelope line.
const CTIME_FORMAT: &str = "%a %b %d %H:%M:%S %Y";

/// Formatting knobs for [`format_message_with`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatOptions {
    /// Render `From:`/`Sender:` as `Name <user at domain>`.
    pub obfuscate_addresses: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            obfuscate_addresses: true,
        }
    }
}

/// Format one message as an MBOX fragment with default options.
pub fn format_message(msg: &Message) -> String {
    format_message_with(msg, &FormatOptions::default())
}

/// Format one message as an MBOX fragment.
///
/// The fragment starts with an empty line and the envelope line, so it can
/// be appended to an existing archive as-is. Body `From ` lines are escaped
/// and every non-ASCII run in the fragment becomes an encoded-word. Display
/// names containing list delimiters are quoted.
pub fn format_message_with(msg: &Message, options: &FormatOptions) -> String {
    let person = |addr: &EmailAddress| {
        if options.obfuscate_addresses {
            addr.obfuscated()
        } else {
            addr.to_header()
        }
    };

    let mut out = String::with_capacity(msg.body.len() + 512);
    out.push('\n');
    let _ = writeln!(
        out,
        "From {}  {}",
        msg.sender.address,
        msg.date.format(CTIME_FORMAT)
    );
    let _ = writeln!(out, "From: {}", person(&msg.author));
    if msg.author != msg.sender {
        let _ = writeln!(out, "Sender: {}", person(&msg.sender));
    }
    if !msg.recipients.is_empty() {
        let to: Vec<String> = msg.recipients.iter().map(EmailAddress::to_header).collect();
        let _ = writeln!(out, "To: {}", to.join(", "));
    }
    let _ = writeln!(out, "Date: {}", msg.date.to_rfc2822());
    let _ = writeln!(out, "Subject: {}", msg.subject);
    let _ = writeln!(out, "Message-Id: {}", msg.id);
    for (name, value) in &msg.headers {
        let _ = writeln!(out, "{name}: {value}");
    }
    out.push('\n');
    out.push_str(&escape_from_lines(&msg.body));
    out.push('\n');

    encode_encoded_words(&out)
}

/// Append one formatted message to the archive at `path`, creating it if needed.
pub fn append_message(path: &Path, msg: &Message, options: &FormatOptions) -> Result<()> {
    let fragment = format_message_with(msg, options);
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| MboxError::io(path, e))?;
    file.write_all(fragment.as_bytes())
        .map_err(|e| MboxError::io(path, e))?;
    info!(
        path = %path.display(),
        message_id = %msg.id,
        bytes = fragment.len(),
        "Appended message to archive"
    );
    Ok(())
}
