//! Reversible escaping used inside archives.
//!
//! Two independent transforms:
//! - `From ` lines in a body get one extra leading `>` so the splitter never
//!   mistakes them for a boundary (`>From ` becomes `>>From `, and so on).
//! - Runs of non-ASCII characters become `=?utf-8?b?<base64>?=` words.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::CodecError;

const WORD_START: &str = "=?utf-8?b?";
const WORD_END: &str = "?=";

/// Prefix every line matching `^>*From ` with one more `>`.
pub fn escape_from_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    for line in text.split_inclusive('\n') {
        if is_quoted_from(line) {
            out.push('>');
        }
        out.push_str(line);
    }
    out
}

/// Strip one leading `>` from every line matching `^>+From `.
pub fn unescape_from_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        match line.strip_prefix('>') {
            Some(rest) if is_quoted_from(rest) => out.push_str(rest),
            _ => out.push_str(line),
        }
    }
    out
}

/// `>*From ` at the start of the line.
fn is_quoted_from(line: &str) -> bool {
    line.trim_start_matches('>').starts_with("From ")
}

/// Replace each maximal run of non-ASCII characters with an encoded-word.
pub fn encode_encoded_words(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(|c: char| !c.is_ascii()) {
        out.push_str(&rest[..start]);
        let run = &rest[start..];
        let len = run.find(|c: char| c.is_ascii()).unwrap_or(run.len());
        out.push_str(WORD_START);
        out.push_str(&STANDARD.encode(run[..len].as_bytes()));
        out.push_str(WORD_END);
        rest = &run[len..];
    }
    out.push_str(rest);
    out
}

/// Replace every `=?utf-8?b?<payload>?=` with the decoded text.
///
/// Only the lowercase UTF-8/base64 form is recognized and a word never spans
/// lines. A payload that is not base64, or not UTF-8 once decoded, is an error.
pub fn decode_encoded_words(text: &str) -> Result<String, CodecError> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(WORD_START) {
        let after = &rest[start + WORD_START.len()..];
        let line = &after[..after.find(['\r', '\n']).unwrap_or(after.len())];

        let Some(end) = line.find(WORD_END) else {
            // Not a word on this line; keep the marker text as-is.
            out.push_str(&rest[..start + WORD_START.len()]);
            rest = after;
            continue;
        };

        out.push_str(&rest[..start]);
        out.push_str(&decode_payload(&line[..end])?);
        rest = &after[end + WORD_END.len()..];
    }

    out.push_str(rest);
    Ok(out)
}

fn decode_payload(payload: &str) -> Result<String, CodecError> {
    let bytes = STANDARD
        .decode(payload)
        .map_err(|source| CodecError::InvalidBase64 {
            payload: payload.to_string(),
            source,
        })?;
    String::from_utf8(bytes).map_err(|source| CodecError::InvalidUtf8 {
        payload: payload.to_string(),
        source,
    })
}
