//! Default message parser: header unfolding, field extraction and date parsing.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use tracing::warn;

use crate::error::MalformedMessageError;
use crate::model::address::EmailAddress;
use crate::model::message::{normalize_id, Message};
use crate::parser::MessageParser;

/// Headers lifted into [`Message`] fields instead of the header sequence.
const LIFTED_HEADERS: [&str; 6] = ["from", "sender", "to", "date", "subject", "message-id"];

/// Parses one decoded segment (or a bare `.eml` message) into a [`Message`].
///
/// The optional envelope line (`From sender  ctime`) is used as a fallback
/// for the author and the date. Only the `Message-Id` header is required.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderParser;

impl MessageParser for HeaderParser {
    fn parse_message(&self, raw: &str) -> Result<Message, MalformedMessageError> {
        let (envelope, rest) = split_envelope(raw);
        let (header_text, body) = split_header_block(rest);
        if header_text.trim().is_empty() {
            return Err(MalformedMessageError::new("no header block"));
        }

        let mut headers = unfold_headers(header_text);

        let id = get_header(&headers, "message-id")
            .map(normalize_id)
            .unwrap_or_default()
            .to_string();
        if id.is_empty() {
            return Err(MalformedMessageError::new("missing Message-Id header"));
        }

        let author = get_header(&headers, "from")
            .map(EmailAddress::parse)
            .or_else(|| envelope.map(|(sender, _)| EmailAddress::parse(sender)))
            .unwrap_or_default();

        let sender = get_header(&headers, "sender")
            .map(EmailAddress::parse)
            .unwrap_or_else(|| author.clone());

        let recipients = get_header(&headers, "to")
            .map(EmailAddress::parse_list)
            .unwrap_or_default();

        let date = get_header(&headers, "date")
            .and_then(parse_date)
            .or_else(|| envelope.and_then(|(_, ctime)| parse_date(ctime)))
            .unwrap_or_else(|| DateTime::UNIX_EPOCH.fixed_offset());

        let subject = get_header(&headers, "subject")
            .unwrap_or_default()
            .to_string();

        headers.retain(|(name, _)| {
            !LIFTED_HEADERS
                .iter()
                .any(|lifted| name.eq_ignore_ascii_case(lifted))
        });

        Ok(Message {
            id,
            author,
            sender,
            recipients,
            date,
            subject,
            headers,
            body: body.to_string(),
        })
    }
}

/// Split off the `From sender  ctime` envelope line, if present.
///
/// Returns `((sender, ctime), remaining_text)`.
fn split_envelope(raw: &str) -> (Option<(&str, &str)>, &str) {
    let Some(line) = raw.strip_prefix("From ") else {
        return (None, raw);
    };
    let (line, rest) = match line.find('\n') {
        Some(pos) => (&line[..pos], &line[pos + 1..]),
        None => (line, ""),
    };
    let line = line.trim();
    let (sender, ctime) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(s, d)| (s, d.trim()));
    (Some((sender, ctime)), rest)
}

/// Split at the first empty line into `(headers, body)`.
fn split_header_block(text: &str) -> (&str, &str) {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']).is_empty() {
            return (&text[..offset], &text[offset + line.len()..]);
        }
        offset += line.len();
    }
    (text, "")
}

/// Unfold headers: join continuation lines (starting with space or tab) with the previous header.
///
/// Returns `(name, value)` pairs with the name's original casing.
fn unfold_headers(text: &str) -> Vec<(String, String)> {
    let mut result: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = result.last_mut() {
                last.1.push(' ');
                last.1.push_str(line.trim());
            }
        } else if let Some(colon_pos) = line.find(':') {
            let name = line[..colon_pos].trim().to_string();
            let value = line[colon_pos + 1..].trim().to_string();
            result.push((name, value));
        } else {
            warn!(line = line, "Skipping header line without a colon");
        }
    }

    result
}

/// Get the first value for a header name (case-insensitive).
fn get_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Envelope `ctime` stamps (`Tue Jan 02 10:30:00 2024`), zero- or space-padded day.
const CTIME_FORMATS: [&str; 2] = ["%a %b %d %H:%M:%S %Y", "%a %b %e %H:%M:%S %Y"];

/// Parse a `Date:` header value or an envelope timestamp.
///
/// RFC 2822 (obsolete zone names such as `EST` included) and RFC 3339 keep
/// their UTC offset. Envelope `ctime` stamps carry no zone and are taken as
/// UTC. Anything else goes through `mail-parser`'s lenient date parser.
pub fn parse_date(date_str: &str) -> Option<DateTime<FixedOffset>> {
    let trimmed = date_str.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parsed = DateTime::parse_from_rfc2822(trimmed)
        .or_else(|_| DateTime::parse_from_rfc3339(trimmed))
        .ok()
        .or_else(|| parse_ctime(trimmed))
        .or_else(|| mail_parser_date(trimmed));
    if parsed.is_none() {
        warn!(date = trimmed, "Could not parse date");
    }
    parsed
}

fn parse_ctime(s: &str) -> Option<DateTime<FixedOffset>> {
    CTIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|ndt| Utc.from_utc_datetime(&ndt).fixed_offset())
}

/// Attempt to parse a date using `mail-parser`'s built-in parser.
fn mail_parser_date(input: &str) -> Option<DateTime<FixedOffset>> {
    use mail_parser::MessageParser;

    // Wrap input in a minimal RFC 5322 message so mail-parser can parse it
    let fake_msg = format!("Date: {input}\n\n");
    let parsed = MessageParser::default().parse(fake_msg.as_bytes())?;
    let dt = parsed.date()?.to_rfc3339();
    DateTime::parse_from_rfc3339(&dt).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = "From duke@openjdk.org  Mon Jan 01 00:00:00 2024\n\
                          From: Duke <duke at openjdk.org>\n\
                          To: a@x.org, \"B, Bee\" <b@x.org>\n\
                          Date: Tue, 02 Jan 2024 10:30:00 +0100\n\
                          Subject: RFR: 8123456: Fix the\n\
                          \tthing\n\
                          Message-Id: <pr.1@git.openjdk.org>\n\
                          In-Reply-To: <pr.0@git.openjdk.org>\n\
                          X-Mailer: bridge\n\
                          \n\
                          Looks good.\n\
                          \n\
                          Thanks\n";

    #[test]
    fn test_parse_message_fields() {
        let msg = HeaderParser.parse_message(SIMPLE).unwrap();
        assert_eq!(msg.id, "<pr.1@git.openjdk.org>");
        assert_eq!(msg.author, EmailAddress::new("Duke", "duke@openjdk.org"));
        assert_eq!(msg.sender, msg.author);
        assert_eq!(msg.recipients.len(), 2);
        assert_eq!(msg.recipients[1].display_name, "B, Bee");
        assert_eq!(msg.subject, "RFR: 8123456: Fix the thing");
        assert_eq!(
            msg.date.format("%Y-%m-%d %H:%M %z").to_string(),
            "2024-01-02 10:30 +0100"
        );
        assert_eq!(msg.in_reply_to(), Some("<pr.0@git.openjdk.org>"));
        assert_eq!(msg.body, "Looks good.\n\nThanks\n");
    }

    #[test]
    fn test_remaining_headers_keep_order_and_case() {
        let msg = HeaderParser.parse_message(SIMPLE).unwrap();
        assert_eq!(
            msg.headers,
            vec![
                ("In-Reply-To".to_string(), "<pr.0@git.openjdk.org>".to_string()),
                ("X-Mailer".to_string(), "bridge".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_message_id() {
        let err = HeaderParser
            .parse_message("From a  d\nFrom: a@x.org\n\nbody\n")
            .unwrap_err();
        assert_eq!(err.reason, "missing Message-Id header");
    }

    #[test]
    fn test_no_header_block() {
        let err = HeaderParser.parse_message("From a  d\n\nbody").unwrap_err();
        assert_eq!(err.reason, "no header block");
    }

    #[test]
    fn test_envelope_fallbacks() {
        let msg = HeaderParser
            .parse_message("From a@x.org  Mon Jan 01 00:01:00 2024\nMessage-Id: 1\n\nHello")
            .unwrap();
        assert_eq!(msg.author.address, "a@x.org");
        assert_eq!(msg.date.to_rfc3339(), "2024-01-01T00:01:00+00:00");
        assert_eq!(msg.body, "Hello");
    }

    #[test]
    fn test_bare_message_without_envelope() {
        let msg = HeaderParser
            .parse_message("Message-Id: <x@y>\nSender: bot@x.org\nFrom: A <a@x.org>\n\nbody\r\n")
            .unwrap();
        assert_eq!(msg.sender.address, "bot@x.org");
        assert_eq!(msg.author.address, "a@x.org");
        assert_eq!(msg.body, "body\r\n");
        assert_eq!(msg.date, DateTime::UNIX_EPOCH.fixed_offset());
    }

    #[test]
    fn test_split_envelope() {
        let (env, rest) = split_envelope("From a@x.org  Mon Jan 01 00:00:00 2024\nX: y\n");
        assert_eq!(env, Some(("a@x.org", "Mon Jan 01 00:00:00 2024")));
        assert_eq!(rest, "X: y\n");
        assert_eq!(split_envelope("X: y\n"), (None, "X: y\n"));
    }

    #[test]
    fn test_unfold_headers() {
        let text = "Subject: This is a long\n\tsubject line\nFrom: user@example.com\n";
        let headers = unfold_headers(text);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].0, "Subject");
        assert_eq!(headers[0].1, "This is a long subject line");
    }

    #[test]
    fn test_parse_date_rfc2822_keeps_offset() {
        let dt = parse_date("Thu, 04 Jan 2024 10:00:00 +0200").unwrap();
        assert_eq!(dt.offset().local_minus_utc(), 2 * 3600);
    }

    #[test]
    fn test_parse_date_ctime() {
        let dt = parse_date("Mon Jan 01 00:00:00 2024").unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M").to_string(), "2024-01-01 00:00");
    }

    #[test]
    fn test_parse_date_named_tz() {
        assert!(parse_date("Thu, 04 Jan 2024 10:00:00 EST").is_some());
    }

    #[test]
    fn test_parse_date_rfc3339() {
        let dt = parse_date("2024-01-02T10:30:00-05:00").unwrap();
        assert_eq!(dt.offset().local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn test_parse_date_reads_encoder_output() {
        let dt = DateTime::parse_from_rfc3339("2024-01-02T10:30:00+01:00").unwrap();
        assert_eq!(parse_date(&dt.to_rfc2822()), Some(dt));
    }

    #[test]
    fn test_parse_date_garbage() {
        assert!(parse_date("").is_none());
    }
}
