//! Email addresses as they appear in archive headers.

use std::borrow::Cow;

/// A parsed email address.
///
/// # Examples
/// - `"Duke <duke@openjdk.org>"` → `display_name = "Duke"`, `address = "duke@openjdk.org"`
/// - `"duke@openjdk.org"` → `display_name = ""`, `address = "duke@openjdk.org"`
/// - `"Duke <duke at openjdk.org>"` → same as the first (archives store the obfuscated form)
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EmailAddress {
    /// Human-readable display name (may be empty).
    pub display_name: String,
    /// The bare email address (`user@domain`).
    pub address: String,
}

impl EmailAddress {
    /// Build an address from its parts.
    pub fn new(display_name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            address: address.into(),
        }
    }

    /// Parse a single email address from a header value.
    ///
    /// Supported formats:
    /// - `"user@domain.com"`
    /// - `"<user@domain.com>"`
    /// - `"Display Name <user@domain.com>"`
    /// - `"\"Display, Name\" <user@domain.com>"`
    /// - any of the above with `user at domain.com`
    ///
    /// If parsing fails, the raw string is stored as `address`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::default();
        }

        if let (Some(angle_start), Some(angle_end)) = (trimmed.rfind('<'), trimmed.rfind('>')) {
            if angle_end > angle_start {
                let addr = deobfuscate(trimmed[angle_start + 1..angle_end].trim());
                let display_name = strip_quotes(&trimmed[..angle_start]);
                return Self {
                    display_name,
                    address: addr,
                };
            }
        }

        Self {
            display_name: String::new(),
            address: deobfuscate(trimmed),
        }
    }

    /// Parse a comma-separated list of addresses.
    ///
    /// Handles quoted commas: `"Last, First" <a@b.com>, other@c.com`
    pub fn parse_list(raw: &str) -> Vec<Self> {
        let mut results = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut in_angle = false;
        let mut escaped = false;

        for ch in raw.chars() {
            if escaped {
                escaped = false;
                current.push(ch);
                continue;
            }
            match ch {
                '\\' if in_quotes => {
                    escaped = true;
                    current.push(ch);
                }
                '"' => {
                    in_quotes = !in_quotes;
                    current.push(ch);
                }
                '<' if !in_quotes => {
                    in_angle = true;
                    current.push(ch);
                }
                '>' if !in_quotes => {
                    in_angle = false;
                    current.push(ch);
                }
                ',' if !in_quotes && !in_angle => {
                    let addr = Self::parse(&current);
                    if !addr.address.is_empty() {
                        results.push(addr);
                    }
                    current.clear();
                }
                _ => current.push(ch),
            }
        }

        let addr = Self::parse(&current);
        if !addr.address.is_empty() {
            results.push(addr);
        }

        results
    }

    /// Part of the address before the `@` (the whole address if there is none).
    pub fn local_part(&self) -> &str {
        self.address
            .split_once('@')
            .map_or(self.address.as_str(), |(local, _)| local)
    }

    /// Part of the address after the `@`, if any.
    pub fn domain(&self) -> Option<&str> {
        self.address.split_once('@').map(|(_, domain)| domain)
    }

    /// Format for display: `"Display Name <address>"` or just `"address"`.
    pub fn display(&self) -> String {
        if self.display_name.is_empty() {
            self.address.clone()
        } else {
            format!("{} <{}>", self.display_name, self.address)
        }
    }

    /// Format for a header value: like [`display`](Self::display), but the
    /// name is quoted when it holds characters that would split an address
    /// list (`"Last, First" <a@b>`).
    pub fn to_header(&self) -> String {
        if self.display_name.is_empty() {
            self.address.clone()
        } else {
            format!("{} <{}>", quote_display_name(&self.display_name), self.address)
        }
    }

    /// Format with the `@` spelled out, as published in public archives:
    /// `"Display Name <user at domain>"`.
    pub fn obfuscated(&self) -> String {
        let addr = match self.domain() {
            Some(domain) => format!("{} at {}", self.local_part(), domain),
            None => self.address.clone(),
        };
        if self.display_name.is_empty() {
            format!("<{addr}>")
        } else {
            format!("{} <{}>", quote_display_name(&self.display_name), addr)
        }
    }
}

/// Quote a display name containing list or address delimiters.
///
/// Inside the quotes `"` and `\` are backslash-escaped.
fn quote_display_name(name: &str) -> Cow<'_, str> {
    if !name.contains([',', '"', '<', '>', ';', ':', '\\']) {
        return Cow::Borrowed(name);
    }
    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push('"');
    for ch in name.chars() {
        if ch == '"' || ch == '\\' {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    Cow::Owned(quoted)
}

/// Turn `user at domain` back into `user@domain`; other input is returned trimmed.
fn deobfuscate(s: &str) -> String {
    if !s.contains('@') {
        if let Some((local, domain)) = s.split_once(" at ") {
            let (local, domain) = (local.trim(), domain.trim());
            if !local.is_empty() && !domain.is_empty() && !domain.contains(' ') {
                return format!("{local}@{domain}");
            }
        }
    }
    s.to_string()
}

/// Strip surrounding double-quotes (undoing backslash escapes) and trim whitespace.
fn strip_quotes(s: &str) -> String {
    let trimmed = s.trim();
    if !(trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2) {
        return trimmed.to_string();
    }
    let mut out = String::with_capacity(trimmed.len());
    let mut chars = trimmed[1..trimmed.len() - 1].trim().chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    out
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}
