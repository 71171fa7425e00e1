//! Filter list metadata from the leading comment block.

use std::time::Duration;

/// Update interval assumed when a list has no `! Expires:` line.
pub const DEFAULT_EXPIRES: Duration = Duration::from_secs(4 * 24 * 60 * 60);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListHeader {
    /// `[Adblock Plus x.y]` marker seen
    pub adblock_plus: bool,
    pub title: Option<String>,
    pub homepage: Option<String>,
    pub version: Option<String>,
    pub expires: Option<Duration>,
}

impl ListHeader {
    pub fn expires_or_default(&self) -> Duration {
        self.expires.unwrap_or(DEFAULT_EXPIRES)
    }
}

/// Parse metadata lines until the first rule line.
pub fn parse_list_header(text: &str) -> ListHeader {
    let mut header = ListHeader::default();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with('[') {
            if line.to_ascii_lowercase().starts_with("[adblock") {
                header.adblock_plus = true;
            }
            continue;
        }

        let Some(comment) = line.strip_prefix('!') else {
            break;
        };

        let Some((key, value)) = comment.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        match key.trim().to_ascii_lowercase().as_str() {
            "title" => header.title = Some(value.to_string()),
            "homepage" => header.homepage = Some(value.to_string()),
            "version" => header.version = Some(value.to_string()),
            "expires" => header.expires = parse_expires(value),
            _ => {}
        }
    }

    header
}

/// `4 days`, `12 hours`, `1 day (update frequency)`.
fn parse_expires(value: &str) -> Option<Duration> {
    let mut parts = value.split_whitespace();
    let amount: u64 = parts.next()?.parse().ok()?;
    if amount == 0 {
        return None;
    }

    let unit = parts.next().unwrap_or("days").to_ascii_lowercase();
    let seconds = if unit.starts_with("hour") {
        60 * 60
    } else if unit.starts_with("day") {
        24 * 60 * 60
    } else {
        return None;
    };

    Some(Duration::from_secs(amount.checked_mul(seconds)?))
}
