use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use tracing::warn;

use crate::error::DateParseError;

/// How a pattern obtains its UTC offset.
#[derive(Debug, Clone, Copy)]
enum Zone {
    /// Whitespace-separated token at this index is a zone abbreviation ("GMT", "PST").
    /// A numeric offset in that slot is accepted as-is.
    Abbreviation(usize),
    /// `+hhmm` in the format itself.
    Numeric,
    /// `+hh:mm` or a trailing `Z`.
    Iso,
    /// No zone in the input; read as UTC.
    Utc,
}

struct DatePattern {
    format: &'static str,
    zone: Zone,
}

/// Tried in order, first success wins. Several entries overlap on purpose: real feeds
/// have been observed to rely on the earlier, looser entries winning.
const DATE_PATTERNS: [DatePattern; 9] = [
    DatePattern {
        format: "%a, %d %b %Y %H:%M:%S %z",
        zone: Zone::Abbreviation(5),
    },
    DatePattern {
        format: "%Y-%m-%dT%H:%M:%S%z",
        zone: Zone::Numeric,
    },
    DatePattern {
        format: "%Y-%m-%dT%H:%M:%S%.3f%z",
        zone: Zone::Numeric,
    },
    DatePattern {
        format: "%a %b %d %H:%M:%S %z %Y",
        zone: Zone::Abbreviation(4),
    },
    DatePattern {
        format: "%a, %d %b %Y %H:%M:%S %z",
        zone: Zone::Numeric,
    },
    DatePattern {
        format: "%a, %d %b %Y %H:%M:%S %z",
        zone: Zone::Numeric,
    },
    DatePattern {
        format: "%a, %d %b %Y %H:%M:%S",
        zone: Zone::Utc,
    },
    DatePattern {
        format: "%a, %d %b %Y %H:%M:%S %z",
        zone: Zone::Abbreviation(5),
    },
    DatePattern {
        format: "%Y-%m-%dT%H:%M:%S%:z",
        zone: Zone::Iso,
    },
];

/// Offsets in minutes east of UTC.
fn abbreviation_offset(abbreviation: &str) -> Option<i32> {
    let minutes = match abbreviation.to_ascii_uppercase().as_str() {
        "UT" | "UTC" | "GMT" | "Z" | "WET" => 0,
        "EST" => -5 * 60,
        "EDT" => -4 * 60,
        "CST" => -6 * 60,
        "CDT" => -5 * 60,
        "MST" => -7 * 60,
        "MDT" => -6 * 60,
        "PST" => -8 * 60,
        "PDT" => -7 * 60,
        "AKST" => -9 * 60,
        "AKDT" => -8 * 60,
        "HST" => -10 * 60,
        "BST" | "CET" | "WEST" => 60,
        "CEST" | "EET" => 2 * 60,
        "EEST" | "MSK" => 3 * 60,
        "IST" => 5 * 60 + 30,
        "JST" | "KST" => 9 * 60,
        "AEST" => 10 * 60,
        "AEDT" => 11 * 60,
        _ => return None,
    };
    Some(minutes)
}

fn format_offset(minutes: i32) -> String {
    let sign = if minutes < 0 { '-' } else { '+' };
    let minutes = minutes.abs();
    format!("{}{:02}{:02}", sign, minutes / 60, minutes % 60)
}

impl DatePattern {
    fn parse(&self, raw: &str) -> Option<DateTime<FixedOffset>> {
        match self.zone {
            Zone::Abbreviation(index) => {
                let mut tokens: Vec<String> = raw.split_whitespace().map(str::to_string).collect();
                let token = tokens.get_mut(index)?;
                if let Some(minutes) = abbreviation_offset(token) {
                    *token = format_offset(minutes);
                }
                DateTime::parse_from_str(&tokens.join(" "), self.format).ok()
            }
            Zone::Numeric => DateTime::parse_from_str(raw, self.format).ok(),
            Zone::Iso => {
                let raw = match raw.strip_suffix('Z') {
                    Some(local) => format!("{}+00:00", local),
                    None => raw.to_string(),
                };
                DateTime::parse_from_str(&raw, self.format).ok()
            }
            Zone::Utc => NaiveDateTime::parse_from_str(raw, self.format)
                .ok()
                .map(|naive| naive.and_utc().fixed_offset()),
        }
    }
}

/// Returns the index of the first matching pattern together with its epoch milliseconds.
fn first_match(raw: &str) -> Option<(usize, i64)> {
    let raw = raw.trim();
    DATE_PATTERNS
        .iter()
        .enumerate()
        .find_map(|(index, pattern)| pattern.parse(raw).map(|parsed| (index, parsed)))
        // Sub-second precision is dropped.
        .map(|(index, parsed)| (index, parsed.timestamp() * 1000))
}

/// Parses a feed timestamp into epoch milliseconds.
pub fn parse_date(raw: &str) -> Result<i64, DateParseError> {
    first_match(raw)
        .map(|(_, millis)| millis)
        .ok_or_else(|| DateParseError {
            input: raw.to_string(),
        })
}

/// Like [`parse_date`], but never fails: absent or unrecognized input resolves to the
/// current time.
pub fn normalize_date(raw: Option<&str>) -> i64 {
    let Some(raw) = raw else {
        return Utc::now().timestamp_millis();
    };

    match parse_date(raw) {
        Ok(millis) => millis,
        Err(e) => {
            warn!("Parse date error: {}", e);
            Utc::now().timestamp_millis()
        }
    }
}
