//! `!!timestamp` values: parsing and the wire form.

use std::fmt;

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, Timelike};

/// A broken-down date or date-time, with an optional zone offset.
///
/// Rendered as RFC 3339 when the offset is known, as a space-separated local
/// form otherwise, and as a bare date when there is no time part.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Timestamp {
    /// The civil date and time.
    pub date_time: NaiveDateTime,
    /// Zone offset in seconds east of UTC, when the source specified one.
    pub offset: Option<i32>,
    /// Whether the source carried only a date.
    pub date_only: bool,
}

impl Timestamp {
    /// Parse the ISO-8601 subset accepted by the YAML timestamp type:
    /// `yyyy-mm-dd`, optionally followed by `T`, `t`, or a single space and
    /// `hh:mm:ss` with an optional fraction and an optional `Z` or
    /// `[+-]hh[:mm]` zone. Anything else is not a timestamp.
    pub fn parse(input: &str) -> Option<Timestamp> {
        let (year, rest) = take_digits(input, 4)?;
        let rest = take_char(rest, '-')?;
        let (month, rest) = take_digits_up_to(rest, 2)?;
        let rest = take_char(rest, '-')?;
        let (day, rest) = take_digits_up_to(rest, 2)?;
        let date = NaiveDate::from_ymd_opt(year as i32, month, day)?;

        if rest.is_empty() {
            return Some(Timestamp {
                date_time: date.and_hms_opt(0, 0, 0)?,
                offset: None,
                date_only: true,
            });
        }

        let rest = match rest.as_bytes()[0] {
            b'T' | b't' | b' ' => &rest[1..],
            _ => return None,
        };
        let (hour, rest) = take_digits_up_to(rest, 2)?;
        let rest = take_char(rest, ':')?;
        let (minute, rest) = take_digits_up_to(rest, 2)?;
        let rest = take_char(rest, ':')?;
        let (second, mut rest) = take_digits_up_to(rest, 2)?;

        let mut nanos: u32 = 0;
        if let Some(frac) = rest.strip_prefix('.') {
            let digits = frac.len() - frac.trim_start_matches(|c: char| c.is_ascii_digit()).len();
            if digits == 0 {
                return None;
            }
            let mut value: u64 = 0;
            for b in frac[..digits.min(9)].bytes() {
                value = value * 10 + u64::from(b - b'0');
            }
            for _ in digits..9 {
                value *= 10;
            }
            nanos = (value % 1_000_000_000) as u32;
            rest = &frac[digits..];
        }

        // An optional single space before the zone, as the original accepts
        // for the canonical 1.1 form.
        let zone = rest.strip_prefix(' ').unwrap_or(rest);
        let offset = if zone.is_empty() {
            if rest != zone {
                // A trailing space with no zone behind it is not a timestamp.
                return None;
            }
            None
        } else if zone == "Z" || zone == "z" {
            Some(0)
        } else {
            let sign = match zone.as_bytes()[0] {
                b'+' => 1i32,
                b'-' => -1i32,
                _ => return None,
            };
            let (hours, zone_rest) = take_digits_up_to(&zone[1..], 2)?;
            let minutes = if let Some(zone_rest) = zone_rest.strip_prefix(':') {
                let (minutes, tail) = take_digits_up_to(zone_rest, 2)?;
                if !tail.is_empty() {
                    return None;
                }
                minutes
            } else if zone_rest.is_empty() {
                0
            } else {
                return None;
            };
            if hours > 23 || minutes > 59 {
                return None;
            }
            Some(sign * (hours as i32 * 3600 + minutes as i32 * 60))
        };

        let date_time = date
            .and_hms_opt(hour, minute, second)?
            .with_nanosecond(nanos)?;
        Some(Timestamp {
            date_time,
            offset,
            date_only: false,
        })
    }

    /// The zone offset as a chrono type, when present.
    pub fn fixed_offset(&self) -> Option<FixedOffset> {
        self.offset.and_then(FixedOffset::east_opt)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.date_only {
            return write!(f, "{}", self.date_time.format("%Y-%m-%d"));
        }
        let base = if self.date_time.nanosecond() == 0 {
            self.date_time.format("%Y-%m-%dT%H:%M:%S").to_string()
        } else {
            let formatted = self.date_time.format("%Y-%m-%dT%H:%M:%S%.9f").to_string();
            formatted.trim_end_matches('0').to_string()
        };
        match self.offset {
            Some(0) => write!(f, "{}Z", base),
            Some(seconds) => {
                let sign = if seconds < 0 { '-' } else { '+' };
                let abs = seconds.abs();
                write!(f, "{}{}{:02}:{:02}", base, sign, abs / 3600, abs % 3600 / 60)
            }
            None => {
                // No zone: the space-separated local form.
                write!(f, "{}", base.replacen('T', " ", 1))
            }
        }
    }
}

fn take_digits(input: &str, count: usize) -> Option<(u32, &str)> {
    if input.len() < count || !input.as_bytes()[..count].iter().all(u8::is_ascii_digit) {
        return None;
    }
    let value = input[..count].parse().ok()?;
    Some((value, &input[count..]))
}

/// One or two digits, per the relaxed YAML 1.1 date form.
fn take_digits_up_to(input: &str, max: usize) -> Option<(u32, &str)> {
    let len = input
        .bytes()
        .take(max)
        .take_while(u8::is_ascii_digit)
        .count();
    if len == 0 {
        return None;
    }
    let value = input[..len].parse().ok()?;
    Some((value, &input[len..]))
}

fn take_char(input: &str, expected: char) -> Option<&str> {
    input.strip_prefix(expected)
}
