//! Lenient timestamp parsing
//!
//! Result columns carry time either as a calendar timestamp (RFC 3339) or as
//! epoch seconds with an optional fraction (`1700000000`, `1700000000.25`).
//! Calendar parsing is tried first; the epoch grammar is the fallback.

use chrono::{DateTime, NaiveDateTime, Utc};

use super::error::{FrameError, FrameResult};

const NANOS_PER_SEC: usize = 9;

/// RFC 3339 with an upper-case `T` separator and a numeric offset
const RFC3339_OFFSET: &str = "%Y-%m-%dT%H:%M:%S%.f%:z";
/// RFC 3339 body before an upper-case `Z`
const RFC3339_UTC: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Epoch offset split into whole seconds and nanoseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EpochParts {
    pub secs: i64,
    pub nanos: i64,
}

impl EpochParts {
    /// Value reported when a token cannot be parsed
    pub const INVALID: EpochParts = EpochParts {
        secs: -1,
        nanos: -1,
    };

    pub fn new(secs: i64, nanos: i64) -> Self {
        Self { secs, nanos }
    }

    /// Convert to a UTC instant
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        let nanos = u32::try_from(self.nanos).ok()?;
        DateTime::from_timestamp(self.secs, nanos)
    }
}

/// Parse `seconds[.fraction]` into epoch parts.
///
/// The fraction is read as a fractional-seconds duration, so `123.456` is
/// 456 000 000 ns and `123.000000789` is 789 ns. Digits past nanosecond
/// precision are truncated.
pub fn parse_epoch(token: &str) -> FrameResult<EpochParts> {
    let mut parts = token.split('.');
    let whole = parts.next().unwrap_or_default();
    let fraction = parts.next();

    if parts.next().is_some() {
        return Err(malformed(token, "more than one '.' separator"));
    }

    let secs = whole
        .parse::<i64>()
        .map_err(|e| malformed(token, &e.to_string()))?;

    let nanos = match fraction {
        None => 0,
        Some(digits) => parse_fraction(digits).ok_or_else(|| malformed(token, "invalid fractional seconds"))?,
    };

    Ok(EpochParts::new(secs, nanos))
}

/// Parse epoch parts, mapping any failure to [`EpochParts::INVALID`]
pub fn parse_epoch_or_sentinel(token: &str) -> EpochParts {
    parse_epoch(token).unwrap_or(EpochParts::INVALID)
}

/// Parse a time token: RFC 3339 first, epoch seconds second.
///
/// The calendar form is strict: `T` and `Z` must be upper case and a space
/// separator is rejected. When both grammars reject the token the epoch
/// parser's error is returned.
pub fn parse_time_token(token: &str) -> FrameResult<DateTime<Utc>> {
    if let Some(dt) = parse_rfc3339(token) {
        return Ok(dt);
    }

    let parts = parse_epoch(token).map_err(|e| {
        tracing::debug!(token, "time token rejected by both grammars");
        e
    })?;

    parts
        .to_datetime()
        .ok_or_else(|| malformed(token, "epoch offset out of range"))
}

fn parse_rfc3339(token: &str) -> Option<DateTime<Utc>> {
    match token.strip_suffix('Z') {
        Some(body) => NaiveDateTime::parse_from_str(body, RFC3339_UTC)
            .ok()
            .map(|naive| naive.and_utc()),
        None => DateTime::parse_from_str(token, RFC3339_OFFSET)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
    }
}

fn parse_fraction(digits: &str) -> Option<i64> {
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let mut nanos: i64 = 0;
    for (i, b) in digits.bytes().take(NANOS_PER_SEC).enumerate() {
        nanos += i64::from(b - b'0') * 10_i64.pow((NANOS_PER_SEC - 1 - i) as u32);
    }
    Some(nanos)
}

fn malformed(token: &str, reason: &str) -> FrameError {
    FrameError::MalformedTimestamp {
        token: token.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_seconds() {
        assert_eq!(parse_epoch("123").unwrap(), EpochParts::new(123, 0));
        assert_eq!(parse_epoch("-5").unwrap(), EpochParts::new(-5, 0));
    }

    #[test]
    fn test_fractional_seconds() {
        assert_eq!(
            parse_epoch("123.456").unwrap(),
            EpochParts::new(123, 456_000_000)
        );
        assert_eq!(parse_epoch("123.000000789").unwrap(), EpochParts::new(123, 789));
        assert_eq!(parse_epoch("123.").unwrap(), EpochParts::new(123, 0));
    }

    #[test]
    fn test_fraction_truncated_past_nanos() {
        assert_eq!(
            parse_epoch("1.1234567899").unwrap(),
            EpochParts::new(1, 123_456_789)
        );
    }

    #[test]
    fn test_malformed_tokens_yield_sentinel() {
        for token in ["1.2.3", "abc", "", ".", "12.3x", "1.-5"] {
            assert!(
                matches!(parse_epoch(token), Err(FrameError::MalformedTimestamp { .. })),
                "token {:?} should fail",
                token
            );
            assert_eq!(parse_epoch_or_sentinel(token), EpochParts::INVALID);
        }
    }

    #[test]
    fn test_parse_time_token_rfc3339() {
        let ts = parse_time_token("2024-01-01T00:00:00Z").unwrap();
        assert_eq!(ts.timestamp(), 1_704_067_200);

        let ts = parse_time_token("2024-01-01T02:00:00+02:00").unwrap();
        assert_eq!(ts.timestamp(), 1_704_067_200);
    }

    #[test]
    fn test_parse_time_token_rfc3339_fraction() {
        let ts = parse_time_token("2024-01-01T00:00:00.250Z").unwrap();
        assert_eq!(ts.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_parse_time_token_rejects_lenient_calendar_forms() {
        for token in [
            "2024-01-01 00:00:00Z",
            "2024-01-01t00:00:00Z",
            "2024-01-01T00:00:00z",
            "2024-01-01T00:00:00",
        ] {
            assert!(
                matches!(parse_time_token(token), Err(FrameError::MalformedTimestamp { .. })),
                "token {:?} should fail",
                token
            );
        }
    }

    #[test]
    fn test_parse_time_token_epoch_fallback() {
        let ts = parse_time_token("1700000010").unwrap();
        assert_eq!(ts.to_rfc3339(), "2023-11-14T22:13:30+00:00");

        let ts = parse_time_token("1700000010.5").unwrap();
        assert_eq!(ts.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_parse_time_token_reports_token() {
        let err = parse_time_token("not-a-time").unwrap_err();
        assert!(err.to_string().contains("not-a-time"));
    }
}
