// ABOUTME: Timestamp-derived release identifiers.
// ABOUTME: Identifiers sort lexicographically in creation order.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use std::fmt;
use thiserror::Error;

/// Format of a release identifier: date and time to the second.
pub const RELEASE_ID_FORMAT: &str = "%Y%m%d-%H%M%S";

#[derive(Debug, Error)]
#[error("invalid release id '{value}': expected YYYYMMDD-HHMMSS")]
pub struct ReleaseIdError {
    value: String,
}

/// Identifier of one release directory, e.g. `20240103-000000`.
///
/// Because the format is fixed-width and most-significant-first, the
/// derived `Ord` on the inner string is also chronological order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReleaseId(String);

impl ReleaseId {
    /// Release id for the current wall-clock time (UTC).
    pub fn now() -> Self {
        Self::from_datetime(&Utc::now())
    }

    pub fn from_datetime<Tz: TimeZone>(at: &DateTime<Tz>) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        Self(at.format(RELEASE_ID_FORMAT).to_string())
    }

    pub fn parse(value: &str) -> Result<Self, ReleaseIdError> {
        NaiveDateTime::parse_from_str(value, RELEASE_ID_FORMAT)
            .map(|_| Self(value.to_string()))
            .map_err(|_| ReleaseIdError {
                value: value.to_string(),
            })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReleaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_to_the_second() {
        let at = Utc.with_ymd_and_hms(2024, 1, 3, 14, 5, 9).unwrap();
        assert_eq!(ReleaseId::from_datetime(&at).as_str(), "20240103-140509");
    }

    #[test]
    fn ordering_is_chronological() {
        let earlier = ReleaseId::parse("20231231-235959").unwrap();
        let later = ReleaseId::parse("20240101-000000").unwrap();
        assert!(earlier < later);
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(ReleaseId::parse("2024-01-01").is_err());
        assert!(ReleaseId::parse("20241301-000000").is_err());
        assert!(ReleaseId::parse("").is_err());
    }

    #[test]
    fn now_round_trips_through_parse() {
        let id = ReleaseId::now();
        assert_eq!(ReleaseId::parse(id.as_str()).unwrap(), id);
    }
}
