//! Strict date / datetime parsing shared by coercion, operators and configuration.
//!
//! Only the layouts listed here are accepted; anything else is "unparsable" rather than being
//! guessed at.

use chrono::{NaiveDate, NaiveDateTime};

const DATETIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_LAYOUTS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%m-%d-%Y", "%d-%b-%Y", "%b-%d-%Y",
];

/// Rendering layout for [`crate::types::Value::Date`].
pub const DATE_OUTPUT_LAYOUT: &str = "%Y-%m-%d";
/// Rendering layout for [`crate::types::Value::DateTime`].
pub const DATETIME_OUTPUT_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";

/// A parsed temporal literal, keeping whether a time-of-day component was present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Temporal {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Temporal {
    /// The value as a datetime (dates are taken at midnight).
    pub fn to_datetime(self) -> NaiveDateTime {
        match self {
            Self::Date(d) => d.and_hms_opt(0, 0, 0).unwrap_or_default(),
            Self::DateTime(dt) => dt,
        }
    }

    pub fn to_date(self) -> NaiveDate {
        match self {
            Self::Date(d) => d,
            Self::DateTime(dt) => dt.date(),
        }
    }
}

/// Parse `raw` against the accepted datetime and date layouts.
pub fn parse_temporal(raw: &str) -> Option<Temporal> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    for layout in DATETIME_LAYOUTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, layout) {
            return Some(Temporal::DateTime(dt));
        }
    }
    for layout in DATE_LAYOUTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, layout) {
            return Some(Temporal::Date(d));
        }
    }
    None
}

/// Serde helper for parameters holding a date literal.
pub(crate) fn deserialize_datetime<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    let raw = String::deserialize(deserializer)?;
    parse_temporal(&raw)
        .map(Temporal::to_datetime)
        .ok_or_else(|| serde::de::Error::custom(format!("'{raw}' is not a recognised date")))
}

#[cfg(test)]
mod tests {
    use super::{parse_temporal, Temporal};
    use chrono::NaiveDate;

    #[test]
    fn parses_iso_and_us_dates() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        for raw in ["2024-03-15", "2024/03/15", "03/15/2024", "15-Mar-2024", " 2024-03-15 "] {
            assert_eq!(parse_temporal(raw), Some(Temporal::Date(expected)), "{raw}");
        }
    }

    #[test]
    fn parses_datetimes_with_either_separator() {
        let a = parse_temporal("2024-03-15 08:30:00").unwrap();
        let b = parse_temporal("2024-03-15T08:30:00").unwrap();
        assert_eq!(a, b);
        assert!(matches!(a, Temporal::DateTime(_)));
        assert_eq!(a.to_date(), NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
    }

    #[test]
    fn rejects_garbage_and_impossible_dates() {
        assert_eq!(parse_temporal("not a date"), None);
        assert_eq!(parse_temporal("2024-02-30"), None);
        assert_eq!(parse_temporal(""), None);
    }
}
