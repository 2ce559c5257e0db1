//! Deriving a capture time from a file name.
//!
//! A date/time is searched for anywhere in the name, so `IMG_20230615_143000`, `20230615_143000`
//! and `2023-06-15 14.30.00 (2)` all work. Names outside the shapes below can match in unexpected
//! ways, e.g. a numeric ID that happens to look like `YYYYMMDD`.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Exif's date/time layout, used by `DateTime`, `DateTimeOriginal` and `DateTimeDigitized`.
pub const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Layout of the GPS IFD's `GPSDateStamp`.
pub const EXIF_DATE_FORMAT: &str = "%Y:%m:%d";

/// Turns the base name of a file (without extension) into a timestamp.
pub trait TimestampParser {
    fn parse(&self, name: &str) -> Result<NaiveDateTime>;
}

impl<F> TimestampParser for F
where
    F: Fn(&str) -> Result<NaiveDateTime>,
{
    fn parse(&self, name: &str) -> Result<NaiveDateTime> {
        self(name)
    }
}

/// The default parser. Recognised shapes, tried in order:
///
/// - `YYYYMMDD_HHMMSS`, `YYYYMMDD-HHMMSS`, `YYYYMMDDHHMMSS`, `YYYY-MM-DD_HH-MM-SS`,
///   `YYYY-MM-DD HH.MM.SS` and similar mixes of those separators
/// - a 13 digit Unix timestamp in milliseconds (interpreted as UTC), as the whole name
/// - a bare date, `YYYY-MM-DD` or `YYYYMMDD`, at midnight
#[derive(Debug, Default, Clone, Copy)]
pub struct FilenameTimestampParser;

static RE_DATETIME: OnceLock<Regex> = OnceLock::new();
static RE_UNIX_MS: OnceLock<Regex> = OnceLock::new();
static RE_DATE: OnceLock<Regex> = OnceLock::new();

impl TimestampParser for FilenameTimestampParser {
    fn parse(&self, name: &str) -> Result<NaiveDateTime> {
        let re_datetime = RE_DATETIME.get_or_init(|| {
            Regex::new(
                r"(?:^|\D)(?P<y>\d{4})-?(?P<m>\d{2})-?(?P<d>\d{2})[_\-T ]?(?P<H>\d{2})[-:.]?(?P<M>\d{2})[-:.]?(?P<S>\d{2})",
            )
            .expect("valid date/time regex")
        });
        for caps in re_datetime.captures_iter(name) {
            if let Some(dt) = date_from(&caps).and_then(|date| {
                date.and_hms_opt(number(&caps, "H"), number(&caps, "M"), number(&caps, "S"))
            }) {
                return Ok(dt);
            }
        }

        let re_unix_ms = RE_UNIX_MS.get_or_init(|| Regex::new(r"^\d{13}$").expect("valid regex"));
        if re_unix_ms.is_match(name) {
            if let Some(dt) = name
                .parse::<i64>()
                .ok()
                .and_then(DateTime::from_timestamp_millis)
            {
                return Ok(dt.naive_utc());
            }
        }

        let re_date = RE_DATE.get_or_init(|| {
            Regex::new(r"(?:^|\D)(?P<y>\d{4})-?(?P<m>\d{2})-?(?P<d>\d{2})(?:$|\D)")
                .expect("valid date regex")
        });
        for caps in re_date.captures_iter(name) {
            if let Some(dt) = date_from(&caps).and_then(|date| date.and_hms_opt(0, 0, 0)) {
                return Ok(dt);
            }
        }

        Err(Error::Timestamp(name.to_string()))
    }
}

fn number(caps: &Captures, group: &str) -> u32 {
    caps.name(group)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(u32::MAX)
}

fn date_from(caps: &Captures) -> Option<NaiveDate> {
    let year = caps.name("y")?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, number(caps, "m"), number(caps, "d"))
}

#[cfg(test)]
mod test {
    use super::{FilenameTimestampParser, TimestampParser, EXIF_DATETIME_FORMAT};
    use crate::error::{Error, Result};
    use chrono::{NaiveDate, NaiveDateTime};

    fn parse(name: &str) -> Result<NaiveDateTime> {
        FilenameTimestampParser.parse(name)
    }

    fn at(y: i32, m: u32, d: u32, hh: u32, mm: u32, ss: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(hh, mm, ss))
            .unwrap()
    }

    #[test]
    fn test_date_time_shapes() {
        let expected = at(2023, 6, 15, 14, 30, 0);
        for name in [
            "20230615_143000",
            "IMG_20230615_143000",
            "PXL_20230615_143000123",
            "20230615-143000",
            "20230615143000",
            "2023-06-15_14-30-00",
            "2023-06-15 14.30.00 (2)",
            "Screenshot 2023-06-15 14:30:00",
        ]
        .iter()
        {
            assert_eq!(parse(name).unwrap(), expected, "{}", name);
        }
    }

    #[test]
    fn test_exif_formatting() {
        let dt = parse("20230615_143000").unwrap();
        assert_eq!(dt.format(EXIF_DATETIME_FORMAT).to_string(), "2023:06:15 14:30:00");
    }

    #[test]
    fn test_invalid_calendar_values_fall_through() {
        // 2023-13-45 isn't a date, but the date-only pattern still finds nothing valid
        assert!(parse("20231345_143000").is_err());
        // A valid date with an invalid time falls back to midnight
        assert_eq!(parse("2023-06-15_99-99-99").unwrap(), at(2023, 6, 15, 0, 0, 0));
    }

    #[test]
    fn test_unix_milliseconds() {
        assert_eq!(parse("1686839400000").unwrap(), at(2023, 6, 15, 14, 30, 0));
    }

    #[test]
    fn test_date_only() {
        assert_eq!(parse("holiday 2021-12-24").unwrap(), at(2021, 12, 24, 0, 0, 0));
        assert_eq!(parse("20211224").unwrap(), at(2021, 12, 24, 0, 0, 0));
    }

    #[test]
    fn test_names_without_a_date_are_rejected() {
        for name in ["IMG_final", "", "holiday", "IMG_1234"].iter() {
            match parse(name) {
                Err(Error::Timestamp(n)) => assert_eq!(&n, name),
                other => panic!("{:?} gave {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_closures_are_parsers() {
        let fixed = |_: &str| -> Result<NaiveDateTime> { Ok(at(2000, 1, 1, 0, 0, 0)) };
        assert_eq!(fixed.parse("anything").unwrap(), at(2000, 1, 1, 0, 0, 0));
    }
}
