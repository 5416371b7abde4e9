//! `pubDate` decoding.
//!
//! RSS 2.0 prescribes RFC 822 dates, and in practice feeds publish RFC 1123
//! dates with either a named zone (`Tue, 03 Jun 2003 09:39:21 GMT`) or a
//! numeric offset (`Tue, 03 Jun 2003 09:39:21 -0700`). The named layout is
//! tried first, the numeric one second; anything else is rejected.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use thiserror::Error;

/// Layout of the date/time part shared by both accepted formats.
const DATE_TIME_LAYOUT: &str = "%d %b %Y %H:%M:%S";

/// Exact shape of the date/time part: `9` is an ASCII digit, `A` an ASCII
/// letter, anything else must match literally. chrono accepts short numbers,
/// long years and missing spaces, so the shape is checked before parsing.
const DATE_TIME_SHAPE: &[u8] = b"99 AAA 9999 99:99:99";

/// Same as [`DATE_TIME_LAYOUT`] followed by a numeric zone (`-0700`).
const DATE_TIME_NUMERIC_ZONE_LAYOUT: &str = "%d %b %Y %H:%M:%S %z";

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Named zones with a fixed, well-known offset (seconds east of UTC).
const NAMED_ZONES: [(&str, i32); 12] = [
    ("GMT", 0),
    ("UT", 0),
    ("UTC", 0),
    ("Z", 0),
    ("EST", -5 * 3600),
    ("EDT", -4 * 3600),
    ("CST", -6 * 3600),
    ("CDT", -5 * 3600),
    ("MST", -7 * 3600),
    ("MDT", -6 * 3600),
    ("PST", -8 * 3600),
    ("PDT", -7 * 3600),
];

/// A `pubDate` that matches neither accepted layout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Malformed pubDate: {0:?}")]
pub struct MalformedDate(pub String);

/// Decodes an RSS `pubDate` into an absolute instant.
///
/// Surrounding whitespace is ignored. The weekday name must be a valid
/// abbreviation but is not checked against the date.
///
/// # Errors
///
/// Returns [`MalformedDate`] carrying the input text when neither the
/// named-zone nor the numeric-zone layout matches.
///
/// # Examples
///
/// ```
/// use rssreader::feed::decode_pub_date;
///
/// let named = decode_pub_date("Tue, 03 Jun 2003 09:39:21 GMT").unwrap();
/// assert_eq!(named.timestamp(), 1054633161);
///
/// let numeric = decode_pub_date("Tue, 03 Jun 2003 02:39:21 -0700").unwrap();
/// assert_eq!(numeric, named);
///
/// assert!(decode_pub_date("2003-06-03T09:39:21Z").is_err());
/// ```
pub fn decode_pub_date(text: &str) -> Result<DateTime<FixedOffset>, MalformedDate> {
    let trimmed = text.trim();
    parse_named_zone(trimmed)
        .or_else(|| parse_numeric_zone(trimmed))
        .ok_or_else(|| MalformedDate(text.to_string()))
}

/// `Mon, 02 Jan 2006 15:04:05 MST`
fn parse_named_zone(text: &str) -> Option<DateTime<FixedOffset>> {
    let rest = strip_weekday(text)?;
    let (date_time, zone) = rest.rsplit_once(' ')?;
    if !has_date_time_shape(date_time) {
        return None;
    }
    let offset = FixedOffset::east_opt(named_zone_offset(zone)?)?;
    let naive = NaiveDateTime::parse_from_str(date_time, DATE_TIME_LAYOUT).ok()?;
    offset.from_local_datetime(&naive).single()
}

/// `Mon, 02 Jan 2006 15:04:05 -0700`
fn parse_numeric_zone(text: &str) -> Option<DateTime<FixedOffset>> {
    let rest = strip_weekday(text)?;
    let (date_time, zone) = rest.rsplit_once(' ')?;
    if !has_date_time_shape(date_time) || !is_numeric_zone(zone) {
        return None;
    }
    DateTime::parse_from_str(rest, DATE_TIME_NUMERIC_ZONE_LAYOUT).ok()
}

fn has_date_time_shape(text: &str) -> bool {
    text.len() == DATE_TIME_SHAPE.len()
        && text
            .bytes()
            .zip(DATE_TIME_SHAPE)
            .all(|(byte, &shape)| match shape {
                b'9' => byte.is_ascii_digit(),
                b'A' => byte.is_ascii_alphabetic(),
                _ => byte == shape,
            })
}

/// A sign followed by exactly four digits (`-0700`).
fn is_numeric_zone(zone: &str) -> bool {
    match zone.as_bytes() {
        [b'+' | b'-', digits @ ..] => {
            digits.len() == 4 && digits.iter().all(u8::is_ascii_digit)
        }
        _ => false,
    }
}

fn strip_weekday(text: &str) -> Option<&str> {
    let (weekday, rest) = text.split_once(", ")?;
    WEEKDAYS.contains(&weekday).then_some(rest)
}

/// Resolves a zone abbreviation to its offset in seconds.
///
/// Abbreviations outside [`NAMED_ZONES`] that still look like one (3 to 5
/// uppercase letters) are taken as UTC. Anything else, including numeric
/// offsets, is not a named zone.
fn named_zone_offset(zone: &str) -> Option<i32> {
    if let Some((_, offset)) = NAMED_ZONES.iter().find(|(name, _)| *name == zone) {
        return Some(*offset);
    }

    let looks_like_abbreviation =
        (3..=5).contains(&zone.len()) && zone.bytes().all(|b| b.is_ascii_uppercase());
    if looks_like_abbreviation {
        tracing::warn!(zone = %zone, "Unknown timezone abbreviation in pubDate, assuming UTC");
        return Some(0);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Timelike, Utc};
    use proptest::prelude::*;

    #[test]
    fn test_named_zone_gmt() {
        let parsed = decode_pub_date("Tue, 03 Jun 2003 09:39:21 GMT").unwrap();
        assert_eq!(parsed.timestamp(), 1054633161);
        assert_eq!(parsed.offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_named_zone_with_offset() {
        let parsed = decode_pub_date("Tue, 03 Jun 2003 05:39:21 EDT").unwrap();
        assert_eq!(parsed.timestamp(), 1054633161);
        assert_eq!(parsed.offset().local_minus_utc(), -4 * 3600);
        assert_eq!(parsed.hour(), 5);
    }

    #[test]
    fn test_numeric_zone_fallback() {
        let parsed = decode_pub_date("Tue, 03 Jun 2003 11:39:21 +0200").unwrap();
        assert_eq!(parsed.timestamp(), 1054633161);
        assert_eq!(parsed.offset().local_minus_utc(), 2 * 3600);
    }

    #[test]
    fn test_unknown_abbreviation_is_utc() {
        let parsed = decode_pub_date("Tue, 03 Jun 2003 09:39:21 XYZ").unwrap();
        assert_eq!(parsed.timestamp(), 1054633161);
    }

    #[test]
    fn test_weekday_not_cross_checked() {
        // 3 June 2003 was a Tuesday
        let parsed = decode_pub_date("Fri, 03 Jun 2003 09:39:21 GMT").unwrap();
        assert_eq!(parsed.timestamp(), 1054633161);
    }

    #[test]
    fn test_surrounding_whitespace_ignored() {
        let parsed = decode_pub_date("\n   Tue, 03 Jun 2003 09:39:21 GMT  \n").unwrap();
        assert_eq!(parsed.timestamp(), 1054633161);
    }

    #[test]
    fn test_two_digit_year_rejected_in_both_layouts() {
        assert_eq!(
            decode_pub_date("Tue, 03 Jun 03 09:39:21 GMT"),
            Err(MalformedDate("Tue, 03 Jun 03 09:39:21 GMT".to_string()))
        );
        assert!(decode_pub_date("Tue, 03 Jun 03 09:39:21 -0700").is_err());
    }

    #[test]
    fn test_malformed_carries_input_text() {
        let err = decode_pub_date("yesterday").unwrap_err();
        assert_eq!(err, MalformedDate("yesterday".to_string()));
        assert!(err.to_string().contains("yesterday"));
    }

    #[test]
    fn test_rejected_layouts() {
        for text in [
            "",
            "2003-06-03T09:39:21Z",
            "03 Jun 2003 09:39:21 GMT",
            "Tuesday, 03 Jun 2003 09:39:21 GMT",
            "Tue, 03 Jun 2003 09:39 GMT",
            "Tue, 03 Jun 2003 09:39:21",
            "Tue, 03 Jun 2003 09:39:21 gmt",
            "Tue, 31 Feb 2003 09:39:21 GMT",
            "Tue, 03 Jun 2003 25:39:21 GMT",
            "Tue, 03 Jun 03 09:39:21 GMT",
            "Tue, 03 Jun 02003 09:39:21 GMT",
            "Tue, 3 Jun 2003 09:39:21 GMT",
            "Tue, 03 Jun 2003 9:39:21 GMT",
            "Tue, 03 Jun 2003 09:9:21 GMT",
            "Tue, 03Jun 2003 09:39:21 GMT",
            "Tue,   03 Jun 2003 09:39:21 GMT",
            "Tue, 03  Jun 2003 09:39:21 GMT",
            "Tue, 03 June 2003 09:39:21 GMT",
            "Tue, 03 Jun 2003 09:39:21  GMT",
            "Tue, 03 Jun 2003 09:39:21 +07:00",
            "Tue, 03 Jun 2003 09:39:21 +07",
            "Tue, 03 Jun 2003 09:39:21 0700",
            "Tue, 03 Jun 03 09:39:21 +0000",
            "Tue, 3 Jun 2003 9:39:21 -0700",
        ] {
            assert!(
                decode_pub_date(text).is_err(),
                "expected {:?} to be rejected",
                text
            );
        }
    }

    proptest! {
        #[test]
        fn prop_numeric_zone_decodes_to_same_instant(
            secs in 0i64..4_102_444_800,
            offset_minutes in -720i32..=840,
        ) {
            let offset = FixedOffset::east_opt(offset_minutes * 60).unwrap();
            let instant = DateTime::from_timestamp(secs, 0).unwrap().with_timezone(&offset);
            let text = instant.format("%a, %d %b %Y %H:%M:%S %z").to_string();

            let decoded = decode_pub_date(&text).unwrap();
            prop_assert_eq!(decoded.with_timezone(&Utc), instant.with_timezone(&Utc));
        }

        #[test]
        fn prop_named_zone_decodes_to_same_instant(
            secs in 0i64..4_102_444_800,
            zone_index in 0usize..NAMED_ZONES.len(),
        ) {
            let (zone, offset_secs) = NAMED_ZONES[zone_index];
            let offset = FixedOffset::east_opt(offset_secs).unwrap();
            let instant = DateTime::from_timestamp(secs, 0).unwrap().with_timezone(&offset);
            let text = format!("{} {}", instant.format("%a, %d %b %Y %H:%M:%S"), zone);

            let decoded = decode_pub_date(&text).unwrap();
            prop_assert_eq!(decoded.timestamp(), secs);
        }

        #[test]
        fn prop_arbitrary_text_never_panics(text in "\\PC*") {
            let _ = decode_pub_date(&text);
        }
    }
}
