//! Timestamp normalisation for both feeds.
//!
//! The global feed carries epoch milliseconds and is rendered in UTC. The JP
//! portal carries either a Japanese calendar string (`2024年3月5日 14時30分ごろ`)
//! or a raw epoch of 10 to 13 digits, both rendered in JST.

use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};
use regex::Regex;

/// Returned in place of a timestamp that could not be parsed.
pub const INVALID_DATE: &str = "Invalid date";

/// Layout of a normalised JP timestamp.
pub const JP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const JST_OFFSET_SECS: i32 = 9 * 3600;

/// Epoch values above this are milliseconds.
const MILLIS_THRESHOLD: i64 = 10_000_000_000;

/// Japan Standard Time. Japan has no daylight saving, so a fixed offset is exact.
pub fn jst() -> FixedOffset {
    FixedOffset::east_opt(JST_OFFSET_SECS).expect("+09:00 is a valid offset")
}

/// Converts epoch milliseconds to an ISO-8601 string in UTC, e.g.
/// `2023-11-14T22:13:20+00:00`.
pub fn ms_to_iso(ms: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(ms).map(|dt| dt.to_rfc3339_opts(SecondsFormat::AutoSi, false))
}

/// Splits epoch milliseconds into UTC `(date, time)` columns.
pub fn ms_to_date_time(ms: i64) -> Option<(String, String)> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| (dt.format("%Y-%m-%d").to_string(), dt.format("%H:%M:%S").to_string()))
}

/// Interprets an epoch as seconds, or as milliseconds when it exceeds 1e10.
pub fn epoch_to_jst(value: i64) -> Option<DateTime<FixedOffset>> {
    let utc = if value > MILLIS_THRESHOLD {
        DateTime::<Utc>::from_timestamp_millis(value)
    } else {
        DateTime::<Utc>::from_timestamp(value, 0)
    }?;

    Some(utc.with_timezone(&jst()))
}

/// Parses `YYYY年M月D日 H時M分ごろ`, localised to Asia/Tokyo. The trailing
/// `ごろ` is optional.
pub fn parse_jp_calendar(text: &str) -> Option<DateTime<FixedOffset>> {
    let caps = jp_calendar_regex().captures(text.trim())?;
    let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());

    let year = caps.get(1)?.as_str().parse::<i32>().ok()?;
    let naive = NaiveDate::from_ymd_opt(year, field(2)?, field(3)?)?.and_hms_opt(field(4)?, field(5)?, 0)?;

    jst().from_local_datetime(&naive).single()
}

/// Normalises a JP observed-at cell to `YYYY-MM-DD HH:MM:SS` (JST).
///
/// An embedded 10–13 digit epoch wins over the calendar form. Anything that
/// cannot be parsed yields [`INVALID_DATE`].
pub fn normalize_jp_timestamp(text: &str) -> String {
    parse_jp_timestamp(text)
        .map(|dt| dt.format(JP_FORMAT).to_string())
        .unwrap_or_else(|| {
            tracing::debug!(text, "unparseable JP timestamp");
            INVALID_DATE.to_string()
        })
}

/// Same as [`normalize_jp_timestamp`] but keeps the failure as `None`.
pub fn parse_jp_timestamp(text: &str) -> Option<DateTime<FixedOffset>> {
    if let Some(m) = epoch_regex().captures(text).and_then(|c| c.get(1)) {
        return m.as_str().parse::<i64>().ok().and_then(epoch_to_jst);
    }

    parse_jp_calendar(text)
}

/// Splits a normalised timestamp into `(date, time)`; `None` for the sentinel.
pub fn split_normalized(normalized: &str) -> Option<(String, String)> {
    if normalized == INVALID_DATE {
        return None;
    }

    normalized
        .split_once(' ')
        .map(|(date, time)| (date.to_string(), time.to_string()))
}

/// Accepts `YYYY-MM-DD` or `YYYY年M月D日` and returns `YYYY-MM-DD`.
pub fn normalize_date_filter(text: &str) -> Option<String> {
    let text = text.trim();

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date.format("%Y-%m-%d").to_string());
    }

    let caps = jp_date_regex().captures(text)?;
    let year = caps.get(1)?.as_str().parse::<i32>().ok()?;
    let month = caps.get(2)?.as_str().parse::<u32>().ok()?;
    let day = caps.get(3)?.as_str().parse::<u32>().ok()?;

    NaiveDate::from_ymd_opt(year, month, day).map(|d| d.format("%Y-%m-%d").to_string())
}

/// Accepts `H:MM`, `HH:MM:SS` or `H時M分` (trailing `ごろ` optional) and
/// returns `HH:MM:SS`.
pub fn normalize_time_filter(text: &str) -> Option<String> {
    let text = text.trim();

    for layout in ["%H:%M:%S", "%H:%M"] {
        if let Ok(time) = NaiveTime::parse_from_str(text, layout) {
            return Some(time.format("%H:%M:%S").to_string());
        }
    }

    let caps = jp_time_regex().captures(text)?;
    let hour = caps.get(1)?.as_str().parse::<u32>().ok()?;
    let minute = caps.get(2)?.as_str().parse::<u32>().ok()?;

    NaiveTime::from_hms_opt(hour, minute, 0).map(|t| t.format("%H:%M:%S").to_string())
}

fn jp_calendar_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{4})年(\d{1,2})月(\d{1,2})日\s*(\d{1,2})時(\d{1,2})分(?:ごろ)?$")
            .expect("static regex")
    })
}

fn jp_date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})年(\d{1,2})月(\d{1,2})日$").expect("static regex"))
}

fn jp_time_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,2})時(\d{1,2})分(?:ごろ)?$").expect("static regex"))
}

/// Digit runs only; kana and kanji next to the epoch do not count as part of it.
fn epoch_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:^|\D)(\d{10,13})(?:\D|$)").expect("static regex"))
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_convert_ms_to_iso() {
        assert_eq!(
            ms_to_iso(1_700_000_000_000).unwrap(),
            "2023-11-14T22:13:20+00:00"
        );
    }

    #[test]
    fn should_round_trip_iso_to_same_instant() {
        for ms in [0_i64, 1, 999, 1_700_000_000_000, 1_700_000_000_123, 4_102_444_800_000] {
            let iso = ms_to_iso(ms).unwrap();
            let parsed = DateTime::parse_from_rfc3339(&iso).unwrap();
            assert_eq!(parsed.timestamp_millis(), ms, "{iso}");
        }
    }

    #[test]
    fn should_split_ms_into_utc_columns() {
        let (date, time) = ms_to_date_time(1_700_000_000_000).unwrap();
        assert_eq!(date, "2023-11-14");
        assert_eq!(time, "22:13:20");
    }

    #[test]
    fn should_parse_jp_calendar_string() {
        assert_eq!(
            normalize_jp_timestamp("2024年3月5日 14時30分ごろ"),
            "2024-03-05 14:30:00"
        );
    }

    #[test]
    fn should_localise_jp_calendar_to_tokyo() {
        let dt = parse_jp_calendar("2024年3月5日 14時30分ごろ").unwrap();
        assert_eq!(dt.offset().local_minus_utc(), 9 * 3600);
        assert_eq!(dt.with_timezone(&Utc).format("%H:%M").to_string(), "05:30");
    }

    #[test]
    fn should_accept_calendar_without_goro() {
        assert_eq!(
            normalize_jp_timestamp("2024年12月31日 0時05分"),
            "2024-12-31 00:05:00"
        );
    }

    #[test]
    fn should_treat_large_epoch_as_millis() {
        // 1700000000 s == 2023-11-15 07:13:20 JST
        assert_eq!(normalize_jp_timestamp("1700000000"), "2023-11-15 07:13:20");
        assert_eq!(normalize_jp_timestamp("1700000000000"), "2023-11-15 07:13:20");
    }

    #[test]
    fn should_find_epoch_inside_text() {
        assert_eq!(
            normalize_jp_timestamp("発生時刻 1700000000000 頃"),
            "2023-11-15 07:13:20"
        );
    }

    #[test]
    fn should_find_epoch_touching_japanese_text() {
        assert_eq!(normalize_jp_timestamp("発生1700000000000頃"), "2023-11-15 07:13:20");
        assert_eq!(normalize_jp_timestamp("時刻:1700000000"), "2023-11-15 07:13:20");
        assert_eq!(normalize_jp_timestamp("17000000000000000"), INVALID_DATE);
    }

    #[test]
    fn should_return_sentinel_for_garbage() {
        assert_eq!(normalize_jp_timestamp("昨日の夜"), INVALID_DATE);
        assert_eq!(normalize_jp_timestamp("2024年13月5日 14時30分ごろ"), INVALID_DATE);
        assert_eq!(normalize_jp_timestamp(""), INVALID_DATE);
    }

    #[test]
    fn should_split_normalized() {
        assert_eq!(
            split_normalized("2024-03-05 14:30:00"),
            Some(("2024-03-05".to_string(), "14:30:00".to_string()))
        );
        assert_eq!(split_normalized(INVALID_DATE), None);
    }

    #[test]
    fn should_normalize_date_filters() {
        assert_eq!(normalize_date_filter("2024-03-05").as_deref(), Some("2024-03-05"));
        assert_eq!(normalize_date_filter("2024年3月5日").as_deref(), Some("2024-03-05"));
        assert_eq!(normalize_date_filter("March 5"), None);
    }

    #[test]
    fn should_normalize_time_filters() {
        assert_eq!(normalize_time_filter("14:30").as_deref(), Some("14:30:00"));
        assert_eq!(normalize_time_filter("9:05").as_deref(), Some("09:05:00"));
        assert_eq!(normalize_time_filter("14:30:15").as_deref(), Some("14:30:15"));
        assert_eq!(normalize_time_filter("14時30分ごろ").as_deref(), Some("14:30:00"));
        assert_eq!(normalize_time_filter("0時5分").as_deref(), Some("00:05:00"));
        assert_eq!(normalize_time_filter("25時00分"), None);
        assert_eq!(normalize_time_filter("afternoon"), None);
    }
}
