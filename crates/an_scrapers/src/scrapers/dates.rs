use an_core::PublishDate;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use tracing::warn;

/// Formats seen on article pages, tried in order.
pub const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y年%m月%d号 %H:%M",
    "%Y年%m月%d日 %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

/// Page times are wall clock in China Standard Time.
pub const SITE_UTC_OFFSET_SECS: i32 = 8 * 3600;

fn site_local_to_utc(naive: &NaiveDateTime) -> Option<DateTime<Utc>> {
    FixedOffset::east_opt(SITE_UTC_OFFSET_SECS)?
        .from_local_datetime(naive)
        .single()
        .map(|ts| ts.with_timezone(&Utc))
}

pub fn parse_publish_date(text: &str, now: DateTime<Utc>) -> PublishDate {
    let text = text.trim();
    let parsed = DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .and_then(|naive| site_local_to_utc(&naive));

    match parsed {
        Some(ts) => PublishDate::Parsed(ts),
        None => {
            warn!("Unrecognized date '{}', using current time", text);
            PublishDate::Fallback(now)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn test_every_known_format_parses() {
        let now = Utc::now();
        let cases = [
            ("2024-01-25 10:30:00", utc(2024, 1, 25, 2, 30, 0)),
            ("2024年11月27号 13:56", utc(2024, 11, 27, 5, 56, 0)),
            ("2024年11月27日 13:56", utc(2024, 11, 27, 5, 56, 0)),
            ("2024/01/25 10:30:00", utc(2024, 1, 25, 2, 30, 0)),
            ("2024/01/25 10:30", utc(2024, 1, 25, 2, 30, 0)),
        ];
        for (text, expected) in cases {
            assert_eq!(parse_publish_date(text, now), PublishDate::Parsed(expected), "{}", text);
        }
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        let parsed = parse_publish_date("\n   2024年3月5日 08:05  ", Utc::now());
        assert_eq!(parsed, PublishDate::Parsed(utc(2024, 3, 5, 0, 5, 0)));
    }

    #[test]
    fn test_unknown_format_falls_back_to_now() {
        let now = utc(2024, 12, 1, 0, 0, 0);
        for text in ["3小时前", "", "2024-13-45 99:99:99"] {
            let parsed = parse_publish_date(text, now);
            assert!(parsed.is_fallback());
            assert_eq!(parsed.timestamp(), now);
        }
    }
}
