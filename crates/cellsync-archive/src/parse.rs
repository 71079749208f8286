use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%Y%m%d"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Best-effort date parsing. Time components are discarded; for RFC 3339
/// stamps the date is taken as written, without converting the offset.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Empty or non-numeric values become `None`.
pub fn parse_traffic(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_iso_dates() {
        assert_eq!(parse_date("2024-01-05"), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date(" 2024-01-05 "), Some(ymd(2024, 1, 5)));
    }

    #[test]
    fn parses_datetimes_to_dates() {
        assert_eq!(parse_date("2024-01-05 00:00:00"), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date("2024-01-05T13:45:00"), Some(ymd(2024, 1, 5)));
    }

    #[test]
    fn parses_zoned_and_fractional_timestamps() {
        assert_eq!(parse_date("2024-01-05T00:00:00Z"), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date("2024-01-05T00:00:00+00:00"), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date("2024-01-05T23:30:00-05:00"), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date("2024-01-05T00:00:00.000"), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date("2024-01-05 00:00:00.0"), Some(ymd(2024, 1, 5)));
    }

    #[test]
    fn slash_dates_are_month_first() {
        assert_eq!(parse_date("01/05/2024"), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date("2024/01/05"), Some(ymd(2024, 1, 5)));
    }

    #[test]
    fn compact_dates() {
        assert_eq!(parse_date("20240105"), Some(ymd(2024, 1, 5)));
    }

    #[test]
    fn garbage_is_none() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date("2024-13-01"), None);
    }

    #[test]
    fn traffic_values() {
        assert_eq!(parse_traffic("12.5"), Some(12.5));
        assert_eq!(parse_traffic(" 3 "), Some(3.0));
        assert_eq!(parse_traffic(""), None);
        assert_eq!(parse_traffic("n/a"), None);
        assert_eq!(parse_traffic("NaN"), None);
    }
}
