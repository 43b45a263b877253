//! 日期工具：保存期限、日終時刻與寬鬆的日期解析
//!
//! 帳本只使用單一的門市本地時鐘（`NaiveDateTime`）。帶時區偏移的
//! RFC 3339 時間戳會被正規化為 UTC 掛鐘時間。

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, NaiveTime};

use crate::{LedgerError, Result};

/// 日期序列化格式
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 日期時間序列化格式
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

const DATETIME_PARSE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// 當日起始時刻（00:00:00）
pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// 當日最後時刻（23:59:59.999）
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    let last = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    date.and_time(last)
}

/// 入庫日加上保存天數得到到期日
pub fn expiry_date(stock_date: NaiveDate, shelf_life_days: u32) -> NaiveDate {
    stock_date
        .checked_add_days(Days::new(u64::from(shelf_life_days)))
        .unwrap_or(NaiveDate::MAX)
}

/// 截至 `as_of` 是否已過期（到期日當天即計入）
pub fn is_expired_as_of(expiry_date: NaiveDate, as_of: NaiveDate) -> bool {
    expiry_date <= as_of
}

/// 解析日期時間
///
/// 接受 `YYYY-MM-DD`（視為午夜）、`YYYY-MM-DDTHH:MM[:SS[.fff]]`
/// 以及帶偏移的 RFC 3339 字串。
pub fn parse_datetime(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.naive_utc());
    }

    for format in DATETIME_PARSE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(dt);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        return Ok(start_of_day(date));
    }

    Err(LedgerError::validation(format!("無效的日期時間: {raw}")))
}

/// 解析日期（日期時間字串取其日期部分）
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        return Ok(date);
    }
    parse_datetime(trimmed)
        .map(|dt| dt.date())
        .map_err(|_| LedgerError::validation(format!("無效的日期: {trimmed}")))
}

/// `NaiveDate` 的 serde 適配（`#[serde(with = "...")]`）
pub mod serde_date {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        date: &NaiveDate,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format(super::DATE_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_date(&raw).map_err(de::Error::custom)
    }
}

/// `NaiveDateTime` 的 serde 適配
pub mod serde_datetime {
    use chrono::NaiveDateTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        dt: &NaiveDateTime,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(&dt.format(super::DATETIME_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_datetime(&raw).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_expiry_date() {
        assert_eq!(expiry_date(date(2024, 1, 1), 5), date(2024, 1, 6));
        assert_eq!(expiry_date(date(2024, 2, 27), 3), date(2024, 3, 1)); // 閏年
        assert_eq!(expiry_date(date(2024, 3, 1), 0), date(2024, 3, 1));
    }

    #[test]
    fn test_end_of_day() {
        let eod = end_of_day(date(2024, 1, 6));
        assert_eq!(eod.format("%H:%M:%S%.3f").to_string(), "23:59:59.999");
        assert!(eod < start_of_day(date(2024, 1, 7)));
    }

    #[rstest]
    #[case(date(2024, 1, 5), false)]
    #[case(date(2024, 1, 6), true)] // 到期日當天
    #[case(date(2024, 2, 1), true)]
    fn test_expired_as_of(#[case] as_of: NaiveDate, #[case] expired: bool) {
        assert_eq!(is_expired_as_of(date(2024, 1, 6), as_of), expired);
    }

    #[rstest]
    #[case("2024-03-03", "2024-03-03T00:00:00.000")]
    #[case("2024-03-03T10:15", "2024-03-03T10:15:00.000")]
    #[case("2024-03-03T10:15:30", "2024-03-03T10:15:30.000")]
    #[case("2024-03-03 10:15:30.250", "2024-03-03T10:15:30.250")]
    #[case("2024-03-03T10:15:30.000Z", "2024-03-03T10:15:30.000")]
    #[case("2024-03-03T15:45:00+05:30", "2024-03-03T10:15:00.000")]
    fn test_parse_datetime(#[case] raw: &str, #[case] expected: &str) {
        let parsed = parse_datetime(raw).unwrap();
        assert_eq!(parsed.format(DATETIME_FORMAT).to_string(), expected);
    }

    #[test]
    fn test_parse_date_from_datetime() {
        assert_eq!(parse_date("2024-03-01").unwrap(), date(2024, 3, 1));
        assert_eq!(parse_date("2024-03-01T08:00:00").unwrap(), date(2024, 3, 1));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(
            parse_datetime("yesterday"),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(parse_date("03/01/2024"), Err(LedgerError::Validation(_))));
    }
}
