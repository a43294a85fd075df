use chrono::{Duration, Local, NaiveDate, NaiveDateTime};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Current local time as stored in the database.
pub fn now() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

pub fn today() -> String {
    Local::now().format(DATE_FORMAT).to_string()
}

pub fn unix_now() -> i64 {
    Local::now().timestamp()
}

/// Timestamp `days` days before now, comparable against stored timestamps.
pub fn days_ago(days: i64) -> String {
    (Local::now() - Duration::days(days))
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT).ok()
}
