use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

pub const MARKET_TZ: Tz = chrono_tz::America::New_York;

/// `YYYY-MM-DD HH:MM:SS EST` (or `EDT` during daylight time).
pub fn eastern_timestamp(now: DateTime<Utc>) -> String {
    now.with_timezone(&MARKET_TZ)
        .format("%Y-%m-%d %H:%M:%S %Z")
        .to_string()
}

pub fn eastern_date(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&MARKET_TZ).date_naive()
}
