use chrono::{DateTime, Utc};
use tokio::time::Instant;

pub const SECONDS_PER_MINUTE: i64 = 60;

pub fn now_i64() -> i64 {
    Utc::now().timestamp()
}

pub fn unix_to_datetime(unix_ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(unix_ts, 0)
}

pub fn get_instant() -> Instant {
    Instant::now()
}
