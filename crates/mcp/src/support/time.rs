#![forbid(unsafe_code)]

use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime};

pub(crate) fn now_ms_i64() -> i64 {
    let ms = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000i128;
    i64::try_from(ms.max(0)).unwrap_or(i64::MAX)
}

pub(crate) fn ts_ms_to_rfc3339(ts_ms: i64) -> String {
    let nanos = i128::from(ts_ms) * 1_000_000i128;
    let dt = OffsetDateTime::from_unix_timestamp_nanos(nanos).unwrap_or(OffsetDateTime::UNIX_EPOCH);
    dt.format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Calendar date in UTC; the default disposal date.
pub(crate) fn today_utc() -> Date {
    OffsetDateTime::now_utc().date()
}
