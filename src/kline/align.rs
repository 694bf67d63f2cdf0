//! Bucket alignment: maps an instant to the (open_time, close_time) pair
//! of the bucket it falls in, per interval's grid.

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc, Weekday};

use crate::models::side::Interval;

/// Returns `(open_time, close_time)` for the bucket containing `t`.
/// `close_time = open_time + interval − 1ms`.
pub fn bucket_for(interval: Interval, t: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let open = floor_to_grid(interval, t);
    let close = open + interval.duration() - Duration::milliseconds(1);
    (open, close)
}

fn floor_to_grid(interval: Interval, t: DateTime<Utc>) -> DateTime<Utc> {
    match interval {
        Interval::OneMinute | Interval::FiveMinutes | Interval::FifteenMinutes | Interval::ThirtyMinutes => {
            let step = interval.duration().num_minutes();
            let floored_minute = (t.minute() as i64 / step) * step;
            Utc.with_ymd_and_hms(t.year(), t.month(), t.day(), t.hour(), floored_minute as u32, 0)
                .single()
                .expect("valid floored timestamp")
        }
        Interval::OneHour => Utc
            .with_ymd_and_hms(t.year(), t.month(), t.day(), t.hour(), 0, 0)
            .single()
            .expect("valid floored timestamp"),
        Interval::FourHours => {
            let floored_hour = (t.hour() / 4) * 4;
            Utc.with_ymd_and_hms(t.year(), t.month(), t.day(), floored_hour, 0, 0)
                .single()
                .expect("valid floored timestamp")
        }
        Interval::OneDay => Utc
            .with_ymd_and_hms(t.year(), t.month(), t.day(), 0, 0, 0)
            .single()
            .expect("valid floored timestamp"),
        Interval::OneWeek => {
            let date_midnight = Utc
                .with_ymd_and_hms(t.year(), t.month(), t.day(), 0, 0, 0)
                .single()
                .expect("valid floored timestamp");
            let days_since_monday = date_midnight.weekday().num_days_from_monday() as i64;
            date_midnight - Duration::days(days_since_monday)
        }
    }
}

/// Returns `true` if `open_time` sits exactly on the interval's grid.
pub fn is_aligned(interval: Interval, open_time: DateTime<Utc>) -> bool {
    bucket_for(interval, open_time).0 == open_time
}
