use chrono::{DateTime, Datelike, Local, TimeZone, Timelike, Utc};

/// `YYYY-M-D`, or `YYYY-M-D HH:MM:SS` with `show_time`, in the given zone.
pub fn format_date_in<Tz: TimeZone>(ts: &DateTime<Utc>, tz: &Tz, show_time: bool) -> String {
    let dt = ts.with_timezone(tz);
    let date = format!("{}-{}-{}", dt.year(), dt.month(), dt.day());
    if !show_time {
        return date;
    }
    format!(
        "{} {:02}:{:02}:{:02}",
        date,
        dt.hour(),
        dt.minute(),
        dt.second()
    )
}

pub fn timestamp_to_date(ts: &DateTime<Utc>, show_time: bool) -> String {
    format_date_in(ts, &Local, show_time)
}
