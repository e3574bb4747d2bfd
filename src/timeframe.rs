/// Reporting windows used by the dashboards
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

/// Rolling and calendar windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// Since midnight UTC
    Today,
    LastHour,
    Last24Hours,
    Last7Days,
    Last30Days,
}

impl Window {
    /// Inclusive lower bound of the window ending at `now`
    pub fn since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Window::Today => start_of_day(now),
            Window::LastHour => now - Duration::hours(1),
            Window::Last24Hours => now - Duration::hours(24),
            Window::Last7Days => now - Duration::days(7),
            Window::Last30Days => now - Duration::days(30),
        }
    }
}

/// Midnight UTC of the day containing `at`
pub fn start_of_day(at: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&at.date_naive().and_time(chrono::NaiveTime::MIN))
}

/// Every calendar day from `since` through `now`, oldest first
pub fn days_between(since: DateTime<Utc>, now: DateTime<Utc>) -> Vec<NaiveDate> {
    since
        .date_naive()
        .iter_days()
        .take_while(|day| *day <= now.date_naive())
        .collect()
}

/// Render elapsed seconds as `HH:MM:SS`; hours are not wrapped at 24
pub fn format_seconds_hhmmss(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}
