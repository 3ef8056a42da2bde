use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

/// Inclusive calendar-date window used to filter fetched activity.
///
/// `end` is inclusive through the whole day: an event created at
/// 2024-01-31T23:59:59Z is inside the window `2024-01-01..2024-01-31`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// First instant inside the window (start of `start` day, UTC).
    pub fn start_instant(&self) -> DateTime<Utc> {
        self.start.and_time(NaiveTime::MIN).and_utc()
    }

    /// First instant past the window (start of the day after `end`, UTC).
    pub fn end_instant(&self) -> DateTime<Utc> {
        self.end.and_time(NaiveTime::MIN).and_utc() + Duration::days(1)
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start_instant() && instant < self.end_instant()
    }
}

impl std::fmt::Display for DateWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}
