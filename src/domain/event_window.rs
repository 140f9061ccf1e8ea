use chrono::{DateTime, Utc};

/// A start/end pair where the end is strictly after the start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl EventWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<EventWindow, String> {
        if end <= start {
            return Err("The event must end after it starts.".to_string());
        }
        Ok(Self { start, end })
    }

    /// Parses two RFC 3339 timestamps, e.g. `2024-05-01T09:30:00Z`.
    pub fn parse(start: &str, end: &str) -> Result<EventWindow, String> {
        let start = parse_timestamp(start)?;
        let end = parse_timestamp(end)?;
        Self::new(start, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| format!("{} is not a valid RFC 3339 timestamp.", s))
}
