use chrono::{NaiveDateTime, Timelike};
use std::fmt;
use std::str::FromStr;

/// Timestamp layout shared by the input `date`/`time` columns and the output rows.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One access-log record as it arrives from the record source.
/// `rank` is the 1-based arrival position among data rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub ip: String,
    pub timestamp: NaiveDateTime,
    pub rank: u64,
}

impl LogEvent {
    pub fn new(ip: impl Into<String>, timestamp: NaiveDateTime, rank: u64) -> Self {
        Self {
            ip: ip.into(),
            timestamp,
            rank,
        }
    }
}

/// How `Session::duration` is derived from `first_seen`/`last_seen`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurationMode {
    /// Difference of the seconds-of-minute fields plus one. Ignores minutes,
    /// hours and days, so it only matches wall-clock time for sessions that
    /// stay inside one minute. Kept as the default for output compatibility.
    #[default]
    SecondField,
    /// Whole elapsed seconds between first and last event, plus one.
    Elapsed,
}

impl DurationMode {
    pub fn duration(self, first_seen: NaiveDateTime, last_seen: NaiveDateTime) -> i64 {
        match self {
            DurationMode::SecondField => {
                i64::from(last_seen.second()) - i64::from(first_seen.second()) + 1
            }
            DurationMode::Elapsed => (last_seen - first_seen).num_seconds() + 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DurationMode::SecondField => "second-field",
            DurationMode::Elapsed => "elapsed",
        }
    }
}

impl fmt::Display for DurationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DurationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "second-field" => Ok(DurationMode::SecondField),
            "elapsed" => Ok(DurationMode::Elapsed),
            other => Err(format!(
                "unknown duration mode '{}' (expected 'second-field' or 'elapsed')",
                other
            )),
        }
    }
}

/// Aggregated activity of one client. Mutable while held by the session
/// table; once removed it is a finished output record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub ip: String,
    pub first_seen: NaiveDateTime,
    pub last_seen: NaiveDateTime,
    pub duration: i64,
    pub event_count: u64,
    /// Rank of the first event for this ip. Only used to order emission.
    pub rank: u64,
}

impl Session {
    pub(crate) fn open(ip: &str, timestamp: NaiveDateTime, rank: u64) -> Self {
        Self {
            ip: ip.to_string(),
            first_seen: timestamp,
            last_seen: timestamp,
            duration: 1,
            event_count: 1,
            rank,
        }
    }

    /// Extend the session with another event. Returns the previous
    /// `last_seen` when it moved.
    pub(crate) fn touch(
        &mut self,
        timestamp: NaiveDateTime,
        mode: DurationMode,
    ) -> Option<NaiveDateTime> {
        let previous = self.last_seen;
        self.last_seen = timestamp;
        self.duration = mode.duration(self.first_seen, self.last_seen);
        self.event_count += 1;
        (previous != timestamp).then_some(previous)
    }

    pub fn first_seen_str(&self) -> String {
        self.first_seen.format(TIMESTAMP_FORMAT).to_string()
    }

    pub fn last_seen_str(&self) -> String {
        self.last_seen.format(TIMESTAMP_FORMAT).to_string()
    }
}

#[cfg(test)]
pub(crate) fn ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).expect("valid test timestamp")
}
