//! Windowing engine: folds a time-ordered event stream into sessions.
//!
//! Expiry is only evaluated when an event brings a timestamp that has no
//! bucket yet, and only against that newest timestamp. Events that share a
//! timestamp never expire each other. Input must be non-decreasing in time;
//! out-of-order input gives unspecified (but memory-safe) results.

use crate::error::Result;
use crate::models::{DurationMode, LogEvent, Session};
use crate::session::SessionTable;
use crate::time_index::TimeIndex;
use chrono::TimeDelta;
use tracing::{debug, trace};

pub struct Sessionizer {
    threshold: TimeDelta,
    sessions: SessionTable,
    index: TimeIndex,
    sweeps: u64,
}

impl Sessionizer {
    pub fn new(inactivity_secs: u64, duration_mode: DurationMode) -> Self {
        let threshold = i64::try_from(inactivity_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or_else(TimeDelta::max_value);

        Self {
            threshold,
            sessions: SessionTable::new(duration_mode),
            index: TimeIndex::new(),
            sweeps: 0,
        }
    }

    /// Feed one event. Returns the sessions it closed, in ascending rank.
    pub fn observe(&mut self, event: &LogEvent) -> Result<Vec<Session>> {
        let ip = event.ip.as_str();
        let timestamp = event.timestamp;

        let upsert = self.sessions.upsert(ip, timestamp, event.rank);

        // Very first event: nothing to compare against
        if self.index.is_empty() {
            self.index.record(timestamp, ip);
            return Ok(Vec::new());
        }

        let new_timestamp = !self.index.contains_key(&timestamp);

        // Move before any sweep so an ip is never expired out of a bucket it
        // has already left.
        if let Some(previous) = upsert.previous_last_seen {
            self.index.move_out(previous, ip);
        }
        self.index.record(timestamp, ip);

        if !new_timestamp {
            trace!(ip, %timestamp, "joined existing bucket");
            return Ok(Vec::new());
        }

        let expired = self.index.sweep(timestamp, self.threshold);
        if expired.is_empty() {
            return Ok(Vec::new());
        }

        self.sweeps += 1;
        let closed = self.sessions.remove_in_rank_order(expired)?;
        debug!(
            %timestamp,
            closed = closed.len(),
            open = self.sessions.len(),
            "sweep closed sessions"
        );
        Ok(closed)
    }

    /// End of stream: close everything still open, in ascending rank.
    pub fn finish(mut self) -> Vec<Session> {
        self.index = TimeIndex::new();
        self.sessions.drain_in_rank_order()
    }

    pub fn open_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Number of sweeps that closed at least one session.
    pub fn sweeps(&self) -> u64 {
        self.sweeps
    }

    #[cfg(test)]
    fn assert_consistent(&self) {
        let mut indexed: Vec<&str> = self.index.ips().collect();
        let total = indexed.len();
        indexed.sort_unstable();
        indexed.dedup();
        assert_eq!(indexed.len(), total, "ip present in more than one bucket");
        assert_eq!(indexed.len(), self.sessions.len());
        for ip in indexed {
            let session = self.sessions.get(ip).expect("indexed ip has a session");
            assert!(self.index.bucket(&session.last_seen).unwrap().contains(ip));
        }
    }
}

/// Run a whole event sequence through a fresh engine, returning sessions in
/// emission order.
pub fn sessionize<I>(events: I, inactivity_secs: u64, duration_mode: DurationMode) -> Result<Vec<Session>>
where
    I: IntoIterator<Item = LogEvent>,
{
    let mut engine = Sessionizer::new(inactivity_secs, duration_mode);
    let mut out = Vec::new();
    for event in events {
        out.extend(engine.observe(&event)?);
    }
    out.extend(engine.finish());
    Ok(out)
}
