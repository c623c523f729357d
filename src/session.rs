use crate::error::{Result, SessionizeError};
use crate::models::{DurationMode, Session};
use chrono::NaiveDateTime;
use std::collections::HashMap;

/// Outcome of folding one event into the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Upsert {
    /// `last_seen` before the event, when the event moved it
    pub previous_last_seen: Option<NaiveDateTime>,
}

impl Upsert {
    pub fn time_changed(&self) -> bool {
        self.previous_last_seen.is_some()
    }
}

/// Open sessions keyed by client ip, at most one per ip.
pub struct SessionTable {
    sessions: HashMap<String, Session>,
    duration_mode: DurationMode,
}

impl SessionTable {
    pub fn new(duration_mode: DurationMode) -> Self {
        Self {
            sessions: HashMap::new(),
            duration_mode,
        }
    }

    pub fn upsert(&mut self, ip: &str, timestamp: NaiveDateTime, rank: u64) -> Upsert {
        match self.sessions.get_mut(ip) {
            Some(session) => Upsert {
                previous_last_seen: session.touch(timestamp, self.duration_mode),
            },
            None => {
                self.sessions
                    .insert(ip.to_string(), Session::open(ip, timestamp, rank));
                Upsert {
                    previous_last_seen: None,
                }
            }
        }
    }

    pub fn remove(&mut self, ip: &str) -> Result<Session> {
        self.sessions
            .remove(ip)
            .ok_or_else(|| SessionizeError::UnknownClient(ip.to_string()))
    }

    /// Remove every listed ip and return the sessions in ascending rank.
    pub fn remove_in_rank_order<I>(&mut self, ips: I) -> Result<Vec<Session>>
    where
        I: IntoIterator<Item = String>,
    {
        let mut closed = ips
            .into_iter()
            .map(|ip| self.remove(&ip))
            .collect::<Result<Vec<_>>>()?;
        closed.sort_unstable_by_key(|s| s.rank);
        Ok(closed)
    }

    pub fn drain_in_rank_order(&mut self) -> Vec<Session> {
        let mut remaining: Vec<Session> = self.sessions.drain().map(|(_, s)| s).collect();
        remaining.sort_unstable_by_key(|s| s.rank);
        remaining
    }

    pub fn get(&self, ip: &str) -> Option<&Session> {
        self.sessions.get(ip)
    }

    pub fn contains(&self, ip: &str) -> bool {
        self.sessions.contains_key(ip)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ts;

    #[test]
    fn test_upsert_creates_then_updates() {
        let mut table = SessionTable::new(DurationMode::SecondField);

        let first = table.upsert("a", ts("2017-06-30 00:00:00"), 1);
        assert!(!first.time_changed());

        let same = table.upsert("a", ts("2017-06-30 00:00:00"), 2);
        assert!(!same.time_changed());

        let later = table.upsert("a", ts("2017-06-30 00:00:09"), 3);
        assert_eq!(later.previous_last_seen, Some(ts("2017-06-30 00:00:00")));

        let session = table.get("a").unwrap();
        assert_eq!(session.event_count, 3);
        assert_eq!(session.duration, 10);
        assert_eq!(session.rank, 1);
    }

    #[test]
    fn test_remove_unknown_client_fails() {
        let mut table = SessionTable::new(DurationMode::SecondField);
        let err = table.remove("nobody").unwrap_err();
        assert!(matches!(err, SessionizeError::UnknownClient(ip) if ip == "nobody"));
    }

    #[test]
    fn test_drain_orders_by_rank() {
        let mut table = SessionTable::new(DurationMode::SecondField);
        for (rank, ip) in ["c", "a", "d", "b"].iter().enumerate() {
            table.upsert(ip, ts("2017-06-30 00:00:00"), rank as u64 + 1);
        }

        let drained: Vec<String> = table.drain_in_rank_order().into_iter().map(|s| s.ip).collect();
        assert_eq!(drained, vec!["c", "a", "d", "b"]);
        assert!(table.is_empty());
    }

    #[test]
    fn test_remove_in_rank_order_ignores_input_order() {
        let mut table = SessionTable::new(DurationMode::SecondField);
        table.upsert("x", ts("2017-06-30 00:00:00"), 1);
        table.upsert("y", ts("2017-06-30 00:00:00"), 2);
        table.upsert("z", ts("2017-06-30 00:00:00"), 3);

        let closed = table
            .remove_in_rank_order(vec!["z".to_string(), "x".to_string()])
            .unwrap();
        let ips: Vec<&str> = closed.iter().map(|s| s.ip.as_str()).collect();
        assert_eq!(ips, vec!["x", "z"]);
        assert_eq!(table.len(), 1);
        assert!(table.contains("y"));
    }
}
