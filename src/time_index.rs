use chrono::{NaiveDateTime, TimeDelta};
use std::collections::{BTreeMap, HashSet};

/// Groups open clients by their current `last_seen` timestamp.
///
/// Each ip lives in at most one bucket: the one keyed by its latest
/// timestamp. Buckets are kept in key order so expired ones form a prefix
/// that can be split off in one step. A bucket may be left empty after its
/// members move on; it is dropped by the sweep that expires it.
#[derive(Debug, Default)]
pub struct TimeIndex {
    buckets: BTreeMap<NaiveDateTime, HashSet<String>>,
}

impl TimeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `ip` to the bucket for `timestamp`. A no-op if already present.
    pub fn record(&mut self, timestamp: NaiveDateTime, ip: &str) {
        let bucket = self.buckets.entry(timestamp).or_default();
        if !bucket.contains(ip) {
            bucket.insert(ip.to_string());
        }
    }

    /// Take `ip` out of the bucket at `old_timestamp`, if it is there.
    pub fn move_out(&mut self, old_timestamp: NaiveDateTime, ip: &str) {
        if let Some(bucket) = self.buckets.get_mut(&old_timestamp) {
            bucket.remove(ip);
        }
    }

    /// Delete every bucket whose age relative to `current` is strictly
    /// greater than `threshold` and return the ips they held.
    pub fn sweep(&mut self, current: NaiveDateTime, threshold: TimeDelta) -> Vec<String> {
        // age > threshold  <=>  t < current - threshold
        let Some(cutoff) = current.checked_sub_signed(threshold) else {
            return Vec::new();
        };

        let live = self.buckets.split_off(&cutoff);
        let expired = std::mem::replace(&mut self.buckets, live);
        expired.into_values().flatten().collect()
    }

    pub fn contains_key(&self, timestamp: &NaiveDateTime) -> bool {
        self.buckets.contains_key(timestamp)
    }

    pub fn bucket(&self, timestamp: &NaiveDateTime) -> Option<&HashSet<String>> {
        self.buckets.get(timestamp)
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Number of buckets, including ones emptied by moves.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn ips(&self) -> impl Iterator<Item = &str> {
        self.buckets.values().flatten().map(String::as_str)
    }
}
