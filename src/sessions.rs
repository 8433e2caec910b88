// src/sessions.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{NewSessionRecord, Outcome, SessionRecord, SessionStats};

/// Append-only log of finished practice sessions, newest first. Stats are
/// always derived from the records, never stored alongside them.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct SessionLog {
    records: Vec<SessionRecord>,
}

impl SessionLog {
    pub fn add(&mut self, record: NewSessionRecord, now: DateTime<Utc>) -> SessionRecord {
        let record = SessionRecord {
            id: Uuid::new_v4(),
            venue_id: record.venue_id,
            venue_name: record.venue_name,
            outcome: record.outcome,
            persona_name: record.persona_name,
            opener_used: record.opener_used,
            notes: record.notes,
            created_at: now,
        };
        self.records.insert(0, record.clone());
        record
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn recent(&self, count: usize) -> &[SessionRecord] {
        &self.records[..count.min(self.records.len())]
    }

    pub fn records(&self) -> &[SessionRecord] {
        &self.records
    }

    pub fn stats(&self) -> SessionStats {
        stats(&self.records)
    }
}

pub fn stats(records: &[SessionRecord]) -> SessionStats {
    let count = |outcome: Outcome| records.iter().filter(|r| r.outcome == outcome).count();
    let total = records.len();
    let success = count(Outcome::Success);
    let success_rate = if total > 0 {
        success as f64 / total as f64 * 100.0
    } else {
        0.0
    };
    SessionStats {
        total,
        success,
        neutral: count(Outcome::Neutral),
        reject: count(Outcome::Reject),
        success_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(outcome: Outcome) -> NewSessionRecord {
        NewSessionRecord {
            venue_id: "janss-steps".into(),
            venue_name: "Janss Steps".into(),
            outcome,
            persona_name: Some("Maya".into()),
            opener_used: None,
            notes: None,
        }
    }

    #[test]
    fn empty_log_has_zero_rate() {
        let log = SessionLog::default();
        let stats = log.stats();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.success_rate, 0.0);
    }

    #[test]
    fn stats_recompute_as_outcomes_arrive() {
        let mut log = SessionLog::default();
        let now = Utc::now();
        log.add(record(Outcome::Success), now);
        assert_eq!(log.stats().success_rate, 100.0);
        log.add(record(Outcome::Reject), now);
        log.add(record(Outcome::Success), now);
        log.add(record(Outcome::Neutral), now);

        let stats = log.stats();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.success, 2);
        assert_eq!(stats.reject, 1);
        assert_eq!(stats.neutral, 1);
        assert_eq!(stats.success_rate, 50.0);
    }

    #[test]
    fn newest_first_and_recent_caps() {
        let mut log = SessionLog::default();
        let now = Utc::now();
        let first = log.add(record(Outcome::Neutral), now);
        let second = log.add(record(Outcome::Success), now);
        assert_eq!(log.recent(1), &[second.clone()]);
        assert_eq!(log.recent(10).len(), 2);
        assert_eq!(log.records()[1], first);
    }

    #[test]
    fn clear_resets_stats() {
        let mut log = SessionLog::default();
        log.add(record(Outcome::Success), Utc::now());
        log.clear();
        assert_eq!(log.stats(), stats(&[]));
        assert!(log.records().is_empty());
    }
}
