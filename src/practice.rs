// src/practice.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ChatMessage, NewSessionRecord, Outcome, Persona, PracticeSession, Role, Venue};

pub const HISTORY_CAP: usize = 50;

/// The in-progress roleplay (at most one) plus recently finished ones.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PracticeTracker {
    #[serde(default)]
    current: Option<PracticeSession>,
    #[serde(default)]
    history: Vec<PracticeSession>,
}

impl PracticeTracker {
    /// Starts a new practice, replacing any session still in progress.
    pub fn start(&mut self, venue: Venue, persona: Persona, now: DateTime<Utc>) -> &PracticeSession {
        self.current.insert(PracticeSession {
            id: Uuid::new_v4(),
            venue,
            persona,
            messages: Vec::new(),
            outcome: None,
            started_at: now,
            ended_at: None,
        })
    }

    pub fn current(&self) -> Option<&PracticeSession> {
        self.current.as_ref()
    }

    pub fn history(&self) -> &[PracticeSession] {
        &self.history
    }

    /// Appends a message to the current practice. Returns `None` when no
    /// practice is active.
    pub fn push_message(
        &mut self,
        role: Role,
        content: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Option<&ChatMessage> {
        let practice = self.current.as_mut()?;
        practice.messages.push(ChatMessage {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: now,
        });
        practice.messages.last()
    }

    pub fn end(&mut self, outcome: Outcome, now: DateTime<Utc>) -> Option<PracticeSession> {
        let mut finished = self.current.take()?;
        finished.outcome = Some(outcome);
        finished.ended_at = Some(now);
        self.history.insert(0, finished.clone());
        self.history.truncate(HISTORY_CAP);
        Some(finished)
    }

    pub fn clear_current(&mut self) -> Option<PracticeSession> {
        self.current.take()
    }
}

impl PracticeSession {
    /// The session-log entry this finished practice becomes.
    pub fn to_record(&self, opener_used: Option<String>, notes: Option<String>) -> Option<NewSessionRecord> {
        Some(NewSessionRecord {
            venue_id: self.venue.id.clone(),
            venue_name: self.venue.name.clone(),
            outcome: self.outcome?,
            persona_name: Some(self.persona.name.clone()),
            opener_used,
            notes,
        })
    }
}
