// src/usage.rs
//! Freemium usage metering.
//!
//! Counters roll over lazily: every operation first runs [`reconcile`]
//! against the caller-supplied date, so there is no background timer and
//! tests can drive the calendar directly. Quota outcomes are plain booleans
//! and [`Quota`] values; nothing here fails.
use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::plans::{Plan, PlanId, Quota};

/// Accumulated strikes at which every request is denied until the next
/// monthly rollover.
pub const STRIKE_LIMIT: u32 = 3;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UsageState {
    pub plan: PlanId,
    pub sessions_today: u32,
    pub messages_this_session: u32,
    pub messages_this_month: u32,
    pub last_session_date: NaiveDate,
    /// First day of the month the monthly counters belong to.
    pub last_month_reset: NaiveDate,
    pub strikes: u32,
    #[serde(default)]
    pub last_strike_reason: Option<String>,
    #[serde(default)]
    pub subscription_id: Option<String>,
}

/// Why a session start or message send was refused.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Denial {
    #[serde(rename = "throttled")]
    Throttled,
    #[serde(rename = "sessions")]
    DailySessions,
    #[serde(rename = "messages")]
    SessionMessages,
    #[serde(rename = "monthly")]
    MonthlyMessages,
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

/// Applies the daily and monthly rollovers for `today`. A monthly rollover
/// also clears strikes.
pub fn reconcile(mut state: UsageState, today: NaiveDate) -> UsageState {
    if state.last_session_date != today {
        state.sessions_today = 0;
        state.last_session_date = today;
    }
    let month = month_start(today);
    if state.last_month_reset != month {
        state.messages_this_month = 0;
        state.last_month_reset = month;
        state.strikes = 0;
    }
    state
}

impl UsageState {
    pub fn new(plan: PlanId, today: NaiveDate) -> Self {
        UsageState {
            plan,
            sessions_today: 0,
            messages_this_session: 0,
            messages_this_month: 0,
            last_session_date: today,
            last_month_reset: month_start(today),
            strikes: 0,
            last_strike_reason: None,
            subscription_id: None,
        }
    }

    pub fn limits(&self) -> &'static Plan {
        self.plan.plan()
    }

    fn reconciled(&self, today: NaiveDate) -> UsageState {
        reconcile(self.clone(), today)
    }

    // The two denial checks assume `self` is already reconciled.
    fn start_denial(&self) -> Option<Denial> {
        let limits = self.limits();
        if self.strikes >= STRIKE_LIMIT {
            Some(Denial::Throttled)
        } else if !limits.daily_sessions.allows(self.sessions_today) {
            Some(Denial::DailySessions)
        } else if !limits.monthly_messages.allows(self.messages_this_month) {
            Some(Denial::MonthlyMessages)
        } else {
            None
        }
    }

    fn message_denial(&self) -> Option<Denial> {
        let limits = self.limits();
        if self.strikes >= STRIKE_LIMIT {
            Some(Denial::Throttled)
        } else if !limits.messages_per_session.allows(self.messages_this_session) {
            Some(Denial::SessionMessages)
        } else if !limits.monthly_messages.allows(self.messages_this_month) {
            Some(Denial::MonthlyMessages)
        } else {
            None
        }
    }

    /// Reason a session start would be refused today, without persisting
    /// the rollover.
    pub fn session_denial(&self, today: NaiveDate) -> Option<Denial> {
        self.reconciled(today).start_denial()
    }

    pub fn send_denial(&self, today: NaiveDate) -> Option<Denial> {
        self.reconciled(today).message_denial()
    }

    pub fn is_throttled(&self, today: NaiveDate) -> bool {
        self.reconciled(today).strikes >= STRIKE_LIMIT
    }

    pub fn can_start_session(&self, today: NaiveDate) -> bool {
        self.session_denial(today).is_none()
    }

    /// Rolls over, then consumes one daily session and resets the
    /// per-session message counter. On denial only the rollover is kept.
    pub fn start_session(&mut self, today: NaiveDate) -> bool {
        *self = self.reconciled(today);
        if self.start_denial().is_some() {
            return false;
        }
        self.sessions_today += 1;
        self.messages_this_session = 0;
        true
    }

    pub fn can_send_message(&self, today: NaiveDate) -> bool {
        self.send_denial(today).is_none()
    }

    /// Rolls over, then counts one message against both the session and
    /// the monthly quota.
    pub fn add_message(&mut self, today: NaiveDate) -> bool {
        *self = self.reconciled(today);
        if self.message_denial().is_some() {
            return false;
        }
        self.messages_this_session += 1;
        self.messages_this_month += 1;
        true
    }

    pub fn remaining_sessions(&self, today: NaiveDate) -> Quota {
        let view = self.reconciled(today);
        view.limits().daily_sessions.remaining(view.sessions_today)
    }

    pub fn remaining_messages(&self) -> Quota {
        self.limits()
            .messages_per_session
            .remaining(self.messages_this_session)
    }

    pub fn remaining_monthly_messages(&self, today: NaiveDate) -> Quota {
        let view = self.reconciled(today);
        view.limits().monthly_messages.remaining(view.messages_this_month)
    }

    pub fn reset_session(&mut self) {
        self.messages_this_session = 0;
    }

    pub fn set_plan(&mut self, plan: PlanId) {
        self.plan = plan;
    }

    pub fn set_subscription_id(&mut self, id: Option<String>) {
        self.subscription_id = id;
    }

    /// Records a moderation strike. Strikes from a previous month are
    /// forgiven before counting the new one.
    pub fn add_strike(&mut self, reason: impl Into<String>, today: NaiveDate) {
        *self = self.reconciled(today);
        self.strikes += 1;
        self.last_strike_reason = Some(reason.into());
    }

    pub fn summary(&self, today: NaiveDate) -> UsageSummary {
        let view = self.reconciled(today);
        UsageSummary {
            plan: view.plan,
            sessions_today: view.sessions_today,
            messages_this_session: view.messages_this_session,
            messages_this_month: view.messages_this_month,
            strikes: view.strikes,
            throttled: view.strikes >= STRIKE_LIMIT,
            remaining_sessions: view.limits().daily_sessions.remaining(view.sessions_today),
            remaining_messages: view.remaining_messages(),
            remaining_monthly_messages: view
                .limits()
                .monthly_messages
                .remaining(view.messages_this_month),
            can_start_session: view.start_denial().is_none(),
            can_send_message: view.message_denial().is_none(),
            subscription_id: view.subscription_id,
        }
    }
}

/// Read-time view of the metering state for clients.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct UsageSummary {
    pub plan: PlanId,
    pub sessions_today: u32,
    pub messages_this_session: u32,
    pub messages_this_month: u32,
    pub strikes: u32,
    pub throttled: bool,
    pub remaining_sessions: Quota,
    pub remaining_messages: Quota,
    pub remaining_monthly_messages: Quota,
    pub can_start_session: bool,
    pub can_send_message: bool,
    pub subscription_id: Option<String>,
}
