// src/plans.rs
use serde::{Deserialize, Serialize, Serializer};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PlanId {
    Free,
    Pro,
}

impl PlanId {
    pub fn plan(self) -> &'static Plan {
        match self {
            PlanId::Free => &FREE,
            PlanId::Pro => &PRO,
        }
    }
}

/// A quota either caps usage at a finite count or is unbounded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quota {
    Limited(u32),
    Unbounded,
}

impl Quota {
    /// Whether one more unit fits after `used` units were consumed.
    pub fn allows(self, used: u32) -> bool {
        match self {
            Quota::Limited(limit) => used < limit,
            Quota::Unbounded => true,
        }
    }

    pub fn remaining(self, used: u32) -> Quota {
        match self {
            Quota::Limited(limit) => Quota::Limited(limit.saturating_sub(used)),
            Quota::Unbounded => Quota::Unbounded,
        }
    }

    pub fn is_unbounded(self) -> bool {
        matches!(self, Quota::Unbounded)
    }
}

// Limited quotas go over the wire as plain numbers, the sentinel as "unbounded".
impl Serialize for Quota {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Quota::Limited(n) => serializer.serialize_u32(*n),
            Quota::Unbounded => serializer.serialize_str("unbounded"),
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Plan {
    pub id: PlanId,
    pub name: &'static str,
    pub price_cents: u32,
    pub daily_sessions: Quota,
    pub messages_per_session: Quota,
    pub monthly_messages: Quota,
}

pub const FREE: Plan = Plan {
    id: PlanId::Free,
    name: "Free",
    price_cents: 0,
    daily_sessions: Quota::Limited(3),
    messages_per_session: Quota::Limited(10),
    monthly_messages: Quota::Limited(100),
};

pub const PRO: Plan = Plan {
    id: PlanId::Pro,
    name: "Pro",
    price_cents: 999,
    daily_sessions: Quota::Unbounded,
    messages_per_session: Quota::Unbounded,
    monthly_messages: Quota::Unbounded,
};

pub fn catalog() -> [&'static Plan; 2] {
    [&FREE, &PRO]
}
