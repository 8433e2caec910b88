// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::plans::PlanId;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Food,
    Shopping,
    Campus,
    Gym,
    Outdoor,
    Social,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Food,
        Category::Shopping,
        Category::Campus,
        Category::Gym,
        Category::Outdoor,
        Category::Social,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Food => "food",
            Category::Shopping => "shopping",
            Category::Campus => "campus",
            Category::Gym => "gym",
            Category::Outdoor => "outdoor",
            Category::Social => "social",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TimeSlot {
    Morning,
    Afternoon,
    Evening,
    LateNight,
}

impl TimeSlot {
    pub const ALL: [TimeSlot; 4] = [
        TimeSlot::Morning,
        TimeSlot::Afternoon,
        TimeSlot::Evening,
        TimeSlot::LateNight,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TimeSlot::Morning => "morning",
            TimeSlot::Afternoon => "afternoon",
            TimeSlot::Evening => "evening",
            TimeSlot::LateNight => "latenight",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeSlot::Morning => "Morning (5am-12pm)",
            TimeSlot::Afternoon => "Afternoon (12pm-5pm)",
            TimeSlot::Evening => "Evening (5pm-10pm)",
            TimeSlot::LateNight => "Late Night (10pm-5am)",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Mon,
        DayOfWeek::Tue,
        DayOfWeek::Wed,
        DayOfWeek::Thu,
        DayOfWeek::Fri,
        DayOfWeek::Sat,
        DayOfWeek::Sun,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DayOfWeek::Mon => "mon",
            DayOfWeek::Tue => "tue",
            DayOfWeek::Wed => "wed",
            DayOfWeek::Thu => "thu",
            DayOfWeek::Fri => "fri",
            DayOfWeek::Sat => "sat",
            DayOfWeek::Sun => "sun",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Demographic {
    Asian,
    Black,
    Latina,
    White,
    Mena,
    SouthAsian,
}

impl Demographic {
    pub const ALL: [Demographic; 6] = [
        Demographic::Asian,
        Demographic::Black,
        Demographic::Latina,
        Demographic::White,
        Demographic::Mena,
        Demographic::SouthAsian,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Demographic::Asian => "asian",
            Demographic::Black => "black",
            Demographic::Latina => "latina",
            Demographic::White => "white",
            Demographic::Mena => "mena",
            Demographic::SouthAsian => "southasian",
        }
    }
}

/// Error returned when a query-string token names no known variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown value '{}'", self.0)
    }
}

macro_rules! impl_from_str {
    ($ty:ty) => {
        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let needle = s.trim().to_ascii_lowercase();
                <$ty>::ALL
                    .into_iter()
                    .find(|v| v.as_str() == needle)
                    .ok_or_else(|| UnknownVariant(s.to_string()))
            }
        }
    };
}

impl_from_str!(Category);
impl_from_str!(TimeSlot);
impl_from_str!(DayOfWeek);
impl_from_str!(Demographic);

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// One multiplicative weight per demographic group.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DemographicWeights {
    pub asian: f64,
    pub black: f64,
    pub latina: f64,
    pub white: f64,
    pub mena: f64,
    pub southasian: f64,
}

impl DemographicWeights {
    pub fn weight(&self, demographic: Demographic) -> f64 {
        match demographic {
            Demographic::Asian => self.asian,
            Demographic::Black => self.black,
            Demographic::Latina => self.latina,
            Demographic::White => self.white,
            Demographic::Mena => self.mena,
            Demographic::SouthAsian => self.southasian,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DayScores {
    pub mon: u8,
    pub tue: u8,
    pub wed: u8,
    pub thu: u8,
    pub fri: u8,
    pub sat: u8,
    pub sun: u8,
}

impl DayScores {
    pub fn get(&self, day: DayOfWeek) -> u8 {
        match day {
            DayOfWeek::Mon => self.mon,
            DayOfWeek::Tue => self.tue,
            DayOfWeek::Wed => self.wed,
            DayOfWeek::Thu => self.thu,
            DayOfWeek::Fri => self.fri,
            DayOfWeek::Sat => self.sat,
            DayOfWeek::Sun => self.sun,
        }
    }
}

/// Base scores indexed by time slot, then day of week. Every cell is a
/// required field, so a table with a missing cell never deserializes.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScoreTable {
    pub morning: DayScores,
    pub afternoon: DayScores,
    pub evening: DayScores,
    pub latenight: DayScores,
}

impl ScoreTable {
    pub fn get(&self, slot: TimeSlot, day: DayOfWeek) -> u8 {
        let row = match slot {
            TimeSlot::Morning => &self.morning,
            TimeSlot::Afternoon => &self.afternoon,
            TimeSlot::Evening => &self.evening,
            TimeSlot::LateNight => &self.latenight,
        };
        row.get(day)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrowdDensity {
    Low,
    Medium,
    High,
    #[serde(rename = "Very High")]
    VeryHigh,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Venue {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub category: Category,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub tip: String,
    pub cost: String,
    pub age_range: String,
    pub crowd_density: CrowdDensity,
    pub solo_ratio: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_hours: Option<String>,
    pub demographic_weights: DemographicWeights,
    pub scores: ScoreTable,
}

impl Venue {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Neutral,
    Reject,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SessionRecord {
    pub id: Uuid,
    pub venue_id: String,
    pub venue_name: String,
    pub outcome: Outcome,
    #[serde(default)]
    pub persona_name: Option<String>,
    #[serde(default)]
    pub opener_used: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A session record before the log assigns its id and timestamp.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NewSessionRecord {
    pub venue_id: String,
    pub venue_name: String,
    pub outcome: Outcome,
    pub persona_name: Option<String>,
    pub opener_used: Option<String>,
    pub notes: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SessionStats {
    pub total: usize,
    pub success: usize,
    pub neutral: usize,
    pub reject: usize,
    /// Percentage in [0, 100].
    pub success_rate: f64,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Persona {
    pub name: String,
    pub age: u8,
    pub emoji: String,
    pub occupation: String,
    pub vibe: String,
    pub interests: Vec<String>,
    pub scenario: String,
    pub demographic: Demographic,
    pub difficulty: Difficulty,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PracticeSession {
    pub id: Uuid,
    pub venue: Venue,
    pub persona: Persona,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub outcome: Option<Outcome>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Claims {
    pub sub: String, // installation_id
    pub exp: usize,
}

#[derive(Serialize, Deserialize)]
pub struct StartPracticeRequest {
    pub venue_id: String,
}

#[derive(Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Serialize, Deserialize)]
pub struct EndPracticeRequest {
    pub outcome: Outcome,
    #[serde(default)]
    pub opener_used: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct BillingEvent {
    pub installation_id: Uuid,
    pub plan: PlanId,
    #[serde(default)]
    pub subscription_id: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct StrikeRequest {
    pub installation_id: Uuid,
    pub reason: String,
}
