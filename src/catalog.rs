// src/catalog.rs
use std::collections::HashSet;

use thiserror::Error;

use crate::models::{DayOfWeek, Demographic, TimeSlot, Venue};

const BUILTIN_VENUES: &str = include_str!("../data/venues.json");

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Malformed venue catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Venue catalog is empty")]
    Empty,

    #[error("Duplicate venue id: {0}")]
    DuplicateId(String),

    #[error("Venue {venue}: score {score} at {slot:?}/{day:?} is above 100")]
    ScoreOutOfRange {
        venue: String,
        slot: TimeSlot,
        day: DayOfWeek,
        score: u8,
    },

    #[error("Venue {venue}: weight {weight} for {demographic:?} must be finite and positive")]
    InvalidWeight {
        venue: String,
        demographic: Demographic,
        weight: f64,
    },
}

/// Immutable venue catalog, validated once at load time.
#[derive(Clone, Debug)]
pub struct Catalog {
    venues: Vec<Venue>,
}

impl Catalog {
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_VENUES)
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let venues: Vec<Venue> = serde_json::from_str(raw)?;
        Self::new(venues)
    }

    pub fn new(venues: Vec<Venue>) -> Result<Self, CatalogError> {
        if venues.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::new();
        for venue in &venues {
            if !seen.insert(venue.id.as_str()) {
                return Err(CatalogError::DuplicateId(venue.id.clone()));
            }
            for slot in TimeSlot::ALL {
                for day in DayOfWeek::ALL {
                    let score = venue.scores.get(slot, day);
                    if score > 100 {
                        return Err(CatalogError::ScoreOutOfRange {
                            venue: venue.id.clone(),
                            slot,
                            day,
                            score,
                        });
                    }
                }
            }
            for demographic in Demographic::ALL {
                let weight = venue.demographic_weights.weight(demographic);
                if !weight.is_finite() || weight <= 0.0 {
                    return Err(CatalogError::InvalidWeight {
                        venue: venue.id.clone(),
                        demographic,
                        weight,
                    });
                }
            }
        }

        Ok(Catalog { venues })
    }

    pub fn venues(&self) -> &[Venue] {
        &self.venues
    }

    pub fn get(&self, id: &str) -> Option<&Venue> {
        self.venues.iter().find(|v| v.id == id)
    }
}
