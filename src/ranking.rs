// src/ranking.rs
use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Category, Coordinates, DayOfWeek, Demographic, TimeSlot, Venue};
use crate::scoring::{self, ScoreBand};

pub const DEFAULT_TOP_N: usize = 10;
pub const DEFAULT_RADIUS_MILES: f64 = 5.0;

/// User-selected ranking filters. Sets keep the selection order-insensitive
/// and free of duplicates.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Filters {
    pub radius: f64,
    pub time_slot: TimeSlot,
    pub day: DayOfWeek,
    pub demographics: BTreeSet<Demographic>,
    pub categories: BTreeSet<Category>,
    pub min_score: u8,
    /// Radius is only applied when an origin is known.
    #[serde(default)]
    pub origin: Option<Coordinates>,
}

impl Filters {
    /// Defaults for the local time at `now` shifted by `utc_offset_minutes`.
    pub fn defaults_at(now: DateTime<Utc>, utc_offset_minutes: i32) -> Self {
        let local = now + Duration::minutes(i64::from(utc_offset_minutes));
        Filters {
            radius: DEFAULT_RADIUS_MILES,
            time_slot: scoring::time_slot_for_hour(local.hour()),
            day: scoring::day_of_week(local.date_naive()),
            demographics: BTreeSet::new(),
            categories: BTreeSet::new(),
            min_score: 0,
            origin: None,
        }
    }

    pub fn set_time_slot(&mut self, slot: TimeSlot) {
        self.time_slot = slot;
    }

    pub fn set_day(&mut self, day: DayOfWeek) {
        self.day = day;
    }

    pub fn toggle_demographic(&mut self, demographic: Demographic) {
        if !self.demographics.remove(&demographic) {
            self.demographics.insert(demographic);
        }
    }

    pub fn toggle_category(&mut self, category: Category) {
        if !self.categories.remove(&category) {
            self.categories.insert(category);
        }
    }

    pub fn set_radius(&mut self, radius: f64) {
        self.radius = radius;
    }

    pub fn set_min_score(&mut self, min_score: u8) {
        self.min_score = min_score;
    }

    pub fn reset(&mut self, now: DateTime<Utc>, utc_offset_minutes: i32) {
        *self = Filters::defaults_at(now, utc_offset_minutes);
    }

    fn admits_category(&self, category: Category) -> bool {
        self.categories.is_empty() || self.categories.contains(&category)
    }

    fn within_radius(&self, venue: &Venue) -> bool {
        match self.origin {
            Some(origin) => scoring::distance_miles(origin, venue.coordinates()) <= self.radius,
            None => true,
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct RankedVenue<'a> {
    pub venue: &'a Venue,
    pub score: u8,
    pub band: ScoreBand,
}

/// Filters, scores and orders venues by descending score. Ties keep catalog
/// order. `top_n` caps the result for display.
pub fn rank<'a>(venues: &'a [Venue], filters: &Filters, top_n: Option<usize>) -> Vec<RankedVenue<'a>> {
    let mut ranked: Vec<(usize, RankedVenue<'a>)> = venues
        .iter()
        .enumerate()
        .filter(|(_, venue)| filters.admits_category(venue.category))
        .filter(|(_, venue)| filters.within_radius(venue))
        .map(|(index, venue)| {
            let score = scoring::score(venue, filters.time_slot, filters.day, &filters.demographics);
            (
                index,
                RankedVenue {
                    venue,
                    score,
                    band: ScoreBand::of(score),
                },
            )
        })
        .filter(|(_, entry)| entry.score >= filters.min_score)
        .collect();

    ranked.sort_by(|(ia, a), (ib, b)| b.score.cmp(&a.score).then(ia.cmp(ib)));

    let mut ranked: Vec<RankedVenue<'a>> = ranked.into_iter().map(|(_, entry)| entry).collect();
    if let Some(n) = top_n {
        ranked.truncate(n);
    }
    ranked
}
