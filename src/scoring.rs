// src/scoring.rs
//! Popularity-for-approach scoring. Everything here is a pure function of
//! its arguments.
use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;

use crate::models::{Coordinates, DayOfWeek, Demographic, TimeSlot, Venue};

const EARTH_RADIUS_MILES: f64 = 3959.0;

/// Raw table lookup. The catalog guarantees every cell exists.
pub fn base_score(venue: &Venue, slot: TimeSlot, day: DayOfWeek) -> u8 {
    venue.scores.get(slot, day)
}

/// Arithmetic mean of the venue weights for the selected groups, or 1.0
/// for an empty selection.
pub fn demographic_multiplier(venue: &Venue, selected: &BTreeSet<Demographic>) -> f64 {
    if selected.is_empty() {
        return 1.0;
    }
    let sum: f64 = selected
        .iter()
        .map(|demo| venue.demographic_weights.weight(*demo))
        .sum();
    sum / selected.len() as f64
}

/// Final 0-100 score: base score times the demographic multiplier, rounded
/// half-up and clamped.
pub fn score(
    venue: &Venue,
    slot: TimeSlot,
    day: DayOfWeek,
    selected: &BTreeSet<Demographic>,
) -> u8 {
    let raw = f64::from(base_score(venue, slot, day)) * demographic_multiplier(venue, selected);
    // Scores are non-negative, so round() (half away from zero) is half-up here.
    raw.round().clamp(0.0, 100.0) as u8
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBand {
    Hot,
    Warm,
    Mild,
    Cold,
}

impl ScoreBand {
    pub fn of(score: u8) -> ScoreBand {
        match score {
            70.. => ScoreBand::Hot,
            50..=69 => ScoreBand::Warm,
            30..=49 => ScoreBand::Mild,
            _ => ScoreBand::Cold,
        }
    }
}

pub fn time_slot_for_hour(hour: u32) -> TimeSlot {
    match hour {
        5..=11 => TimeSlot::Morning,
        12..=16 => TimeSlot::Afternoon,
        17..=21 => TimeSlot::Evening,
        _ => TimeSlot::LateNight,
    }
}

pub fn day_of_week(date: NaiveDate) -> DayOfWeek {
    match date.weekday() {
        Weekday::Mon => DayOfWeek::Mon,
        Weekday::Tue => DayOfWeek::Tue,
        Weekday::Wed => DayOfWeek::Wed,
        Weekday::Thu => DayOfWeek::Thu,
        Weekday::Fri => DayOfWeek::Fri,
        Weekday::Sat => DayOfWeek::Sat,
        Weekday::Sun => DayOfWeek::Sun,
    }
}

/// Great-circle distance in miles (haversine).
pub fn distance_miles(a: Coordinates, b: Coordinates) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_MILES * c
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn set(demos: &[Demographic]) -> BTreeSet<Demographic> {
        demos.iter().copied().collect()
    }

    #[test]
    fn empty_selection_scores_equal_table_value() {
        let catalog = Catalog::builtin().unwrap();
        let none = BTreeSet::new();
        for venue in catalog.venues() {
            for slot in TimeSlot::ALL {
                for day in DayOfWeek::ALL {
                    let s = score(venue, slot, day, &none);
                    assert!(s <= 100);
                    assert_eq!(s, base_score(venue, slot, day), "{} {:?} {:?}", venue.id, slot, day);
                }
            }
        }
    }

    #[test]
    fn multiplier_ignores_order_and_duplicates() {
        let catalog = Catalog::builtin().unwrap();
        let venue = &catalog.venues()[0];
        let a = set(&[Demographic::Asian, Demographic::Latina, Demographic::Mena]);
        let b = set(&[
            Demographic::Mena,
            Demographic::Asian,
            Demographic::Latina,
            Demographic::Asian,
        ]);
        assert_eq!(demographic_multiplier(venue, &a), demographic_multiplier(venue, &b));
    }

    #[test]
    fn multiplier_is_mean_of_weights() {
        let catalog = Catalog::builtin().unwrap();
        let mut venue = catalog.venues()[0].clone();
        venue.demographic_weights.asian = 1.2;
        venue.demographic_weights.white = 0.8;
        venue.demographic_weights.black = 1.2;
        let m = demographic_multiplier(&venue, &set(&[Demographic::Asian, Demographic::White]));
        assert!((m - 1.0).abs() < 1e-9);
        let same = demographic_multiplier(&venue, &set(&[Demographic::Asian, Demographic::Black]));
        assert!((same - 1.2).abs() < 1e-9);
        assert_eq!(demographic_multiplier(&venue, &BTreeSet::new()), 1.0);
    }

    #[test]
    fn score_rounds_half_up_and_clamps() {
        let catalog = Catalog::builtin().unwrap();
        let mut venue = catalog.venues()[0].clone();
        venue.scores.morning.mon = 45;
        venue.demographic_weights.asian = 1.1;
        // 45 * 1.1 = 49.5 -> 50
        let s = score(&venue, TimeSlot::Morning, DayOfWeek::Mon, &set(&[Demographic::Asian]));
        assert_eq!(s, 50);

        venue.scores.morning.mon = 95;
        venue.demographic_weights.asian = 1.5;
        let s = score(&venue, TimeSlot::Morning, DayOfWeek::Mon, &set(&[Demographic::Asian]));
        assert_eq!(s, 100);
    }

    #[test]
    fn score_is_deterministic() {
        let catalog = Catalog::builtin().unwrap();
        let venue = &catalog.venues()[1];
        let demos = set(&[Demographic::Black, Demographic::White]);
        let first = score(venue, TimeSlot::Evening, DayOfWeek::Fri, &demos);
        for _ in 0..10 {
            assert_eq!(score(venue, TimeSlot::Evening, DayOfWeek::Fri, &demos), first);
        }
    }

    #[test]
    fn bands_follow_thresholds() {
        assert_eq!(ScoreBand::of(100), ScoreBand::Hot);
        assert_eq!(ScoreBand::of(70), ScoreBand::Hot);
        assert_eq!(ScoreBand::of(69), ScoreBand::Warm);
        assert_eq!(ScoreBand::of(50), ScoreBand::Warm);
        assert_eq!(ScoreBand::of(30), ScoreBand::Mild);
        assert_eq!(ScoreBand::of(29), ScoreBand::Cold);
        assert_eq!(ScoreBand::of(0), ScoreBand::Cold);
    }

    #[test]
    fn hours_map_to_slots() {
        assert_eq!(time_slot_for_hour(4), TimeSlot::LateNight);
        assert_eq!(time_slot_for_hour(5), TimeSlot::Morning);
        assert_eq!(time_slot_for_hour(11), TimeSlot::Morning);
        assert_eq!(time_slot_for_hour(12), TimeSlot::Afternoon);
        assert_eq!(time_slot_for_hour(17), TimeSlot::Evening);
        assert_eq!(time_slot_for_hour(21), TimeSlot::Evening);
        assert_eq!(time_slot_for_hour(22), TimeSlot::LateNight);
        assert_eq!(time_slot_for_hour(0), TimeSlot::LateNight);
    }

    #[test]
    fn weekday_mapping() {
        let friday = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        assert_eq!(day_of_week(friday), DayOfWeek::Fri);
        let sunday = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert_eq!(day_of_week(sunday), DayOfWeek::Sun);
    }

    #[test]
    fn distance_helper() {
        let ucla = Coordinates { lat: 34.0689, lng: -118.4452 };
        assert!(distance_miles(ucla, ucla).abs() < 1e-9);
        let santa_monica = Coordinates { lat: 34.0195, lng: -118.4912 };
        let d = distance_miles(ucla, santa_monica);
        assert!(d > 4.0 && d < 5.0, "got {d}");
        assert!((distance_miles(santa_monica, ucla) - d).abs() < 1e-9);
    }
}
