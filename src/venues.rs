// src/venues.rs
use std::collections::BTreeSet;
use std::str::FromStr;

use actix_web::{HttpResponse, get, web};
use serde::Deserialize;
use serde_json::json;

use crate::error::AppError;
use crate::models::{Category, Coordinates, DayOfWeek, Demographic, TimeSlot};
use crate::ranking::{self, DEFAULT_TOP_N, Filters};
use crate::state::AppState;

const MAX_LIMIT: usize = 100;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_venues);
    cfg.service(venue_meta);
    cfg.service(rankings);
}

#[derive(Deserialize, Debug, Default)]
pub struct RankingQuery {
    pub time_slot: Option<TimeSlot>,
    pub day: Option<DayOfWeek>,
    /// Comma-separated demographic tags.
    pub demographics: Option<String>,
    /// Comma-separated categories.
    pub categories: Option<String>,
    pub min_score: Option<u8>,
    pub radius: Option<f64>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub limit: Option<usize>,
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

fn parse_set<T: FromStr + Ord>(raw: Option<&str>) -> Result<BTreeSet<T>, AppError>
where
    T::Err: std::fmt::Display,
{
    raw.unwrap_or_default()
        .split(',')
        .filter(|token| !token.trim().is_empty())
        .map(|token| T::from_str(token).map_err(|e| AppError::BadRequest(e.to_string())))
        .collect()
}

impl RankingQuery {
    pub fn into_filters(self, defaults: Filters) -> Result<(Filters, usize), AppError> {
        let mut filters = defaults;
        if let Some(slot) = self.time_slot {
            filters.set_time_slot(slot);
        }
        if let Some(day) = self.day {
            filters.set_day(day);
        }
        filters.demographics = parse_set::<Demographic>(self.demographics.as_deref())?;
        filters.categories = parse_set::<Category>(self.categories.as_deref())?;
        if let Some(min_score) = self.min_score {
            if min_score > 100 {
                return Err(AppError::BadRequest("min_score must be between 0 and 100".into()));
            }
            filters.set_min_score(min_score);
        }
        if let Some(radius) = self.radius {
            if !radius.is_finite() || radius <= 0.0 {
                return Err(AppError::BadRequest("radius must be positive".into()));
            }
            filters.set_radius(radius);
        }
        filters.origin = match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
            (None, None) => None,
            _ => return Err(AppError::BadRequest("lat and lng must be given together".into())),
        };

        let limit = self.limit.unwrap_or(DEFAULT_TOP_N);
        if limit == 0 || limit > MAX_LIMIT {
            return Err(AppError::BadRequest(format!("limit must be between 1 and {MAX_LIMIT}")));
        }
        Ok((filters, limit))
    }
}

#[get("/venues")]
pub async fn list_venues(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.catalog.venues())
}

#[derive(Deserialize)]
pub struct MetaQuery {
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

#[get("/venues/meta")]
pub async fn venue_meta(state: web::Data<AppState>, query: web::Query<MetaQuery>) -> HttpResponse {
    let time_slots: Vec<_> = TimeSlot::ALL
        .iter()
        .map(|slot| json!({ "id": slot, "label": slot.label() }))
        .collect();
    HttpResponse::Ok().json(json!({
        "time_slots": time_slots,
        "days": DayOfWeek::ALL,
        "demographics": Demographic::ALL,
        "categories": Category::ALL,
        "defaults": Filters::defaults_at(state.clock.now(), query.utc_offset_minutes),
    }))
}

#[get("/venues/rankings")]
pub async fn rankings(
    state: web::Data<AppState>,
    query: web::Query<RankingQuery>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    let defaults = Filters::defaults_at(state.clock.now(), query.utc_offset_minutes);
    let (filters, limit) = query.into_filters(defaults)?;

    let cache_key = serde_json::to_string(&(&filters, limit))?;
    if let Some(cached) = state.rankings.get(&cache_key).await {
        tracing::info!("Cache hit for key: {}", cache_key);
        return Ok(HttpResponse::Ok().json(cached));
    }

    let ranked = ranking::rank(state.catalog.venues(), &filters, Some(limit));
    let response = json!({
        "filters": filters,
        "results": ranked,
    });

    state.rankings.insert(cache_key, response.clone()).await;
    Ok(HttpResponse::Ok().json(response))
}
