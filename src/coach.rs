// src/coach.rs
use actix_web::{HttpRequest, HttpResponse, delete, get, post, web};
use serde::Deserialize;
use serde_json::json;

use crate::auth;
use crate::chat::{ChatRequest, FALLBACK_REPLY};
use crate::context::InstallationContext;
use crate::error::AppError;
use crate::models::{EndPracticeRequest, Role, SendMessageRequest, StartPracticeRequest};
use crate::paywall::quota_denied;
use crate::state::AppState;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(start_practice);
    cfg.service(send_message);
    cfg.service(end_practice);
    cfg.service(abandon_practice);
    cfg.service(current_practice);
    cfg.service(practice_history);
    cfg.service(list_sessions);
    cfg.service(clear_sessions);
}

#[post("/practice/start")]
pub async fn start_practice(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<StartPracticeRequest>,
) -> Result<HttpResponse, AppError> {
    let installation_id = auth::installation_from_request(&req, &state.config)?;
    let venue = state
        .catalog
        .get(&body.venue_id)
        .cloned()
        .ok_or_else(|| AppError::NotFound("Venue".to_string()))?;
    let today = state.clock.today();

    let _guard = state.locks.acquire(installation_id).await;
    let mut ctx = InstallationContext::load(state.store.as_ref(), installation_id).await?;

    if let Some(denial) = ctx.usage.session_denial(today) {
        tracing::warn!("Session start denied for {}: {:?}", installation_id, denial);
        return Ok(quota_denied(denial, ctx.usage.summary(today)));
    }
    if !ctx.usage.start_session(today) {
        return Err(AppError::Internal("session start refused after passing checks".into()));
    }

    let persona = state.personas.generate(&venue);
    let openers = state.personas.openers(&venue, &persona);
    let practice = ctx.practice.start(venue, persona, state.clock.now()).clone();
    ctx.save(state.store.as_ref()).await?;

    tracing::info!(
        "Installation {} started practice {} at {}",
        installation_id,
        practice.id,
        practice.venue.id
    );
    Ok(HttpResponse::Ok().json(json!({
        "practice": practice,
        "openers": openers,
        "usage": ctx.usage.summary(today),
    })))
}

#[post("/practice/messages")]
pub async fn send_message(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, AppError> {
    let installation_id = auth::installation_from_request(&req, &state.config)?;
    let content = body.content.trim();
    if content.is_empty() {
        return Err(AppError::BadRequest("Message must not be empty".into()));
    }
    let today = state.clock.today();

    let _guard = state.locks.acquire(installation_id).await;
    let mut ctx = InstallationContext::load(state.store.as_ref(), installation_id).await?;
    if ctx.practice.current().is_none() {
        return Err(AppError::Conflict("No active practice session".into()));
    }

    if let Some(denial) = ctx.usage.send_denial(today) {
        tracing::warn!("Message denied for {}: {:?}", installation_id, denial);
        return Ok(quota_denied(denial, ctx.usage.summary(today)));
    }
    if !ctx.usage.add_message(today) {
        return Err(AppError::Internal("message refused after passing checks".into()));
    }
    ctx.practice.push_message(Role::User, content, state.clock.now());
    // The message counts as consumed whether or not a reply comes back.
    ctx.save(state.store.as_ref()).await?;

    let request = ctx
        .practice
        .current()
        .map(ChatRequest::from_practice)
        .ok_or_else(|| AppError::Internal("practice vanished mid-request".into()))?;

    let (reply, fallback) = match state.chat.reply(&request).await {
        Ok(reply) => (reply, false),
        Err(e) => {
            tracing::warn!("Chat collaborator failed for {}: {}", installation_id, e);
            (FALLBACK_REPLY.to_string(), true)
        }
    };
    ctx.practice
        .push_message(Role::Assistant, reply.clone(), state.clock.now());
    ctx.save(state.store.as_ref()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "reply": reply,
        "fallback": fallback,
        "usage": ctx.usage.summary(today),
    })))
}

#[post("/practice/end")]
pub async fn end_practice(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<EndPracticeRequest>,
) -> Result<HttpResponse, AppError> {
    let installation_id = auth::installation_from_request(&req, &state.config)?;
    let body = body.into_inner();
    let now = state.clock.now();

    let _guard = state.locks.acquire(installation_id).await;
    let mut ctx = InstallationContext::load(state.store.as_ref(), installation_id).await?;

    let finished = ctx
        .practice
        .end(body.outcome, now)
        .ok_or_else(|| AppError::Conflict("No active practice session".into()))?;
    let record = finished
        .to_record(body.opener_used, body.notes)
        .ok_or_else(|| AppError::Internal("finished practice has no outcome".into()))?;
    let record = ctx.sessions.add(record, now);
    ctx.usage.reset_session();
    ctx.save(state.store.as_ref()).await?;

    tracing::info!(
        "Installation {} finished practice {} with {:?}",
        installation_id,
        finished.id,
        record.outcome
    );
    Ok(HttpResponse::Ok().json(json!({
        "session": record,
        "stats": ctx.sessions.stats(),
    })))
}

#[delete("/practice")]
pub async fn abandon_practice(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let installation_id = auth::installation_from_request(&req, &state.config)?;

    let _guard = state.locks.acquire(installation_id).await;
    let mut ctx = InstallationContext::load(state.store.as_ref(), installation_id).await?;
    ctx.practice.clear_current();
    ctx.usage.reset_session();
    ctx.save(state.store.as_ref()).await?;

    Ok(HttpResponse::NoContent().finish())
}

#[get("/practice")]
pub async fn current_practice(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let installation_id = auth::installation_from_request(&req, &state.config)?;
    let ctx = InstallationContext::load(state.store.as_ref(), installation_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "practice": ctx.practice.current() })))
}

#[get("/practice/history")]
pub async fn practice_history(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let installation_id = auth::installation_from_request(&req, &state.config)?;
    let ctx = InstallationContext::load(state.store.as_ref(), installation_id).await?;
    Ok(HttpResponse::Ok().json(ctx.practice.history()))
}

#[derive(Deserialize)]
pub struct SessionsQuery {
    pub limit: Option<usize>,
}

#[get("/sessions")]
pub async fn list_sessions(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<SessionsQuery>,
) -> Result<HttpResponse, AppError> {
    let installation_id = auth::installation_from_request(&req, &state.config)?;
    let ctx = InstallationContext::load(state.store.as_ref(), installation_id).await?;
    let sessions = match query.limit {
        Some(limit) => ctx.sessions.recent(limit),
        None => ctx.sessions.records(),
    };
    Ok(HttpResponse::Ok().json(json!({
        "sessions": sessions,
        "stats": ctx.sessions.stats(),
    })))
}

#[delete("/sessions")]
pub async fn clear_sessions(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let installation_id = auth::installation_from_request(&req, &state.config)?;

    let _guard = state.locks.acquire(installation_id).await;
    let mut ctx = InstallationContext::load(state.store.as_ref(), installation_id).await?;
    ctx.sessions.clear();
    ctx.save(state.store.as_ref()).await?;

    Ok(HttpResponse::Ok().json(json!({ "stats": ctx.sessions.stats() })))
}
