// src/paywall.rs
use actix_web::{HttpRequest, HttpResponse, get, post, web};
use serde_json::json;

use crate::auth;
use crate::checkout::CheckoutOutcome;
use crate::context::InstallationContext;
use crate::error::AppError;
use crate::models::{BillingEvent, StrikeRequest};
use crate::plans;
use crate::state::AppState;
use crate::usage::{Denial, UsageSummary};

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_plans);
    cfg.service(get_usage);
    cfg.service(create_checkout);
    cfg.service(billing_event);
    cfg.service(add_strike);
}

/// 402 response the client turns into an upgrade prompt.
pub fn quota_denied(denial: Denial, usage: UsageSummary) -> HttpResponse {
    let message = match denial {
        Denial::Throttled => "Account is temporarily restricted",
        Denial::DailySessions => "Daily practice session limit reached",
        Denial::SessionMessages => "Message limit for this session reached",
        Denial::MonthlyMessages => "Monthly message limit reached",
    };
    HttpResponse::PaymentRequired().json(json!({
        "error": message,
        "limit": denial,
        "usage": usage,
    }))
}

#[get("/plans")]
pub async fn list_plans() -> HttpResponse {
    HttpResponse::Ok().json(plans::catalog())
}

#[get("/usage")]
pub async fn get_usage(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, AppError> {
    let installation_id = auth::installation_from_request(&req, &state.config)?;
    let ctx = InstallationContext::load(state.store.as_ref(), installation_id).await?;
    Ok(HttpResponse::Ok().json(ctx.usage.summary(state.clock.today())))
}

#[post("/checkout")]
pub async fn create_checkout(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let installation_id = auth::installation_from_request(&req, &state.config)?;

    match state.checkout.create_session(installation_id).await {
        Ok(CheckoutOutcome::Redirect(url)) => Ok(HttpResponse::Ok().json(json!({ "url": url }))),
        Ok(CheckoutOutcome::NotConfigured) => {
            Ok(HttpResponse::ServiceUnavailable().json(json!({"error": "Stripe not configured"})))
        }
        Err(e) => {
            tracing::error!("Checkout error: {}", e);
            Ok(HttpResponse::BadGateway()
                .json(json!({"error": "Failed to create checkout session"})))
        }
    }
}

#[post("/admin/billing")]
pub async fn billing_event(
    state: web::Data<AppState>,
    req: HttpRequest,
    event: web::Json<BillingEvent>,
) -> Result<HttpResponse, AppError> {
    auth::require_admin(&req, &state.config)?;
    let event = event.into_inner();

    let _guard = state.locks.acquire(event.installation_id).await;
    let mut ctx = InstallationContext::load(state.store.as_ref(), event.installation_id).await?;
    ctx.usage.set_plan(event.plan);
    ctx.usage.set_subscription_id(event.subscription_id);
    ctx.save(state.store.as_ref()).await?;

    tracing::info!(
        "Installation {} moved to plan {:?}",
        event.installation_id,
        event.plan
    );
    Ok(HttpResponse::Ok().json(ctx.usage.summary(state.clock.today())))
}

#[post("/admin/strikes")]
pub async fn add_strike(
    state: web::Data<AppState>,
    req: HttpRequest,
    strike: web::Json<StrikeRequest>,
) -> Result<HttpResponse, AppError> {
    auth::require_admin(&req, &state.config)?;
    let strike = strike.into_inner();
    let today = state.clock.today();

    let _guard = state.locks.acquire(strike.installation_id).await;
    let mut ctx = InstallationContext::load(state.store.as_ref(), strike.installation_id).await?;
    ctx.usage.add_strike(strike.reason.clone(), today);
    ctx.save(state.store.as_ref()).await?;

    tracing::warn!(
        "Strike {} recorded for installation {}: {}",
        ctx.usage.strikes,
        strike.installation_id,
        strike.reason
    );
    Ok(HttpResponse::Ok().json(ctx.usage.summary(today)))
}
