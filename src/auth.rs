// src/auth.rs
use actix_web::{HttpRequest, HttpResponse, post, web};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde_json::json;
use uuid::Uuid;

use crate::config::Config;
use crate::context::InstallationContext;
use crate::error::AppError;
use crate::models::Claims;
use crate::state::AppState;

pub const ADMIN_HEADER: &str = "X-Admin-Token";

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_installation);
}

pub fn issue_token(config: &Config, installation_id: Uuid, now: DateTime<Utc>) -> Result<String, AppError> {
    let expiration = now + Duration::days(config.token_ttl_days);
    let claims = Claims {
        sub: installation_id.to_string(),
        exp: expiration.timestamp().max(0) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_ref()),
    )
    .map_err(|e| AppError::Internal(format!("token generation failed: {e}")))
}

pub fn verify_token(config: &Config, token: &str) -> Result<Uuid, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::warn!("Rejected installation token: {}", e);
        AppError::Unauthorized
    })?;
    Uuid::parse_str(&data.claims.sub).map_err(|_| AppError::Unauthorized)
}

/// Installation id from the `Authorization: Bearer` header.
pub fn installation_from_request(req: &HttpRequest, config: &Config) -> Result<Uuid, AppError> {
    let header = req
        .headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized)?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthorized)?;
    verify_token(config, token.trim())
}

/// Admin endpoints are disabled entirely when no admin token is configured.
pub fn require_admin(req: &HttpRequest, config: &Config) -> Result<(), AppError> {
    let expected = config
        .admin_token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Forbidden)?;
    let provided = req
        .headers()
        .get(ADMIN_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Forbidden)?;
    if provided == expected {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

#[post("/installations")]
pub async fn create_installation(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let installation_id = Uuid::new_v4();
    let now = state.clock.now();
    InstallationContext::create(state.store.as_ref(), installation_id, state.clock.today()).await?;
    let token = issue_token(&state.config, installation_id, now)?;

    tracing::info!("Created installation {}", installation_id);
    Ok(HttpResponse::Created().json(json!({
        "installation_id": installation_id,
        "token": token,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support;
    use actix_web::test::{self, TestRequest};
    use actix_web::{App, http::StatusCode};

    #[test]
    fn token_round_trip() {
        let config = test_support::config();
        let id = Uuid::new_v4();
        let token = issue_token(&config, id, Utc::now()).unwrap();
        assert_eq!(verify_token(&config, &token).unwrap(), id);
    }

    #[test]
    fn expired_or_foreign_tokens_are_rejected() {
        let config = test_support::config();
        let id = Uuid::new_v4();
        let stale = issue_token(&config, id, Utc::now() - Duration::days(400)).unwrap();
        assert!(matches!(verify_token(&config, &stale), Err(AppError::Unauthorized)));

        let mut other = config.clone();
        other.jwt_secret = "another-secret".into();
        let foreign = issue_token(&other, id, Utc::now()).unwrap();
        assert!(matches!(verify_token(&config, &foreign), Err(AppError::Unauthorized)));
    }

    #[test]
    fn bearer_header_is_required() {
        let config = test_support::config();
        let req = TestRequest::default().to_http_request();
        assert!(installation_from_request(&req, &config).is_err());

        let token = issue_token(&config, Uuid::nil(), Utc::now()).unwrap();
        let req = TestRequest::default()
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_http_request();
        assert_eq!(installation_from_request(&req, &config).unwrap(), Uuid::nil());
    }

    #[test]
    fn admin_guard() {
        let mut config = test_support::config();
        let req = TestRequest::default()
            .insert_header((ADMIN_HEADER, "letmein"))
            .to_http_request();
        config.admin_token = None;
        assert!(require_admin(&req, &config).is_err());
        config.admin_token = Some("letmein".into());
        assert!(require_admin(&req, &config).is_ok());
        config.admin_token = Some("other".into());
        assert!(require_admin(&req, &config).is_err());
    }

    #[actix_web::test]
    async fn creating_installation_persists_usage() {
        let (state, _clock) = test_support::state();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(init_routes),
        )
        .await;

        let req = TestRequest::post().uri("/installations").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: serde_json::Value = test::read_body_json(resp).await;
        let id: Uuid = serde_json::from_value(body["installation_id"].clone()).unwrap();
        let token = body["token"].as_str().unwrap();
        assert_eq!(verify_token(&state.config, token).unwrap(), id);

        let ctx = InstallationContext::load(state.store.as_ref(), id).await.unwrap();
        assert_eq!(ctx.usage.sessions_today, 0);
    }
}
