// src/checkout.rs
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;

const STRIPE_CHECKOUT_URL: &str = "https://api.stripe.com/v1/checkout/sessions";

#[derive(Error, Debug)]
pub enum CheckoutError {
    #[error("Checkout request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Checkout provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Checkout session has no redirect url")]
    MissingUrl,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    Redirect(String),
    NotConfigured,
}

#[derive(Deserialize)]
struct CheckoutSession {
    url: Option<String>,
}

/// Creates hosted checkout sessions for the pro plan. Plan changes arrive
/// later through the billing event endpoint, not through this client.
pub struct CheckoutClient {
    http: reqwest::Client,
    secret_key: Option<String>,
    price_id: Option<String>,
    app_url: String,
}

impl CheckoutClient {
    pub fn from_config(config: &Config) -> Self {
        CheckoutClient {
            http: reqwest::Client::new(),
            secret_key: config.stripe_secret_key.clone().filter(|s| !s.is_empty()),
            price_id: config.stripe_pro_price_id.clone().filter(|s| !s.is_empty()),
            app_url: config.app_url.trim_end_matches('/').to_string(),
        }
    }

    fn form(&self, price_id: &str, installation_id: Uuid) -> Vec<(&'static str, String)> {
        vec![
            ("mode", "subscription".to_string()),
            ("payment_method_types[0]", "card".to_string()),
            ("line_items[0][price]", price_id.to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            ("success_url", format!("{}/?success=true", self.app_url)),
            ("cancel_url", format!("{}/?canceled=true", self.app_url)),
            ("metadata[installation_id]", installation_id.to_string()),
        ]
    }

    pub async fn create_session(&self, installation_id: Uuid) -> Result<CheckoutOutcome, CheckoutError> {
        let (Some(secret_key), Some(price_id)) = (&self.secret_key, &self.price_id) else {
            return Ok(CheckoutOutcome::NotConfigured);
        };

        tracing::info!("Creating checkout session for installation {}", installation_id);
        let response = self
            .http
            .post(STRIPE_CHECKOUT_URL)
            .basic_auth(secret_key, None::<&str>)
            .form(&self.form(price_id, installation_id))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CheckoutError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let session: CheckoutSession = response.json().await?;
        session
            .url
            .map(CheckoutOutcome::Redirect)
            .ok_or(CheckoutError::MissingUrl)
    }
}
