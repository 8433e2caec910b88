// src/config.rs
use serde::Deserialize;

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_chat_api_url() -> String {
    "https://api.anthropic.com/v1/messages".to_string()
}

fn default_chat_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_chat_max_tokens() -> u32 {
    256
}

fn default_app_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_ranking_cache_capacity() -> u64 {
    1000
}

fn default_token_ttl_days() -> i64 {
    365
}

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub admin_token: Option<String>,
    #[serde(default = "default_chat_api_url")]
    pub chat_api_url: String,
    #[serde(default)]
    pub chat_api_key: Option<String>,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_chat_max_tokens")]
    pub chat_max_tokens: u32,
    #[serde(default)]
    pub stripe_secret_key: Option<String>,
    #[serde(default)]
    pub stripe_pro_price_id: Option<String>,
    #[serde(default = "default_app_url")]
    pub app_url: String,
    #[serde(default = "default_ranking_cache_capacity")]
    pub ranking_cache_capacity: u64,
    #[serde(default = "default_token_ttl_days")]
    pub token_ttl_days: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    pub fn from_iter<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter(vars)
    }

    pub fn chat_configured(&self) -> bool {
        self.chat_api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    pub fn checkout_configured(&self) -> bool {
        let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        set(&self.stripe_secret_key) && set(&self.stripe_pro_price_id)
    }
}
