// src/main.rs
use std::sync::Arc;

use actix_web::{App, HttpServer, middleware::Logger, web};
use moka::future::Cache;
use sqlx::PgPool;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod auth;
mod catalog;
mod chat;
mod checkout;
mod coach;
mod config;
mod context;
mod db;
mod error;
mod models;
mod paywall;
mod persona;
mod plans;
mod practice;
mod ranking;
mod scoring;
mod sessions;
mod state;
mod usage;
mod venues;

use crate::catalog::Catalog;
use crate::chat::HttpChatClient;
use crate::checkout::CheckoutClient;
use crate::context::{InstallationLocks, SystemClock};
use crate::db::PgSnapshotStore;
use crate::persona::RandomPersonaGenerator;
use crate::state::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    tracing::info!("Starting approach coach service");

    dotenv::dotenv().ok();
    let config = config::Config::from_env().expect("Failed to load config from environment");

    let pool = PgPool::connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");
    db::ensure_schema(&pool)
        .await
        .expect("Failed to create snapshot schema");

    let catalog = Catalog::builtin().expect("Failed to load venue catalog");
    tracing::info!("Loaded {} venues", catalog.venues().len());
    if !config.chat_configured() {
        tracing::warn!("Chat API key not set, practice replies will use the fallback");
    }
    if !config.checkout_configured() {
        tracing::warn!("Stripe not configured, checkout is disabled");
    }

    let state = AppState {
        store: Arc::new(PgSnapshotStore::new(pool)),
        clock: Arc::new(SystemClock),
        catalog: Arc::new(catalog),
        personas: Arc::new(RandomPersonaGenerator::new()),
        chat: Arc::new(HttpChatClient::from_config(&config)),
        checkout: Arc::new(CheckoutClient::from_config(&config)),
        rankings: Cache::new(config.ranking_cache_capacity),
        locks: InstallationLocks::new(),
        config: config.clone(),
    };

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(Logger::default())
            .configure(auth::init_routes)
            .configure(paywall::init_routes)
            .configure(venues::init_routes)
            .configure(coach::init_routes)
    })
    .bind((config.bind_address.as_str(), config.port))?
    .run()
    .await
}
