// src/state.rs
use std::sync::Arc;

use moka::future::Cache;

use crate::catalog::Catalog;
use crate::chat::ChatClient;
use crate::checkout::CheckoutClient;
use crate::config::Config;
use crate::context::{Clock, InstallationLocks};
use crate::db::SnapshotStore;
use crate::persona::PersonaGenerator;

/// Shared handles injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn SnapshotStore>,
    pub clock: Arc<dyn Clock>,
    pub catalog: Arc<Catalog>,
    pub personas: Arc<dyn PersonaGenerator>,
    pub chat: Arc<dyn ChatClient>,
    pub checkout: Arc<CheckoutClient>,
    pub rankings: Cache<String, serde_json::Value>,
    pub locks: InstallationLocks,
}
