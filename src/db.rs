// src/db.rs
use std::collections::HashMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::AppError;

/// Highest snapshot layout this build reads and the one it writes.
pub const SNAPSHOT_VERSION: u32 = 1;

pub const USAGE_KEY: &str = "usage";
pub const SESSIONS_KEY: &str = "sessions";
pub const PRACTICE_KEY: &str = "practice";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub version: u32,
    pub data: serde_json::Value,
}

/// Keyed, versioned blob storage per installation.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn load(&self, installation_id: Uuid, key: &str) -> Result<Option<Snapshot>, AppError>;
    async fn save(&self, installation_id: Uuid, key: &str, snapshot: Snapshot) -> Result<(), AppError>;

    /// Writes every snapshot or none of them.
    async fn save_all(
        &self,
        installation_id: Uuid,
        snapshots: Vec<(&'static str, Snapshot)>,
    ) -> Result<(), AppError>;
}

pub async fn load_typed<T: DeserializeOwned>(
    store: &dyn SnapshotStore,
    installation_id: Uuid,
    key: &str,
) -> Result<Option<T>, AppError> {
    let Some(snapshot) = store.load(installation_id, key).await? else {
        return Ok(None);
    };
    if snapshot.version > SNAPSHOT_VERSION {
        return Err(AppError::Internal(format!(
            "snapshot '{}' has version {}, newest supported is {}",
            key, snapshot.version, SNAPSHOT_VERSION
        )));
    }
    Ok(Some(serde_json::from_value(snapshot.data)?))
}

pub fn snapshot_of<T: Serialize>(value: &T) -> Result<Snapshot, AppError> {
    Ok(Snapshot {
        version: SNAPSHOT_VERSION,
        data: serde_json::to_value(value)?,
    })
}

pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS snapshots (
            installation_id UUID NOT NULL,
            key TEXT NOT NULL,
            version INTEGER NOT NULL,
            payload JSONB NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            PRIMARY KEY (installation_id, key)
        )",
    )
    .execute(pool)
    .await?;
    Ok(())
}

const UPSERT_SNAPSHOT: &str = "INSERT INTO snapshots (installation_id, key, version, payload, updated_at)
     VALUES ($1, $2, $3, $4, NOW())
     ON CONFLICT (installation_id, key)
     DO UPDATE SET version = EXCLUDED.version, payload = EXCLUDED.payload, updated_at = NOW()";

#[derive(Clone)]
pub struct PgSnapshotStore {
    pool: PgPool,
}

impl PgSnapshotStore {
    pub fn new(pool: PgPool) -> Self {
        PgSnapshotStore { pool }
    }
}

#[async_trait]
impl SnapshotStore for PgSnapshotStore {
    async fn load(&self, installation_id: Uuid, key: &str) -> Result<Option<Snapshot>, AppError> {
        let row = sqlx::query(
            "SELECT version, payload FROM snapshots WHERE installation_id = $1 AND key = $2",
        )
        .bind(installation_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            let version: i32 = row.get("version");
            let Json(data): Json<serde_json::Value> = row.get("payload");
            Snapshot {
                version: version.max(0) as u32,
                data,
            }
        }))
    }

    async fn save(&self, installation_id: Uuid, key: &str, snapshot: Snapshot) -> Result<(), AppError> {
        sqlx::query(UPSERT_SNAPSHOT)
            .bind(installation_id)
            .bind(key)
            .bind(snapshot.version as i32)
            .bind(Json(snapshot.data))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn save_all(
        &self,
        installation_id: Uuid,
        snapshots: Vec<(&'static str, Snapshot)>,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        for (key, snapshot) in snapshots {
            sqlx::query(UPSERT_SNAPSHOT)
                .bind(installation_id)
                .bind(key)
                .bind(snapshot.version as i32)
                .bind(Json(snapshot.data))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

/// In-process store used by tests and database-less runs.
#[derive(Default)]
pub struct MemorySnapshotStore {
    entries: RwLock<HashMap<(Uuid, String), Snapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self, installation_id: Uuid, key: &str) -> Result<Option<Snapshot>, AppError> {
        let entries = self.entries.read().await;
        Ok(entries.get(&(installation_id, key.to_string())).cloned())
    }

    async fn save(&self, installation_id: Uuid, key: &str, snapshot: Snapshot) -> Result<(), AppError> {
        let mut entries = self.entries.write().await;
        entries.insert((installation_id, key.to_string()), snapshot);
        Ok(())
    }

    async fn save_all(
        &self,
        installation_id: Uuid,
        snapshots: Vec<(&'static str, Snapshot)>,
    ) -> Result<(), AppError> {
        let mut entries = self.entries.write().await;
        for (key, snapshot) in snapshots {
            entries.insert((installation_id, key.to_string()), snapshot);
        }
        Ok(())
    }
}
