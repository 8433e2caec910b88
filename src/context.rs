// src/context.rs
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, Weak};

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::db::{self, PRACTICE_KEY, SESSIONS_KEY, SnapshotStore, USAGE_KEY};
use crate::error::AppError;
use crate::practice::PracticeTracker;
use crate::sessions::SessionLog;
use crate::usage::UsageState;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests.
pub struct FixedClock {
    now: StdMutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        FixedClock {
            now: StdMutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|p| p.into_inner()) = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Everything persisted for one installation. Loaded at the start of a
/// request and saved after each mutation.
#[derive(Clone, Debug, PartialEq)]
pub struct InstallationContext {
    pub installation_id: Uuid,
    pub usage: UsageState,
    pub sessions: SessionLog,
    pub practice: PracticeTracker,
}

impl InstallationContext {
    pub async fn create(
        store: &dyn SnapshotStore,
        installation_id: Uuid,
        today: NaiveDate,
    ) -> Result<Self, AppError> {
        let ctx = InstallationContext {
            installation_id,
            usage: UsageState::new(crate::plans::PlanId::Free, today),
            sessions: SessionLog::default(),
            practice: PracticeTracker::default(),
        };
        ctx.save(store).await?;
        Ok(ctx)
    }

    /// Loads the three blobs. An installation without usage state does not
    /// exist; missing session or practice blobs load empty.
    pub async fn load(store: &dyn SnapshotStore, installation_id: Uuid) -> Result<Self, AppError> {
        let usage = db::load_typed::<UsageState>(store, installation_id, USAGE_KEY)
            .await?
            .ok_or_else(|| AppError::NotFound("Installation".to_string()))?;
        let sessions = db::load_typed(store, installation_id, SESSIONS_KEY)
            .await?
            .unwrap_or_default();
        let practice = db::load_typed(store, installation_id, PRACTICE_KEY)
            .await?
            .unwrap_or_default();
        Ok(InstallationContext {
            installation_id,
            usage,
            sessions,
            practice,
        })
    }

    pub async fn save(&self, store: &dyn SnapshotStore) -> Result<(), AppError> {
        let snapshots = vec![
            (USAGE_KEY, db::snapshot_of(&self.usage)?),
            (SESSIONS_KEY, db::snapshot_of(&self.sessions)?),
            (PRACTICE_KEY, db::snapshot_of(&self.practice)?),
        ];
        store.save_all(self.installation_id, snapshots).await
    }
}

/// One async mutex per installation so load, mutate and save never
/// interleave for the same installation. An entry goes away only after
/// every guard and waiter for it has been dropped.
#[derive(Clone, Default)]
pub struct InstallationLocks {
    locks: Arc<StdMutex<HashMap<Uuid, Weak<Mutex<()>>>>>,
}

impl InstallationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, installation_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(lock) = locks.get(&installation_id).and_then(Weak::upgrade) {
            return lock;
        }
        locks.retain(|_, lock| lock.strong_count() > 0);
        let lock = Arc::new(Mutex::new(()));
        locks.insert(installation_id, Arc::downgrade(&lock));
        lock
    }

    pub async fn acquire(&self, installation_id: Uuid) -> OwnedMutexGuard<()> {
        self.lock_for(installation_id).lock_owned().await
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemorySnapshotStore;
    use crate::models::{NewSessionRecord, Outcome};
    use chrono::TimeZone;

    #[test]
    fn fixed_clock_advances() {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2026, 10, 16, 23, 30, 0).unwrap());
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());
        clock.advance(chrono::Duration::hours(1));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2026, 10, 17).unwrap());
    }

    #[tokio::test]
    async fn unknown_installation_is_not_found() {
        let store = MemorySnapshotStore::new();
        let result = InstallationContext::load(&store, Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn context_survives_reload() {
        let store = MemorySnapshotStore::new();
        let id = Uuid::new_v4();
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let mut ctx = InstallationContext::create(&store, id, today).await.unwrap();
        assert!(ctx.usage.start_session(today));
        ctx.sessions.add(
            NewSessionRecord {
                venue_id: "diddy-riese".into(),
                venue_name: "Diddy Riese".into(),
                outcome: Outcome::Neutral,
                persona_name: None,
                opener_used: None,
                notes: None,
            },
            Utc::now(),
        );
        ctx.save(&store).await.unwrap();

        let reloaded = InstallationContext::load(&store, id).await.unwrap();
        assert_eq!(reloaded, ctx);
        assert_eq!(reloaded.sessions.stats().total, 1);
    }

    #[tokio::test]
    async fn locks_serialize_same_installation() {
        let locks = InstallationLocks::new();
        let id = Uuid::new_v4();
        let guard = locks.acquire(id).await;
        let other = locks.clone();
        let waiter = tokio::spawn(async move {
            let _g = other.acquire(id).await;
        });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        drop(guard);
        waiter.await.unwrap();

        // A different installation never waits on this one.
        let _a = locks.acquire(id).await;
        let _b = locks.acquire(Uuid::new_v4()).await;
    }

    #[tokio::test]
    async fn held_lock_survives_churn_of_other_installations() {
        let locks = InstallationLocks::new();
        let id = Uuid::new_v4();
        let _held = locks.acquire(id).await;

        for _ in 0..1000 {
            let _other = locks.acquire(Uuid::new_v4()).await;
        }
        // Released locks are pruned, the held one stays.
        assert!(locks.tracked() <= 2);

        let second = tokio::time::timeout(std::time::Duration::from_millis(50), locks.acquire(id)).await;
        assert!(second.is_err(), "a held installation lock was handed out twice");
    }

    /// Writes single keys through but fails whole-context saves on demand.
    #[derive(Default)]
    struct FailingBatchStore {
        inner: MemorySnapshotStore,
        fail: std::sync::atomic::AtomicBool,
    }

    #[async_trait::async_trait]
    impl SnapshotStore for FailingBatchStore {
        async fn load(&self, id: Uuid, key: &str) -> Result<Option<db::Snapshot>, AppError> {
            self.inner.load(id, key).await
        }

        async fn save(&self, id: Uuid, key: &str, snapshot: db::Snapshot) -> Result<(), AppError> {
            self.inner.save(id, key, snapshot).await
        }

        async fn save_all(
            &self,
            id: Uuid,
            snapshots: Vec<(&'static str, db::Snapshot)>,
        ) -> Result<(), AppError> {
            if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(AppError::Internal("disk full".into()));
            }
            self.inner.save_all(id, snapshots).await
        }
    }

    #[tokio::test]
    async fn failed_save_leaves_no_partial_state() {
        let store = FailingBatchStore::default();
        let id = Uuid::new_v4();
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let mut ctx = InstallationContext::create(&store, id, today).await.unwrap();

        store.fail.store(true, std::sync::atomic::Ordering::SeqCst);
        assert!(ctx.usage.start_session(today));
        assert!(ctx.save(&store).await.is_err());

        let reloaded = InstallationContext::load(&store, id).await.unwrap();
        assert_eq!(reloaded.usage.sessions_today, 0);
    }
}
