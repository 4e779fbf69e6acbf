//! Entity Store: transactional access to the catalogue.
//!
//! # 設計原則
//! - 書き込みはすべて `transaction()` を通す。クロージャは作業コピーに対して実行され、
//!   クロージャと永続化の両方が成功したときだけ差し替える（失敗時は何も残らない）
//! - プロセス内の直列化は tokio の Mutex、プロセス間の直列化は SnapshotStore のロック
//! - ファイルバックエンドでは、ロック取得後に必ずスナップショットを読み直す

mod catalogue;
mod snapshot;

pub use catalogue::Catalogue;
pub use snapshot::Snapshot;

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::EngineError;
use crate::ports::SnapshotStore;

/// Store handle. Cheap to clone; all clones share one catalogue.
#[derive(Clone)]
pub struct EntityStore {
    state: Arc<Mutex<Catalogue>>,
    backend: Option<Arc<dyn SnapshotStore>>,
}

impl EntityStore {
    /// A store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::from_catalogue(Catalogue::new())
    }

    pub fn from_catalogue(catalogue: Catalogue) -> Self {
        Self {
            state: Arc::new(Mutex::new(catalogue)),
            backend: None,
        }
    }

    /// Open an existing persisted store. Fails if nothing has been written yet.
    pub async fn open(backend: Arc<dyn SnapshotStore>) -> Result<Self, EngineError> {
        let catalogue = load_existing(backend.as_ref()).await?;
        tracing::debug!(store = %backend.describe(), "store opened");
        Ok(Self {
            state: Arc::new(Mutex::new(catalogue)),
            backend: Some(backend),
        })
    }

    /// Write `catalogue` as the initial content of a persisted store.
    ///
    /// The existence check and the write happen under one lock. Returns
    /// `None` when a store is already there and `overwrite` is false.
    pub async fn create(
        backend: Arc<dyn SnapshotStore>,
        catalogue: Catalogue,
        overwrite: bool,
    ) -> Result<Option<Self>, EngineError> {
        catalogue.verify_invariants()?;
        {
            let _lock = backend.lock().await?;
            if !overwrite && backend.load().await?.is_some() {
                tracing::warn!(store = %backend.describe(), "store already exists");
                return Ok(None);
            }
            backend.save(&catalogue.to_snapshot()).await?;
        }
        tracing::info!(store = %backend.describe(), overwrite, "store created");
        Ok(Some(Self {
            state: Arc::new(Mutex::new(catalogue)),
            backend: Some(backend),
        }))
    }

    pub fn describe(&self) -> String {
        self.backend
            .as_ref()
            .map_or_else(|| "in-memory".to_string(), |b| b.describe())
    }

    /// Run a read-only view against the latest committed state.
    pub async fn read<R, F>(&self, f: F) -> Result<R, EngineError>
    where
        F: FnOnce(&Catalogue) -> R + Send,
        R: Send,
    {
        let mut guard = self.state.lock().await;
        if let Some(backend) = &self.backend {
            *guard = load_existing(backend.as_ref()).await?;
        }
        Ok(f(&*guard))
    }

    /// Run `f` as one serializable transaction.
    ///
    /// `f` sees the latest committed state. Its changes become visible only
    /// if it returns `Ok` and the snapshot (if any) is saved.
    pub async fn transaction<R, F>(&self, f: F) -> Result<R, EngineError>
    where
        F: FnOnce(&mut Catalogue) -> Result<R, EngineError> + Send,
        R: Send,
    {
        let mut guard = self.state.lock().await;

        let _lock = match &self.backend {
            Some(backend) => {
                let lock = backend.lock().await?;
                *guard = load_existing(backend.as_ref()).await?;
                Some(lock)
            }
            None => None,
        };

        let mut working = guard.clone();
        let out = f(&mut working)?;

        if let Some(backend) = &self.backend {
            backend.save(&working.to_snapshot()).await?;
        }
        *guard = working;
        Ok(out)
    }
}

async fn load_existing(backend: &dyn SnapshotStore) -> Result<Catalogue, EngineError> {
    match backend.load().await? {
        Some(snapshot) => Catalogue::from_snapshot(snapshot),
        None => Err(EngineError::Persistence(format!(
            "no store at {}; run `init` first",
            backend.describe()
        ))),
    }
}
