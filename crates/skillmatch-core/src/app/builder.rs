//! EngineBuilder - Engine の構築とワイヤリング
//!
//! # Fail-fast 設計
//! - ストアの open / create は build() で行い、失敗は BuildError で返す
//! - create は既存のストアを黙って上書きしない（`overwrite(true)` が必要）
//! - Clock / IdGenerator を省略した場合は SystemClock / UlidGenerator

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::domain::EngineError;
use crate::engine::RetryPolicy;
use crate::impls::JsonFileStore;
use crate::ports::{Clock, IdGenerator, SnapshotStore, SystemClock, UlidGenerator};
use crate::store::{Catalogue, EntityStore};

use super::engine::Engine;

/// BuildError はストア初期化時のエラー。これだけがプロセスにとって致命的。
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("store {store} already exists; refusing to overwrite it")]
    AlreadyExists { store: String },

    #[error("cannot open store {store}: {source}")]
    Store {
        store: String,
        #[source]
        source: EngineError,
    },
}

enum StoreSource {
    Memory(Catalogue),
    Open(Arc<dyn SnapshotStore>),
    Create {
        backend: Arc<dyn SnapshotStore>,
        seed: Catalogue,
        overwrite: bool,
    },
}

/// # 使用例
/// ```ignore
/// let engine = EngineBuilder::from_config(&config).build().await?;
/// ```
pub struct EngineBuilder {
    source: StoreSource,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    retry: RetryPolicy,
}

impl EngineBuilder {
    /// In-memory store, empty catalogue.
    pub fn new() -> Self {
        Self {
            source: StoreSource::Memory(Catalogue::new()),
            clock: None,
            ids: None,
            retry: RetryPolicy::default(),
        }
    }

    /// Open the JSON file store named by `config`, with its retry policy.
    pub fn from_config(config: &EngineConfig) -> Self {
        let backend = Arc::new(JsonFileStore::new(
            &config.store.path,
            config.store.lock_timeout(),
        ));
        Self::new()
            .open(backend)
            .retry_policy(config.allocation.retry_policy())
    }

    pub fn in_memory(mut self, catalogue: Catalogue) -> Self {
        self.source = StoreSource::Memory(catalogue);
        self
    }

    pub fn open(mut self, backend: Arc<dyn SnapshotStore>) -> Self {
        self.source = StoreSource::Open(backend);
        self
    }

    /// Write `seed` as a fresh store instead of opening one.
    pub fn create(mut self, backend: Arc<dyn SnapshotStore>, seed: Catalogue) -> Self {
        self.source = StoreSource::Create {
            backend,
            seed,
            overwrite: false,
        };
        self
    }

    /// Allow `create` to replace an existing store.
    pub fn overwrite(mut self, allow: bool) -> Self {
        if let StoreSource::Create { overwrite, .. } = &mut self.source {
            *overwrite = allow;
        }
        self
    }

    /// Turn the configured source into a `create` with `seed` as content.
    pub fn seed(mut self, seed: Catalogue) -> Self {
        let source = std::mem::replace(&mut self.source, StoreSource::Memory(Catalogue::new()));
        self.source = match source {
            StoreSource::Open(backend) | StoreSource::Create { backend, .. } => {
                StoreSource::Create {
                    backend,
                    seed,
                    overwrite: false,
                }
            }
            StoreSource::Memory(_) => StoreSource::Memory(seed),
        };
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn build(self) -> Result<Engine, BuildError> {
        let store = match self.source {
            StoreSource::Memory(catalogue) => EntityStore::from_catalogue(catalogue),
            StoreSource::Open(backend) => {
                let describe = backend.describe();
                EntityStore::open(backend)
                    .await
                    .map_err(|source| BuildError::Store {
                        store: describe,
                        source,
                    })?
            }
            StoreSource::Create {
                backend,
                seed,
                overwrite,
            } => {
                let describe = backend.describe();
                EntityStore::create(backend, seed, overwrite)
                    .await
                    .map_err(|source| BuildError::Store {
                        store: describe.clone(),
                        source,
                    })?
                    .ok_or(BuildError::AlreadyExists { store: describe })?
            }
        };

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(clock.clone())));
        Ok(Engine::new(store, clock, ids, self.retry))
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
