//! SnapshotStore port - カタログの永続化
//!
//! EntityStore はメモリ上の Catalogue を正本として扱い、永続化が必要な場合だけ
//! この port を通してスナップショットを読み書きします。
//!
//! # 設計原則
//! - 書き込みは `lock()` で得たガードを保持している間だけ行う
//! - ロック取得後に `load()` し直すことで、別プロセスの書き込みを取り込む
//! - `save()` は全体を原子的に置き換える（途中状態を残さない）

use async_trait::async_trait;

use crate::domain::EngineError;
use crate::store::Snapshot;

/// Exclusive writer guard. Released on drop.
pub trait SnapshotLock: Send {}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Wait for exclusive write access.
    async fn lock(&self) -> Result<Box<dyn SnapshotLock>, EngineError>;

    /// `None` when nothing has been written yet.
    async fn load(&self) -> Result<Option<Snapshot>, EngineError>;

    async fn save(&self, snapshot: &Snapshot) -> Result<(), EngineError>;

    /// Human-readable location, for logs and messages.
    fn describe(&self) -> String;
}
