//! JsonFileStore - JSON ファイル 1 つにカタログを保存する SnapshotStore
//!
//! # 実装詳細
//! - 書き込みは一時ファイル → rename で原子的に置き換える
//! - 排他は `<path>.lock` に対する OS のアドバイザリロック（flock / LockFileEx）。
//!   プロセスが死ねば OS が解放するので、stale ロックを壊す処理は持たない
//! - ロックファイルの中身（保持プロセスの pid）は診断用で、排他には使わない
//! - ファイル I/O は spawn_blocking で実行する

use std::fs::{File, OpenOptions, TryLockError};
use std::io::{ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::domain::EngineError;
use crate::ports::{SnapshotLock, SnapshotStore};
use crate::store::Snapshot;

const LOCK_RETRY_DELAY: Duration = Duration::from_millis(25);

pub struct JsonFileStore {
    path: PathBuf,
    lock_path: PathBuf,
    lock_timeout: Duration,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>, lock_timeout: Duration) -> Self {
        let path = path.into();
        let lock_path = sibling(&path, "lock");
        Self {
            path,
            lock_path,
            lock_timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

#[async_trait]
impl SnapshotStore for JsonFileStore {
    async fn lock(&self) -> Result<Box<dyn SnapshotLock>, EngineError> {
        let started = Instant::now();
        loop {
            if let Some(guard) = try_acquire(&self.lock_path)? {
                return Ok(Box::new(guard));
            }
            if started.elapsed() >= self.lock_timeout {
                let holder = recorded_holder(&self.lock_path)
                    .map_or_else(|| "holder unknown".to_string(), |pid| format!("held by pid {pid}"));
                return Err(EngineError::Persistence(format!(
                    "timed out waiting for store lock {} ({holder})",
                    self.lock_path.display()
                )));
            }
            tokio::time::sleep(LOCK_RETRY_DELAY).await;
        }
    }

    async fn load(&self) -> Result<Option<Snapshot>, EngineError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let raw = match std::fs::read_to_string(&path) {
                Ok(raw) => raw,
                Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(None),
                Err(e) => return Err(EngineError::persistence(&format!("read {}", path.display()), e)),
            };
            serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| EngineError::persistence(&format!("decode {}", path.display()), e))
        })
        .await
        .map_err(|e| EngineError::persistence("load task", e))?
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), EngineError> {
        let bytes = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| EngineError::persistence("encode snapshot", e))?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &bytes))
            .await
            .map_err(|e| EngineError::persistence("save task", e))?
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), EngineError> {
    let context = |what: &str| format!("{what} {}", path.display());
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| EngineError::persistence(&context("create dir for"), e))?;
    }
    let tmp = sibling(path, "tmp");
    let mut file = File::create(&tmp).map_err(|e| EngineError::persistence(&context("create temp for"), e))?;
    file.write_all(bytes)
        .and_then(|()| file.sync_all())
        .map_err(|e| EngineError::persistence(&context("write"), e))?;
    std::fs::rename(&tmp, path).map_err(|e| EngineError::persistence(&context("replace"), e))
}

/// `store.json` -> `store.json.<suffix>`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// Holds the OS lock on `<path>.lock`. The file itself is never removed;
/// only the lock on its descriptor matters.
struct FileLockGuard {
    file: File,
}

impl SnapshotLock for FileLockGuard {}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// `Ok(None)` while another handle (in this or another process) holds the lock.
fn try_acquire(lock_path: &Path) -> Result<Option<FileLockGuard>, EngineError> {
    let context = |what: &str| format!("{what} {}", lock_path.display());
    if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| EngineError::persistence(&context("create dir for"), e))?;
    }

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path)
        .map_err(|e| EngineError::persistence(&context("open"), e))?;

    match file.try_lock() {
        Ok(()) => {
            // pid is informational only (timeout messages).
            let mut writer = &file;
            let _ = file
                .set_len(0)
                .and_then(|()| writeln!(writer, "{}", std::process::id()));
            Ok(Some(FileLockGuard { file }))
        }
        Err(TryLockError::WouldBlock) => Ok(None),
        Err(TryLockError::Error(e)) => Err(EngineError::persistence(&context("lock"), e)),
    }
}

fn recorded_holder(lock_path: &Path) -> Option<u32> {
    std::fs::read_to_string(lock_path).ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IdSequence;

    fn empty_snapshot() -> Snapshot {
        Snapshot {
            version: Snapshot::VERSION,
            ids: IdSequence::new(),
            projects: vec![],
            resources: vec![],
            tasks: vec![],
            assignments: vec![],
            history: vec![],
        }
    }

    #[tokio::test]
    async fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("store.json"), Duration::from_secs(1));
        assert!(!store.exists());
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_replaces_file_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/store.json");
        let store = JsonFileStore::new(&path, Duration::from_secs(1));

        let mut snapshot = empty_snapshot();
        store.save(&snapshot).await.unwrap();
        snapshot.ids.resource();
        store.save(&snapshot).await.unwrap();

        assert!(store.exists());
        assert!(!sibling(&path, "tmp").exists());
        assert_eq!(store.load().await.unwrap(), Some(snapshot));
    }

    #[tokio::test]
    async fn garbage_file_is_a_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = JsonFileStore::new(&path, Duration::from_secs(1));
        assert!(matches!(store.load().await, Err(EngineError::Persistence(_))));
    }

    #[tokio::test]
    async fn lock_is_exclusive_until_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("store.json"), Duration::from_millis(100));

        let guard = store.lock().await.unwrap();
        let err = store.lock().await.err().unwrap();
        assert!(err.to_string().contains("timed out"));
        assert!(err.to_string().contains(&format!("held by pid {}", std::process::id())));

        drop(guard);
        assert!(store.lock().await.is_ok());
    }

    #[rstest::rstest]
    #[case::no_lock_file(None)]
    #[case::dead_holder(Some("2147483646\n"))]
    #[case::garbage(Some("not a pid"))]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn contenders_never_hold_the_lock_together(#[case] leftover: Option<&str>) {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        if let Some(content) = leftover {
            std::fs::write(sibling(&path, "lock"), content).unwrap();
        }

        let holders = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let tasks: Vec<_> = (0..6)
            .map(|_| {
                // One store value per contender, like separate processes.
                let store = JsonFileStore::new(&path, Duration::from_secs(5));
                let (holders, peak) = (holders.clone(), peak.clone());
                tokio::spawn(async move {
                    let _guard = store.lock().await.unwrap();
                    let now = holders.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    holders.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }
}
