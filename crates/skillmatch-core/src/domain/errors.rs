//! Errors - エラー型と分類
//!
//! すべての操作は `EngineError` を返します。`ErrorKind` は運用上の分類で、
//! 内部リトライの判断と CLI の終了コードに使います。

use thiserror::Error;

/// ErrorKind は実行エラーの分類
///
/// # 分類
/// - Validation / NotFound / NoQualifiedResource / ResourceUnavailable / InvalidState:
///   リクエスト単位の失敗（呼び出し側が入力や状態を直せば回復可能）
/// - Conflict: 並行書き込みの競合（内部で最初からやり直す）
/// - Persistence: store の障害（このリクエストは失敗、プロセスは継続）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    NoQualifiedResource,
    ResourceUnavailable,
    InvalidState,
    Conflict,
    Persistence,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("no qualified resource with skill '{skill}' is free for the requested schedule")]
    NoQualifiedResource { skill: String },

    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("task {0} already has an active assignment")]
    DuplicateAssignment(String),

    #[error("booking conflict: {0}")]
    Conflict(String),

    #[error("persistence error: {0}")]
    Persistence(String),
}

impl EngineError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn persistence(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Persistence(format!("{context}: {err}"))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::NoQualifiedResource { .. } => ErrorKind::NoQualifiedResource,
            Self::ResourceUnavailable(_) => ErrorKind::ResourceUnavailable,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::DuplicateAssignment(_) | Self::Conflict(_) => ErrorKind::Conflict,
            Self::Persistence(_) => ErrorKind::Persistence,
        }
    }

    /// Conflicts are resolved by re-running the whole plan, never surfaced
    /// while a retry is still allowed.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}
