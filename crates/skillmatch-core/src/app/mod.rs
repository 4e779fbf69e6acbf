//! App - アプリケーション層
//!
//! store・engine・ports を組み合わせて、コマンド単位の API を提供します。
//!
//! # 主要コンポーネント
//! - **EngineBuilder**: ストアの open / create と依存のワイヤリング
//! - **Engine**: コマンドごとのファサード（時刻・span・retry）
//! - **service**: 型付きコマンドとワイヤ形式のレスポンス

pub mod builder;
pub mod engine;
pub mod service;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, EngineBuilder};
pub use self::engine::Engine;
pub use self::service::{execute, Command, MatchEntry, Outcome, Response};
