//! skillmatch-core
//!
//! Matching and allocation engine: books people with the right skill for
//! tasks without ever double-booking anyone.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, window, resource, task, assignment, errors）
//! - **ports**: 抽象化レイヤー（Clock, IdGenerator, SnapshotStore）
//! - **store**: Entity Store（Catalogue + トランザクション）
//! - **engine**: availability index / matcher / planner / completion / onboarding
//! - **app**: EngineBuilder, Engine ファサード, 型付きコマンド
//! - **impls**: 実装（JsonFileStore）
//! - **config**: figment による設定読み込み
//! - **observability**: 集計・一覧ビュー

pub mod app;
pub mod config;
pub mod domain;
pub mod engine;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod store;

pub use app::{Command, Engine, EngineBuilder, Response};
pub use config::EngineConfig;
pub use domain::{EngineError, ErrorKind};
