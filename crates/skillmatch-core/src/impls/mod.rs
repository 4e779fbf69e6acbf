//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **JsonFileStore**: JSON ファイル 1 つに保存する SnapshotStore（ロックファイルで排他）
//!
//! メモリのみで動かす場合は SnapshotStore を渡さずに EntityStore を作ります。

pub mod json_file;

pub use self::json_file::JsonFileStore;
