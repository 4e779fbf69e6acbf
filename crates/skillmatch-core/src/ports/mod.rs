//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」です。エンジンは時刻・ID・永続化を
//! これらの trait 越しにしか触りません。

pub mod clock;
pub mod id_generator;
pub mod snapshot_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, RequestId, UlidGenerator};
pub use self::snapshot_store::{SnapshotLock, SnapshotStore};
