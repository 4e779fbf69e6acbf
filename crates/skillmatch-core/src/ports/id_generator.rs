//! IdGenerator port - リクエスト相関 ID の生成
//!
//! エンティティの ID は store が連番で発行します。ここで生成するのは
//! コマンド 1 回分のログを束ねるための RequestId（ULID）だけです。
//!
//! # 実装
//! - **UlidGenerator**: Clock の時刻 + 乱数で ULID を生成

use std::fmt;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::ports::Clock;

/// Correlates the log lines of one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(Ulid);

impl RequestId {
    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

pub trait IdGenerator: Send + Sync {
    fn request_id(&self) -> RequestId;
}

/// FixedClock を使えば timestamp 部分が決定的になります。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn request_id(&self) -> RequestId {
        let timestamp_ms = u64::try_from(self.clock.now().timestamp_millis()).unwrap_or(0);
        RequestId(Ulid::from_parts(timestamp_ms, rand::random()))
    }
}
