//! Engine - matching and allocation logic over a `Catalogue`.
//!
//! ここにある関数はすべて同期・純粋に近い形で `&Catalogue` / `&mut Catalogue` を受け取ります。
//! トランザクション境界・時刻・ログの相関は `app::Engine` 側が受け持ちます。

pub mod availability;
pub mod completion;
pub mod matcher;
pub mod onboarding;
pub mod planner;
pub mod retry;

pub use self::availability::{AvailabilityIndex, Candidate, FreeSpan};
pub use self::completion::{complete, Completion};
pub use self::matcher::{find_candidates, ResourceRef, TaskMatch};
pub use self::onboarding::{onboard, NewResource, Onboarded};
pub use self::planner::{
    plan_and_commit, select, Allocation, AllocationOutcome, AllocationRequest, Selection, Tier,
    ValidatedRequest,
};
pub use self::retry::{retry_on_conflict, RetryPolicy};
