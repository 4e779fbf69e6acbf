//! Domain identifiers (strongly-typed IDs).
//!
//! # 連番 ID + ジェネリック実装
//! ID は store が発行する連番（u64）です。発行順に単調増加し、再利用されません。
//! 割り当ての tie-break（「id が小さい方」）は「先に登録された方」を意味します。
//!
//! ## Phantom Type パターン
//! `Id<T>` というジェネリック型で共通実装を提供しつつ、
//! `T` は実行時には使わない（PhantomData）マーカー型として、
//! コンパイル時の型安全性を提供します（ResourceId と TaskId は混同できない）。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"project-", "task-", ...）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
///
/// JSON では素の整数としてシリアライズされます（外部契約の `id` フィールド）。
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    value: u64,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn new(value: u64) -> Self {
        Self {
            value,
            _marker: PhantomData,
        }
    }

    pub fn get(&self) -> u64 {
        self.value
    }
}

impl<T: IdMarker> From<u64> for Id<T> {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.value)
    }
}

// ========================================
// マーカー型の定義
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Project {}

impl IdMarker for Project {
    fn prefix() -> &'static str {
        "project-"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {}

impl IdMarker for Task {
    fn prefix() -> &'static str {
        "task-"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {}

impl IdMarker for Resource {
    fn prefix() -> &'static str {
        "resource-"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Assignment {}

impl IdMarker for Assignment {
    fn prefix() -> &'static str {
        "assignment-"
    }
}

// ========================================
// Type Alias
// ========================================

/// Identifier of a Project (created on first task referencing it by name).
pub type ProjectId = Id<Project>;

/// Identifier of a Task.
pub type TaskId = Id<Task>;

/// Identifier of a Resource (a person who can be booked).
pub type ResourceId = Id<Resource>;

/// Identifier of an Assignment (one booking of a Resource for a Task).
pub type AssignmentId = Id<Assignment>;

/// Per-kind id counters. Lives inside the catalogue so that ids survive a
/// snapshot round trip and are never reissued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdSequence {
    next_project: u64,
    next_task: u64,
    next_resource: u64,
    next_assignment: u64,
}

impl IdSequence {
    pub fn new() -> Self {
        Self {
            next_project: 1,
            next_task: 1,
            next_resource: 1,
            next_assignment: 1,
        }
    }

    pub fn project(&mut self) -> ProjectId {
        ProjectId::new(bump(&mut self.next_project))
    }

    pub fn task(&mut self) -> TaskId {
        TaskId::new(bump(&mut self.next_task))
    }

    pub fn resource(&mut self) -> ResourceId {
        ResourceId::new(bump(&mut self.next_resource))
    }

    pub fn assignment(&mut self) -> AssignmentId {
        AssignmentId::new(bump(&mut self.next_assignment))
    }

    /// Whether every counter is ahead of the given highest issued values.
    pub(crate) fn is_ahead_of(&self, project: u64, task: u64, resource: u64, assignment: u64) -> bool {
        self.next_project > project
            && self.next_task > task
            && self.next_resource > resource
            && self.next_assignment > assignment
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::new()
    }
}

fn bump(counter: &mut u64) -> u64 {
    let id = *counter;
    *counter += 1;
    id
}
