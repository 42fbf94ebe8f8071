// Copyright 2025 RISC Zero, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Court event scanning and juror webhook notification.
//!
//! The notifier watches a Kleros court contract for juror-facing events
//! (draws, period changes, appeals, token redistribution and stake updates),
//! folds each scanned block range into per-juror notifications and delivers
//! them to a webhook. Scan progress and the set of disputes awaiting a vote
//! reminder persist across restarts.

pub mod aggregate;
pub mod db;
pub mod deadline;
pub mod events;
pub mod jurors;
pub mod metadata;
pub mod notify;
pub mod service;
pub mod supervisor;

pub use service::{CourtNotifierService, CourtNotifierServiceConfig};
pub use supervisor::{CourtStatus, StatusBoard, Supervisor};

use uuid::Uuid;

/// Identity and block range of one reconciliation cycle, threaded through
/// fetching and delivery so log lines of the same cycle correlate.
#[derive(Clone, Copy, Debug)]
pub struct CycleCtx {
    pub cycle_id: Uuid,
    pub from_block: u64,
    pub to_block: u64,
}

impl CycleCtx {
    pub fn new(from_block: u64, to_block: u64) -> Self {
        Self { cycle_id: Uuid::new_v4(), from_block, to_block }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_ctx_carries_range_and_unique_id() {
        let first = CycleCtx::new(5, 10);
        let second = CycleCtx::new(5, 10);
        assert_eq!(first.from_block, 5);
        assert_eq!(first.to_block, 10);
        assert_ne!(first.cycle_id, second.cycle_id);
    }
}
