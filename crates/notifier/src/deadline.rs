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

//! Tracking of disputes in their voting window and evaluation of their vote
//! deadline.

use std::collections::BTreeSet;

use alloy::primitives::U256;
use kleros_court::Period;

/// Reminder window before the voting deadline.
pub const REMINDER_WINDOW_SECS: i64 = 86_400;

/// Outcome of applying one period transition to the tracked dispute set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodAction {
    /// The dispute entered its voting period and is tracked from now on.
    StartedVoting,
    /// The dispute moved on to appeal; tracking stops without a reminder.
    StoppedVoting,
    /// The transition is irrelevant to vote tracking.
    Ignored,
}

/// Apply a period transition to the tracked dispute set. Insertion is
/// idempotent, so a re-scanned Vote transition cannot duplicate an entry.
pub fn observe_period_change(
    tracked: &mut BTreeSet<U256>,
    dispute_id: U256,
    period: Period,
) -> PeriodAction {
    match period {
        Period::Vote => {
            tracked.insert(dispute_id);
            PeriodAction::StartedVoting
        }
        Period::Appeal => {
            tracked.remove(&dispute_id);
            PeriodAction::StoppedVoting
        }
        _ => PeriodAction::Ignored,
    }
}

/// Seconds until a dispute's voting deadline, negative once it has passed.
/// `last_period_change` and `time_per_vote_period` are chain values; `now` is
/// unix seconds.
pub fn seconds_until_deadline(
    last_period_change: u64,
    time_per_vote_period: u64,
    now: i64,
) -> i64 {
    let deadline = last_period_change as i128 + time_per_vote_period as i128;
    (deadline - now as i128).clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

/// A reminder is owed only inside the last day before the deadline. A dispute
/// whose deadline already passed is deliberately left tracked; the appeal
/// transition is what eventually clears it.
pub fn reminder_due(seconds_left: i64) -> bool {
    seconds_left > 0 && seconds_left <= REMINDER_WINDOW_SECS
}

/// Drop a dispute from the tracked set once its reminder went out. Reminders
/// are one-shot per dispute.
pub fn evict_reminded(tracked: &mut BTreeSet<U256>, dispute_id: U256) -> bool {
    tracked.remove(&dispute_id)
}

#[cfg(test)]
mod tests {
    use alloy::primitives::Address;

    use super::*;
    use crate::jurors::{reminder_recipients, RoundJuror};

    #[test]
    fn vote_transition_tracks_idempotently() {
        let mut tracked = BTreeSet::new();

        let action = observe_period_change(&mut tracked, U256::from(7), Period::Vote);
        assert_eq!(action, PeriodAction::StartedVoting);

        let action = observe_period_change(&mut tracked, U256::from(7), Period::Vote);
        assert_eq!(action, PeriodAction::StartedVoting);

        assert_eq!(tracked.len(), 1);
    }

    #[test]
    fn appeal_transition_stops_tracking() {
        let mut tracked = BTreeSet::from([U256::from(7), U256::from(9)]);

        let action = observe_period_change(&mut tracked, U256::from(7), Period::Appeal);
        assert_eq!(action, PeriodAction::StoppedVoting);
        assert!(!tracked.contains(&U256::from(7)));
        assert!(tracked.contains(&U256::from(9)));

        // Removing an untracked dispute is a no-op
        let action = observe_period_change(&mut tracked, U256::from(42), Period::Appeal);
        assert_eq!(action, PeriodAction::StoppedVoting);
        assert_eq!(tracked.len(), 1);
    }

    #[test]
    fn other_transitions_are_ignored() {
        let mut tracked = BTreeSet::new();
        for period in [Period::Evidence, Period::Commit, Period::Execution] {
            let action = observe_period_change(&mut tracked, U256::from(1), period);
            assert_eq!(action, PeriodAction::Ignored);
        }
        assert!(tracked.is_empty());
    }

    #[test]
    fn reminder_only_inside_last_day() {
        assert!(reminder_due(1));
        assert!(reminder_due(3600));
        assert!(reminder_due(REMINDER_WINDOW_SECS));
        assert!(!reminder_due(REMINDER_WINDOW_SECS + 1));
        assert!(!reminder_due(0));
        assert!(!reminder_due(-10));
    }

    #[test]
    fn deadline_math_survives_extreme_chain_values() {
        // 100 + 3600 - 3000 = 700 seconds left
        assert_eq!(seconds_until_deadline(100, 3600, 3000), 700);
        // Deadline passed
        assert_eq!(seconds_until_deadline(100, 3600, 5000), -1300);
        // Absurd period duration saturates instead of overflowing
        assert_eq!(seconds_until_deadline(u64::MAX, u64::MAX, 0), i64::MAX);
    }

    #[test]
    fn due_dispute_reminds_its_absent_juror_once_then_leaves_the_set() {
        let dispute_id = U256::from(7);
        let mut tracked = BTreeSet::from([dispute_id, U256::from(9)]);
        let jurors = [
            RoundJuror { address: Address::with_last_byte(1), voted: false },
            RoundJuror { address: Address::with_last_byte(2), voted: true },
        ];

        // One hour of voting left: exactly the juror who has not voted is
        // reminded, then the dispute leaves the tracked set.
        assert!(reminder_due(3600));
        assert_eq!(reminder_recipients(&jurors), vec![Address::with_last_byte(1)]);
        assert!(evict_reminded(&mut tracked, dispute_id));
        assert_eq!(tracked, BTreeSet::from([U256::from(9)]));
    }

    #[test]
    fn passed_deadline_sends_nothing_and_keeps_the_dispute_tracked() {
        let dispute_id = U256::from(7);
        let tracked = BTreeSet::from([dispute_id]);
        let jurors = [RoundJuror { address: Address::with_last_byte(1), voted: false }];

        // Ten seconds past the deadline: no reminder is owed even though a
        // juror never voted, and the dispute stays tracked.
        assert!(!reminder_due(-10));
        assert!(!reminder_recipients(&jurors).is_empty());
        assert!(tracked.contains(&dispute_id));
    }
}
