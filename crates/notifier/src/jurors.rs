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

//! On-demand lookup of a dispute round's juror set and per-juror vote status.

use std::collections::{hash_map::Entry, HashMap};

use alloy::{
    primitives::{Address, U256},
    providers::Provider,
};
use anyhow::{Context, Result};
use kleros_court::contracts::IKlerosLiquid;

/// A juror holding at least one vote slot in a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundJuror {
    pub address: Address,
    /// Whether the juror has cast their vote. When a juror holds several vote
    /// slots, the last slot's flag wins.
    pub voted: bool,
}

/// Index of the round to inspect, if the dispute has enough rounds. The
/// previous round is the one whose outcome was just appealed.
fn select_round(rounds: usize, use_previous_round: bool) -> Option<usize> {
    if use_previous_round {
        rounds.checked_sub(2)
    } else {
        rounds.checked_sub(1)
    }
}

/// Collapse vote slots to one entry per juror, in first-seen order.
fn dedup_vote_slots(slots: impl IntoIterator<Item = (Address, bool)>) -> Vec<RoundJuror> {
    let mut jurors: Vec<RoundJuror> = Vec::new();
    let mut index: HashMap<Address, usize> = HashMap::new();

    for (address, voted) in slots {
        match index.entry(address) {
            Entry::Occupied(slot) => jurors[*slot.get()].voted = voted,
            Entry::Vacant(slot) => {
                slot.insert(jurors.len());
                jurors.push(RoundJuror { address, voted });
            }
        }
    }

    jurors
}

/// Addresses of the jurors still owing a vote, one per juror.
pub fn reminder_recipients(jurors: &[RoundJuror]) -> Vec<Address> {
    jurors.iter().filter(|juror| !juror.voted).map(|juror| juror.address).collect()
}

/// Fetch the jurors of a dispute's latest round, or of the round before it
/// when `use_previous_round` is set. A dispute without enough rounds (or a
/// round with no vote slots) yields an empty list.
pub async fn jurors_in_round<P: Provider>(
    provider: &P,
    court_address: Address,
    dispute_id: U256,
    use_previous_round: bool,
) -> Result<Vec<RoundJuror>> {
    let court = IKlerosLiquid::new(court_address, provider);

    let dispute = court
        .getDispute(dispute_id)
        .call()
        .await
        .with_context(|| format!("Failed to get rounds of dispute {}", dispute_id))?;

    let Some(round) = select_round(dispute.votesLengths.len(), use_previous_round) else {
        return Ok(Vec::new());
    };
    let vote_count = dispute.votesLengths[round].to::<u64>();

    let mut slots = Vec::with_capacity(vote_count as usize);
    for vote_id in 0..vote_count {
        let vote = court
            .getVote(dispute_id, U256::from(round), U256::from(vote_id))
            .call()
            .await
            .with_context(|| {
                format!("Failed to get vote {} of dispute {}", vote_id, dispute_id)
            })?;
        slots.push((vote.account, vote.voted));
    }

    Ok(dedup_vote_slots(slots))
}
