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

//! Pure aggregation of raw event batches into per-dispute and per-juror
//! notification inputs. Aggregates are recomputed from scratch every cycle,
//! never accumulated across cycles.

use std::collections::{hash_map::Entry, BTreeMap, HashMap};

use alloy::primitives::{Address, U256};
use anyhow::Result;
use kleros_court::{contracts::IKlerosLiquid, from_wei, from_wei_f64};

/// One juror's draw summary for a dispute within a scan window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JurorDraw {
    /// The drawn juror.
    pub address: Address,
    /// Number of times the juror was drawn for the dispute in the window.
    pub times_drawn: u64,
    /// Whether the last observed draw was for an appeal round.
    pub appeal: bool,
}

/// Accumulated token movement for one account within a scan window. Amounts
/// are in whole token units; negative values are losses.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountShift {
    pub account: Address,
    pub eth_amount: f64,
    pub pnk_amount: f64,
}

/// A juror's latest stake in one subcourt within a scan window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubcourtStake {
    pub subcourt_id: U256,
    /// Stake in whole PNK as an exact decimal string.
    pub amount: String,
}

/// Group draw events by dispute, then by juror in first-seen order. Repeated
/// draws of the same juror collapse into one entry with a count; the appeal
/// flag keeps the value of the last event seen for that pair.
pub fn aggregate_draws(events: &[IKlerosLiquid::Draw]) -> BTreeMap<U256, Vec<JurorDraw>> {
    let mut by_dispute: BTreeMap<U256, Vec<JurorDraw>> = BTreeMap::new();
    let mut index: HashMap<(U256, Address), usize> = HashMap::new();

    for event in events {
        let jurors = by_dispute.entry(event._disputeID).or_default();
        match index.entry((event._disputeID, event._address)) {
            Entry::Occupied(slot) => {
                let juror = &mut jurors[*slot.get()];
                juror.times_drawn += 1;
                juror.appeal = !event._appeal.is_zero();
            }
            Entry::Vacant(slot) => {
                slot.insert(jurors.len());
                jurors.push(JurorDraw {
                    address: event._address,
                    times_drawn: 1,
                    appeal: !event._appeal.is_zero(),
                });
            }
        }
    }

    by_dispute
}

/// Sum token and ETH movements per dispute and account. The sign of the
/// accumulated ETH amount decides between a win and a loss downstream.
pub fn aggregate_token_shifts(
    events: &[IKlerosLiquid::TokenAndETHShift],
) -> Result<BTreeMap<U256, Vec<AccountShift>>> {
    let mut by_dispute: BTreeMap<U256, Vec<AccountShift>> = BTreeMap::new();
    let mut index: HashMap<(U256, Address), usize> = HashMap::new();

    for event in events {
        let eth = from_wei_f64(event._ETHAmount)?;
        let pnk = from_wei_f64(event._tokenAmount)?;

        let shifts = by_dispute.entry(event._disputeID).or_default();
        match index.entry((event._disputeID, event._address)) {
            Entry::Occupied(slot) => {
                let shift = &mut shifts[*slot.get()];
                shift.eth_amount += eth;
                shift.pnk_amount += pnk;
            }
            Entry::Vacant(slot) => {
                slot.insert(shifts.len());
                shifts.push(AccountShift {
                    account: event._address,
                    eth_amount: eth,
                    pnk_amount: pnk,
                });
            }
        }
    }

    Ok(by_dispute)
}

/// Collect each juror's stake per subcourt. Later events in the window
/// overwrite earlier ones for the same (juror, subcourt) pair.
pub fn aggregate_stakes(
    events: &[IKlerosLiquid::StakeSet],
) -> Result<BTreeMap<Address, Vec<SubcourtStake>>> {
    let mut by_juror: BTreeMap<Address, Vec<SubcourtStake>> = BTreeMap::new();
    let mut index: HashMap<(Address, U256), usize> = HashMap::new();

    for event in events {
        let amount = from_wei(U256::from(event._stake))?;

        let stakes = by_juror.entry(event._address).or_default();
        match index.entry((event._address, event._subcourtID)) {
            Entry::Occupied(slot) => {
                stakes[*slot.get()].amount = amount;
            }
            Entry::Vacant(slot) => {
                slot.insert(stakes.len());
                stakes.push(SubcourtStake { subcourt_id: event._subcourtID, amount });
            }
        }
    }

    Ok(by_juror)
}

/// Round a display amount to 2 decimal places when its magnitude exceeds 1,
/// otherwise to 4. The nudge keeps decimal halfway cases such as 1.005 from
/// truncating down through their binary representation.
pub fn format_amount(amount: f64) -> f64 {
    let precision = if amount.abs() > 1.0 { 100.0 } else { 10_000.0 };
    let scaled = amount * precision;
    (scaled + scaled.signum() * 1e-9).round() / precision
}
