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

//! Range-bounded retrieval of court event logs for one scan cycle.

use alloy::{
    primitives::Address,
    providers::Provider,
    rpc::types::{BlockNumberOrTag, Filter, Log},
    sol_types::SolEvent,
};
use anyhow::{Context, Result};
use kleros_court::contracts::IKlerosLiquid;

use crate::CycleCtx;

/// All watched court events decoded for one scan cycle, each kind ordered by
/// block number then log index.
#[derive(Debug)]
pub struct CourtEvents {
    pub draws: Vec<IKlerosLiquid::Draw>,
    pub period_changes: Vec<IKlerosLiquid::NewPeriod>,
    pub appeal_decisions: Vec<IKlerosLiquid::AppealDecision>,
    pub token_shifts: Vec<IKlerosLiquid::TokenAndETHShift>,
    pub stake_sets: Vec<IKlerosLiquid::StakeSet>,
}

/// Query logs in chunks to avoid hitting provider limits.
pub async fn query_logs_chunked<P: Provider>(
    provider: &P,
    filter: Filter,
    from_block: u64,
    to_block: u64,
) -> Result<Vec<Log>> {
    const BLOCK_CHUNK_SIZE: u64 = 50_000;
    let mut all_logs = Vec::new();

    let mut current_from = from_block;
    while current_from <= to_block {
        let current_to = (current_from + BLOCK_CHUNK_SIZE - 1).min(to_block);

        let chunk_filter = filter
            .clone()
            .from_block(BlockNumberOrTag::Number(current_from))
            .to_block(BlockNumberOrTag::Number(current_to));

        let logs = provider.get_logs(&chunk_filter).await?;
        all_logs.extend(logs);

        current_from = current_to + 1;
    }

    Ok(all_logs)
}

/// Fetch and decode every log of one event kind emitted by the court over the
/// cycle's block range.
async fn fetch_decoded<E: SolEvent, P: Provider>(
    provider: &P,
    court: Address,
    ctx: &CycleCtx,
) -> Result<Vec<E>> {
    let filter = Filter::new().address(court).event_signature(E::SIGNATURE_HASH);
    let mut logs = query_logs_chunked(provider, filter, ctx.from_block, ctx.to_block).await?;
    logs.sort_by_key(|log| (log.block_number, log.log_index));

    logs.iter()
        .map(|log| {
            let decoded = log
                .log_decode::<E>()
                .with_context(|| format!("failed to decode event {}", E::SIGNATURE))?;
            Ok(decoded.inner.data)
        })
        .collect()
}

/// Fetch all watched event kinds over the cycle's block range. Queries are
/// issued one at a time; everything inside a cycle stays sequential.
pub async fn fetch_court_events<P: Provider>(
    provider: &P,
    court: Address,
    ctx: &CycleCtx,
) -> Result<CourtEvents> {
    tracing::info!(
        "[{}] Fetching court events from block {} to {} ({} blocks)",
        ctx.cycle_id,
        ctx.from_block,
        ctx.to_block,
        ctx.to_block - ctx.from_block
    );

    let draws = fetch_decoded::<IKlerosLiquid::Draw, _>(provider, court, ctx)
        .await
        .context("Failed to get draw logs")?;
    let period_changes = fetch_decoded::<IKlerosLiquid::NewPeriod, _>(provider, court, ctx)
        .await
        .context("Failed to get new period logs")?;
    let appeal_decisions = fetch_decoded::<IKlerosLiquid::AppealDecision, _>(provider, court, ctx)
        .await
        .context("Failed to get appeal decision logs")?;
    let token_shifts = fetch_decoded::<IKlerosLiquid::TokenAndETHShift, _>(provider, court, ctx)
        .await
        .context("Failed to get token shift logs")?;
    let stake_sets = fetch_decoded::<IKlerosLiquid::StakeSet, _>(provider, court, ctx)
        .await
        .context("Failed to get stake set logs")?;

    tracing::info!(
        "[{}] Fetched {} draws, {} period changes, {} appeals, {} token shifts, {} stake updates",
        ctx.cycle_id,
        draws.len(),
        period_changes.len(),
        appeal_decisions.len(),
        token_shifts.len(),
        stake_sets.len()
    );

    Ok(CourtEvents { draws, period_changes, appeal_decisions, token_shifts, stake_sets })
}
