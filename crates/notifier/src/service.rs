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

//! The per-court reconciliation cycle: scan a block range, turn court events
//! into notifications and commit the advanced cursor.

use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use alloy::{
    primitives::{Address, U256},
    providers::{
        fillers::{ChainIdFiller, FillProvider, JoinFill},
        Identity, Provider, ProviderBuilder, RootProvider,
    },
    rpc::client::RpcClient,
    transports::layers::RetryBackoffLayer,
};
use anyhow::{Context, Result};
use chrono::Utc;
use kleros_court::{contracts::IKlerosLiquid, deployments::Deployment, Period};
use tokio::time::Duration;
use url::Url;
use uuid::Uuid;

use crate::{
    aggregate::{aggregate_draws, aggregate_stakes, aggregate_token_shifts, format_amount},
    db::{NotifierDb, NotifierDbObj, ScanState},
    deadline::{
        evict_reminded, observe_period_change, reminder_due, seconds_until_deadline, PeriodAction,
    },
    events::fetch_court_events,
    jurors::{jurors_in_round, reminder_recipients},
    metadata::MetadataClient,
    notify::{Notification, Notifier, StakeChange},
    CycleCtx,
};

#[derive(Clone)]
pub struct CourtNotifierServiceConfig {
    /// Pause between scan cycles.
    pub interval: Duration,
    /// Pause before each webhook delivery.
    pub notify_delay: Duration,
    /// First block to scan on a never-seen court. Defaults to the chain head,
    /// so history is not backfilled.
    pub start_block: Option<u64>,
    /// Gateway serving content-addressed metadata.
    pub ipfs_gateway: Url,
    /// Webhook receiving every notification payload.
    pub webhook_url: Url,
    /// Name of the scan state table.
    pub state_table: String,
}

type ProviderType = FillProvider<JoinFill<Identity, ChainIdFiller>, RootProvider>;

pub struct CourtNotifierService {
    provider: ProviderType,
    db: NotifierDbObj,
    court_address: Address,
    policy_registry_address: Address,
    metadata: MetadataClient,
    notifier: Notifier,
    config: CourtNotifierServiceConfig,
    chain_id: u64,
}

impl CourtNotifierService {
    pub async fn new(
        rpc_url: Url,
        deployment: Option<Deployment>,
        db_conn: &str,
        config: CourtNotifierServiceConfig,
    ) -> Result<Self> {
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .filler(ChainIdFiller::default())
            .connect_client(
                RpcClient::builder().layer(RetryBackoffLayer::new(3, 1000, 200)).http(rpc_url),
            );
        let chain_id = provider.get_chain_id().await?;
        let deployment = deployment
            .or_else(|| Deployment::from_chain_id(chain_id))
            .context("Could not determine court deployment from chain ID")?;

        let db: NotifierDbObj = Arc::new(NotifierDb::new(db_conn, &config.state_table).await?);
        let metadata = MetadataClient::new(config.ipfs_gateway.clone());
        let notifier = Notifier::new(config.webhook_url.clone(), config.notify_delay);

        // One execution id per service start.
        tracing::info!(
            "[{}] Court notifier starting for court {:#x} (policy registry {:#x}) on chain {}, \
            notifying {}",
            Uuid::new_v4(),
            deployment.court_address,
            deployment.policy_registry_address,
            chain_id,
            config.webhook_url
        );

        Ok(Self {
            provider,
            db,
            court_address: deployment.court_address,
            policy_registry_address: deployment.policy_registry_address,
            metadata,
            notifier,
            config,
            chain_id,
        })
    }

    /// The court contract this loop instance watches.
    pub fn court_address(&self) -> Address {
        self.court_address
    }

    /// Pause between scan cycles.
    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    /// Run one reconciliation cycle. The cursor only advances after every
    /// notification derived from the scanned range has been delivered, so a
    /// failed cycle is re-run over the same range.
    pub async fn run(&self) -> Result<()> {
        let start_time = std::time::Instant::now();

        let state = self.load_or_init_state().await?;
        let to_block = self.provider.get_block_number().await?;
        if to_block < state.last_block {
            tracing::info!(
                "No new blocks for court {:#x} (cursor {}, head {})",
                self.court_address,
                state.last_block,
                to_block
            );
            return Ok(());
        }

        let ctx = CycleCtx::new(state.last_block, to_block);
        tracing::info!(
            "[{}] Starting cycle for court {:#x} on chain {}",
            ctx.cycle_id,
            self.court_address,
            self.chain_id
        );

        let events = fetch_court_events(&self.provider, self.court_address, &ctx).await?;

        let mut tracked = state.voting_disputes;

        self.notify_draws(&ctx, &events.draws).await?;
        self.process_period_changes(&ctx, &events.period_changes, &mut tracked).await?;
        self.send_vote_reminders(&ctx, &mut tracked).await?;
        self.notify_appeals(&ctx, &events.appeal_decisions).await?;
        self.notify_token_shifts(&ctx, &events.token_shifts).await?;
        self.notify_stake_changes(&ctx, &events.stake_sets).await?;

        self.db.set_last_block(self.court_address, to_block + 1).await?;

        tracing::info!(
            "[{}] Cycle completed in {:.2}s, next scan starts at block {}",
            ctx.cycle_id,
            start_time.elapsed().as_secs_f64(),
            to_block + 1
        );
        Ok(())
    }

    async fn load_or_init_state(&self) -> Result<ScanState> {
        if let Some(state) = self.db.get_state(self.court_address).await? {
            return Ok(state);
        }

        let start_block = match self.config.start_block {
            Some(block) => block,
            None => self.provider.get_block_number().await?,
        };
        tracing::info!(
            "First run for court {:#x}, starting scan at block {}",
            self.court_address,
            start_block
        );
        self.db.init_state(self.court_address, start_block).await?;

        Ok(ScanState { last_block: start_block, voting_disputes: BTreeSet::new() })
    }

    /// One Draw notification per (dispute, juror) pair, however many slots the
    /// juror was drawn for.
    async fn notify_draws(&self, ctx: &CycleCtx, draws: &[IKlerosLiquid::Draw]) -> Result<()> {
        let drawn = aggregate_draws(draws);

        for (dispute_id, jurors) in &drawn {
            for juror in jurors {
                tracing::debug!(
                    "[{}] Juror {} drawn {} time(s) for dispute {}",
                    ctx.cycle_id,
                    juror.address,
                    juror.times_drawn,
                    dispute_id
                );
                let notification = Notification::Draw {
                    dispute_id: dispute_id.to_string(),
                    appeal: juror.appeal,
                    address: juror.address,
                };
                self.notifier.send(ctx, &notification).await?;
            }
        }
        Ok(())
    }

    /// Apply period transitions to the tracked dispute set, telling every
    /// juror of a dispute that just became votable. The updated set is
    /// committed whenever the batch held any transition at all.
    async fn process_period_changes(
        &self,
        ctx: &CycleCtx,
        period_changes: &[IKlerosLiquid::NewPeriod],
        tracked: &mut BTreeSet<U256>,
    ) -> Result<()> {
        if period_changes.is_empty() {
            return Ok(());
        }

        for event in period_changes {
            let dispute_id = event._disputeID;
            let period = Period::try_from(event._period)
                .with_context(|| format!("Dispute {} reported a bad period", dispute_id))?;

            match observe_period_change(tracked, dispute_id, period) {
                PeriodAction::StartedVoting => {
                    tracing::info!(
                        "[{}] Dispute {} entered its voting period",
                        ctx.cycle_id,
                        dispute_id
                    );
                    let jurors =
                        jurors_in_round(&self.provider, self.court_address, dispute_id, false)
                            .await?;
                    for juror in jurors {
                        let notification = Notification::Vote {
                            dispute_id: dispute_id.to_string(),
                            address: juror.address,
                        };
                        self.notifier.send(ctx, &notification).await?;
                    }
                }
                PeriodAction::StoppedVoting => {
                    tracing::info!(
                        "[{}] Dispute {} moved to appeal, no reminder owed",
                        ctx.cycle_id,
                        dispute_id
                    );
                }
                PeriodAction::Ignored => {}
            }
        }

        self.db.set_voting_disputes(self.court_address, tracked).await?;
        Ok(())
    }

    /// Walk the tracked disputes and remind non-voted jurors of any dispute
    /// inside the last day of its voting window. Each reminded dispute is
    /// evicted and the set flushed immediately, so a later failure in the
    /// same cycle cannot re-send the reminder.
    async fn send_vote_reminders(
        &self,
        ctx: &CycleCtx,
        tracked: &mut BTreeSet<U256>,
    ) -> Result<()> {
        let court = IKlerosLiquid::new(self.court_address, &self.provider);

        for dispute_id in tracked.clone() {
            let dispute = court
                .disputes(dispute_id)
                .call()
                .await
                .with_context(|| format!("Failed to get dispute {}", dispute_id))?;
            let subcourt = court
                .getSubcourt(dispute.subcourtID)
                .call()
                .await
                .with_context(|| format!("Failed to get subcourt of dispute {}", dispute_id))?;
            let time_per_vote = subcourt
                .timesPerPeriod
                .get(Period::Vote as usize)
                .copied()
                .with_context(|| format!("Subcourt of dispute {} has no vote period", dispute_id))?;

            let seconds_left = seconds_until_deadline(
                dispute.lastPeriodChange.to::<u64>(),
                time_per_vote.to::<u64>(),
                Utc::now().timestamp(),
            );
            if !reminder_due(seconds_left) {
                continue;
            }

            tracing::info!(
                "[{}] Dispute {} accepts votes for another {}s, reminding absent jurors",
                ctx.cycle_id,
                dispute_id,
                seconds_left
            );

            let jurors =
                jurors_in_round(&self.provider, self.court_address, dispute_id, false).await?;
            for address in reminder_recipients(&jurors) {
                let notification =
                    Notification::VoteReminder { dispute_id: dispute_id.to_string(), address };
                self.notifier.send(ctx, &notification).await?;
            }

            evict_reminded(tracked, dispute_id);
            self.db.set_voting_disputes(self.court_address, tracked).await?;
        }

        Ok(())
    }

    /// One Appeal notification per appeal decision, sent to the jurors of the
    /// round whose ruling was appealed.
    async fn notify_appeals(
        &self,
        ctx: &CycleCtx,
        appeals: &[IKlerosLiquid::AppealDecision],
    ) -> Result<()> {
        for event in appeals {
            let dispute_id = event._disputeID;
            tracing::info!("[{}] Dispute {} was appealed", ctx.cycle_id, dispute_id);

            let jurors =
                jurors_in_round(&self.provider, self.court_address, dispute_id, true).await?;
            for juror in jurors {
                let notification = Notification::Appeal {
                    dispute_id: dispute_id.to_string(),
                    address: juror.address,
                };
                self.notifier.send(ctx, &notification).await?;
            }
        }
        Ok(())
    }

    /// Turn accumulated token movements into Won or Lost notifications. The
    /// case title is resolved once per dispute and reused for every account.
    async fn notify_token_shifts(
        &self,
        ctx: &CycleCtx,
        token_shifts: &[IKlerosLiquid::TokenAndETHShift],
    ) -> Result<()> {
        let by_dispute = aggregate_token_shifts(token_shifts)?;
        let court = IKlerosLiquid::new(self.court_address, &self.provider);

        for (dispute_id, accounts) in &by_dispute {
            let dispute = court
                .disputes(*dispute_id)
                .call()
                .await
                .with_context(|| format!("Failed to get dispute {}", dispute_id))?;
            let case_title = self
                .metadata
                .case_title(&self.provider, self.court_address, dispute.arbitrated, *dispute_id)
                .await?;

            for shift in accounts {
                let notification = if shift.eth_amount > 0.0 {
                    Notification::Won {
                        dispute_id: dispute_id.to_string(),
                        address: shift.account,
                        eth_won: format_amount(shift.eth_amount),
                        pnk_won: format_amount(shift.pnk_amount),
                        case_title: case_title.clone(),
                    }
                } else {
                    Notification::Lost {
                        dispute_id: dispute_id.to_string(),
                        address: shift.account,
                        pnk_lost: format_amount(shift.pnk_amount),
                        case_title: case_title.clone(),
                    }
                };
                self.notifier.send(ctx, &notification).await?;
            }
        }
        Ok(())
    }

    /// One StakeChanged notification per juror listing their latest stake per
    /// subcourt. Subcourt names are resolved once per distinct subcourt.
    async fn notify_stake_changes(
        &self,
        ctx: &CycleCtx,
        stake_sets: &[IKlerosLiquid::StakeSet],
    ) -> Result<()> {
        let by_juror = aggregate_stakes(stake_sets)?;
        if by_juror.is_empty() {
            return Ok(());
        }

        let mut names: HashMap<U256, Option<String>> = HashMap::new();
        for stake in by_juror.values().flatten() {
            if !names.contains_key(&stake.subcourt_id) {
                let name = self
                    .metadata
                    .subcourt_name(&self.provider, self.policy_registry_address, stake.subcourt_id)
                    .await?;
                names.insert(stake.subcourt_id, name);
            }
        }

        for (juror, stakes) in &by_juror {
            let stakes_changed = stakes
                .iter()
                .map(|stake| StakeChange {
                    amount: stake.amount.clone(),
                    subcourt: names.get(&stake.subcourt_id).cloned().flatten(),
                })
                .collect();

            let notification = Notification::StakeChanged { address: *juror, stakes_changed };
            self.notifier.send(ctx, &notification).await?;
        }
        Ok(())
    }
}
