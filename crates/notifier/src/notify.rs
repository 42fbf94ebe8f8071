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

//! Outbound webhook payloads and their delivery.

use std::time::Duration;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use serde::Serialize;
use url::Url;

use crate::CycleCtx;

/// One entry of a [Notification::StakeChanged] payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StakeChange {
    /// Stake in whole PNK as an exact decimal string.
    pub amount: String,
    /// Subcourt display name, omitted when the subcourt policy has none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcourt: Option<String>,
}

/// One webhook payload per notification kind, tagged by `event`. Dispute ids
/// travel as decimal strings; display amounts are pre-rounded floats.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event")]
pub enum Notification {
    Draw {
        #[serde(rename = "_disputeID")]
        dispute_id: String,
        #[serde(rename = "_appeal")]
        appeal: bool,
        #[serde(rename = "_address")]
        address: Address,
    },
    Vote {
        #[serde(rename = "_disputeID")]
        dispute_id: String,
        #[serde(rename = "_address")]
        address: Address,
    },
    VoteReminder {
        #[serde(rename = "_disputeID")]
        dispute_id: String,
        #[serde(rename = "_address")]
        address: Address,
    },
    Appeal {
        #[serde(rename = "_disputeID")]
        dispute_id: String,
        #[serde(rename = "_address")]
        address: Address,
    },
    Won {
        #[serde(rename = "_disputeID")]
        dispute_id: String,
        #[serde(rename = "_address")]
        address: Address,
        #[serde(rename = "_ethWon")]
        eth_won: f64,
        #[serde(rename = "_pnkWon")]
        pnk_won: f64,
        #[serde(rename = "_caseTitle", skip_serializing_if = "Option::is_none")]
        case_title: Option<String>,
    },
    Lost {
        #[serde(rename = "_disputeID")]
        dispute_id: String,
        #[serde(rename = "_address")]
        address: Address,
        #[serde(rename = "_pnkLost")]
        pnk_lost: f64,
        #[serde(rename = "_caseTitle", skip_serializing_if = "Option::is_none")]
        case_title: Option<String>,
    },
    StakeChanged {
        #[serde(rename = "_address")]
        address: Address,
        #[serde(rename = "_stakesChanged")]
        stakes_changed: Vec<StakeChange>,
    },
}

impl Notification {
    /// The payload's event tag, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::Draw { .. } => "Draw",
            Notification::Vote { .. } => "Vote",
            Notification::VoteReminder { .. } => "VoteReminder",
            Notification::Appeal { .. } => "Appeal",
            Notification::Won { .. } => "Won",
            Notification::Lost { .. } => "Lost",
            Notification::StakeChanged { .. } => "StakeChanged",
        }
    }

    /// The notified address, for logs.
    pub fn recipient(&self) -> Address {
        match self {
            Notification::Draw { address, .. }
            | Notification::Vote { address, .. }
            | Notification::VoteReminder { address, .. }
            | Notification::Appeal { address, .. }
            | Notification::Won { address, .. }
            | Notification::Lost { address, .. }
            | Notification::StakeChanged { address, .. } => *address,
        }
    }
}

/// Delivers payloads to the configured webhook one call at a time, pausing
/// before each delivery to go easy on the sink.
#[derive(Debug, Clone)]
pub struct Notifier {
    http: reqwest::Client,
    webhook_url: Url,
    delay: Duration,
}

impl Notifier {
    pub fn new(webhook_url: Url, delay: Duration) -> Self {
        Self { http: reqwest::Client::new(), webhook_url, delay }
    }

    /// Deliver one payload. Failures are logged with the cycle id and
    /// propagated; the caller decides whether the cycle survives them.
    pub async fn send(&self, ctx: &CycleCtx, notification: &Notification) -> Result<()> {
        tokio::time::sleep(self.delay).await;

        let response = self
            .http
            .post(self.webhook_url.clone())
            .json(notification)
            .send()
            .await
            .with_context(|| {
                format!("[{}] Failed to deliver {} notification", ctx.cycle_id, notification.kind())
            })?;

        if let Err(err) = response.error_for_status_ref() {
            tracing::error!(
                "[{}] Webhook rejected {} notification for {}: {}",
                ctx.cycle_id,
                notification.kind(),
                notification.recipient(),
                err
            );
            return Err(err).context("Webhook rejected notification");
        }

        tracing::info!(
            "[{}] Sent {} notification to {}",
            ctx.cycle_id,
            notification.kind(),
            notification.recipient()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn addr(n: u8) -> Address {
        Address::with_last_byte(n)
    }

    #[test]
    fn draw_payload_shape() {
        let notification = Notification::Draw {
            dispute_id: "88".to_string(),
            appeal: false,
            address: addr(1),
        };

        assert_eq!(
            serde_json::to_value(&notification).unwrap(),
            json!({
                "event": "Draw",
                "_disputeID": "88",
                "_appeal": false,
                "_address": "0x0000000000000000000000000000000000000001",
            })
        );
    }

    #[test]
    fn vote_and_reminder_payload_shapes() {
        let vote = Notification::Vote { dispute_id: "3".to_string(), address: addr(2) };
        assert_eq!(
            serde_json::to_value(&vote).unwrap(),
            json!({
                "event": "Vote",
                "_disputeID": "3",
                "_address": "0x0000000000000000000000000000000000000002",
            })
        );

        let reminder = Notification::VoteReminder { dispute_id: "3".to_string(), address: addr(2) };
        assert_eq!(serde_json::to_value(&reminder).unwrap()["event"], "VoteReminder");
    }

    #[test]
    fn won_payload_includes_title_only_when_present() {
        let with_title = Notification::Won {
            dispute_id: "5".to_string(),
            address: addr(3),
            eth_won: 0.25,
            pnk_won: 1500.0,
            case_title: Some("Escrow case".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&with_title).unwrap(),
            json!({
                "event": "Won",
                "_disputeID": "5",
                "_address": "0x0000000000000000000000000000000000000003",
                "_ethWon": 0.25,
                "_pnkWon": 1500.0,
                "_caseTitle": "Escrow case",
            })
        );

        let untitled = Notification::Lost {
            dispute_id: "5".to_string(),
            address: addr(3),
            pnk_lost: -1000.0,
            case_title: None,
        };
        let value = serde_json::to_value(&untitled).unwrap();
        assert!(value.get("_caseTitle").is_none());
        assert_eq!(value["_pnkLost"], -1000.0);
    }

    #[test]
    fn stake_changed_payload_carries_exact_amount_strings() {
        let notification = Notification::StakeChanged {
            address: addr(4),
            stakes_changed: vec![
                StakeChange {
                    amount: "1000.5".to_string(),
                    subcourt: Some("General Court".to_string()),
                },
                StakeChange { amount: "0".to_string(), subcourt: None },
            ],
        };

        assert_eq!(
            serde_json::to_value(&notification).unwrap(),
            json!({
                "event": "StakeChanged",
                "_address": "0x0000000000000000000000000000000000000004",
                "_stakesChanged": [
                    { "amount": "1000.5", "subcourt": "General Court" },
                    { "amount": "0" },
                ],
            })
        );
    }
}
