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

//! Resolution of human-readable metadata: subcourt names from the policy
//! registry and case titles from dispute meta-evidence.

use alloy::{
    primitives::{Address, B256, U256},
    providers::Provider,
    rpc::types::{BlockNumberOrTag, Filter},
    sol_types::SolEvent,
};
use anyhow::{bail, Context, Result};
use kleros_court::contracts::{IArbitrable, IPolicyRegistry};
use url::Url;

/// Fetches JSON documents referenced on-chain by URI. Content-addressed
/// `/ipfs/` paths are served through the configured gateway.
#[derive(Debug, Clone)]
pub struct MetadataClient {
    http: reqwest::Client,
    gateway: Url,
}

impl MetadataClient {
    pub fn new(gateway: Url) -> Self {
        Self { http: reqwest::Client::new(), gateway }
    }

    fn resolve_uri(&self, uri: &str) -> Result<Url> {
        if uri.starts_with("/ipfs/") {
            self.gateway.join(uri).with_context(|| format!("Invalid content path: {}", uri))
        } else {
            Url::parse(uri).with_context(|| format!("Invalid metadata URI: {}", uri))
        }
    }

    async fn fetch_json(&self, url: Url) -> Result<serde_json::Value> {
        self.http
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?
            .error_for_status()
            .with_context(|| format!("Metadata request rejected: {}", url))?
            .json::<serde_json::Value>()
            .await
            .with_context(|| format!("Metadata at {} is not valid JSON", url))
    }

    /// Look up a subcourt's display name through its policy document, or
    /// `None` when the policy carries no name.
    pub async fn subcourt_name<P: Provider>(
        &self,
        provider: &P,
        policy_registry: Address,
        subcourt_id: U256,
    ) -> Result<Option<String>> {
        let registry = IPolicyRegistry::new(policy_registry, provider);
        let uri = registry
            .policies(subcourt_id)
            .call()
            .await
            .with_context(|| format!("Failed to get policy of subcourt {}", subcourt_id))?;

        let policy = self.fetch_json(self.resolve_uri(&uri)?).await?;
        Ok(policy.get("name").and_then(|name| name.as_str()).map(String::from))
    }

    /// Look up the case title of a dispute from the meta-evidence its
    /// arbitrable contract published at dispute creation. Fails when the
    /// arbitrable never emitted the linking events; yields `None` when the
    /// meta-evidence simply has no title field.
    pub async fn case_title<P: Provider>(
        &self,
        provider: &P,
        court: Address,
        arbitrable: Address,
        dispute_id: U256,
    ) -> Result<Option<String>> {
        let dispute_filter = Filter::new()
            .address(arbitrable)
            .event_signature(IArbitrable::Dispute::SIGNATURE_HASH)
            .topic1(court.into_word())
            .topic2(B256::from(dispute_id))
            .from_block(BlockNumberOrTag::Earliest)
            .to_block(BlockNumberOrTag::Latest);

        let dispute_logs = provider
            .get_logs(&dispute_filter)
            .await
            .with_context(|| format!("Failed to get dispute creation event from {}", arbitrable))?;
        let Some(dispute_log) = dispute_logs.first() else {
            bail!("Arbitrable {} never created dispute {}", arbitrable, dispute_id);
        };
        let meta_evidence_id = dispute_log
            .log_decode::<IArbitrable::Dispute>()
            .context("failed to decode dispute creation event")?
            .inner
            .data
            ._metaEvidenceID;

        let meta_filter = Filter::new()
            .address(arbitrable)
            .event_signature(IArbitrable::MetaEvidence::SIGNATURE_HASH)
            .topic1(B256::from(meta_evidence_id))
            .from_block(BlockNumberOrTag::Earliest)
            .to_block(BlockNumberOrTag::Latest);

        let meta_logs = provider
            .get_logs(&meta_filter)
            .await
            .with_context(|| format!("Failed to get meta-evidence events from {}", arbitrable))?;
        let Some(meta_log) = meta_logs.first() else {
            bail!("Arbitrable {} has no meta-evidence {}", arbitrable, meta_evidence_id);
        };
        let uri = meta_log
            .log_decode::<IArbitrable::MetaEvidence>()
            .context("failed to decode meta-evidence event")?
            .inner
            .data
            ._evidence;

        let meta_evidence = self.fetch_json(self.resolve_uri(&uri)?).await?;
        Ok(meta_evidence.get("title").and_then(|title| title.as_str()).map(String::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> MetadataClient {
        MetadataClient::new(Url::parse("https://ipfs.kleros.io").unwrap())
    }

    #[test]
    fn content_paths_resolve_through_gateway() {
        let url = client().resolve_uri("/ipfs/QmYpKK893ySLDD").unwrap();
        assert_eq!(url.as_str(), "https://ipfs.kleros.io/ipfs/QmYpKK893ySLDD");
    }

    #[test]
    fn absolute_uris_pass_through() {
        let url = client().resolve_uri("https://example.com/policy.json").unwrap();
        assert_eq!(url.as_str(), "https://example.com/policy.json");
    }

    #[test]
    fn relative_garbage_is_rejected() {
        assert!(client().resolve_uri("ipfs/QmMissingSlash").is_err());
        assert!(client().resolve_uri("").is_err());
    }
}
