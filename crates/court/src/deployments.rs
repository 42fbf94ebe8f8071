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

use alloy::primitives::{address, Address};
use clap::Args;
use derive_builder::Builder;

pub use alloy_chains::NamedChain;

/// Configuration for a deployment of the Kleros court.
// NOTE: See https://github.com/clap-rs/clap/issues/5092#issuecomment-1703980717 about clap usage.
#[non_exhaustive]
#[derive(Clone, Debug, Builder, Args)]
#[group(requires = "court_address", requires = "policy_registry_address")]
pub struct Deployment {
    /// EIP-155 chain ID of the network.
    #[clap(long, env)]
    #[builder(setter(into, strip_option), default)]
    pub chain_id: Option<u64>,

    /// Address of the [IKlerosLiquid] arbitrator contract.
    ///
    /// [IKlerosLiquid]: crate::contracts::IKlerosLiquid
    #[clap(long, env, required = false, long_help = "Address of the KlerosLiquid contract")]
    #[builder(setter(into))]
    pub court_address: Address,

    /// Address of the [IPolicyRegistry] contract.
    ///
    /// [IPolicyRegistry]: crate::contracts::IPolicyRegistry
    #[clap(long, env, required = false, long_help = "Address of the PolicyRegistry contract")]
    #[builder(setter(into))]
    pub policy_registry_address: Address,
}

impl Deployment {
    /// Create a new [DeploymentBuilder].
    pub fn builder() -> DeploymentBuilder {
        Default::default()
    }

    /// Lookup the [Deployment] for a named chain.
    pub const fn from_chain(chain: NamedChain) -> Option<Deployment> {
        match chain {
            NamedChain::Mainnet => Some(MAINNET),
            NamedChain::Gnosis => Some(GNOSIS),
            _ => None,
        }
    }

    /// Lookup the [Deployment] by chain ID.
    pub fn from_chain_id(chain_id: impl Into<u64>) -> Option<Deployment> {
        let chain = NamedChain::try_from(chain_id.into()).ok()?;
        Self::from_chain(chain)
    }
}

/// [Deployment] for the Ethereum mainnet.
pub const MAINNET: Deployment = Deployment {
    chain_id: Some(NamedChain::Mainnet as u64),
    court_address: address!("0x988b3A538b618C7A603e1c11Ab82Cd16dbE28069"),
    policy_registry_address: address!("0xCf1f07713d5193FaE5c1653C9f61953D048BECe4"),
};

/// [Deployment] for the Gnosis chain.
pub const GNOSIS: Deployment = Deployment {
    chain_id: Some(NamedChain::Gnosis as u64),
    court_address: address!("0x9C1dA9A04925bDfDedf0f6421bC7EEa8305F9002"),
    policy_registry_address: address!("0x9d494768936b6bDaabc46733b8D53A937A6c6D7e"),
};
