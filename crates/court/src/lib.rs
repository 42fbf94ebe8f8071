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

//! Contract bindings, deployments and chain primitives for the Kleros court.

use alloy::primitives::{utils::format_units, I256, U256};
use anyhow::Result;

pub mod contracts;
pub mod deployments;

pub use deployments::{Deployment, NamedChain, GNOSIS, MAINNET};

/// Lifecycle period of a dispute. The arbitrator reports periods as their
/// ordinal; the order is fixed and disputes never skip backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Period {
    /// Evidence can be submitted.
    Evidence = 0,
    /// Jurors commit a hashed vote.
    Commit = 1,
    /// Jurors reveal or cast their vote.
    Vote = 2,
    /// The ruling can be appealed.
    Appeal = 3,
    /// Tokens are redistributed and the ruling is executed.
    Execution = 4,
}

/// Error for a period ordinal outside the known range.
#[derive(Debug, thiserror::Error)]
#[error("unknown dispute period: {0}")]
pub struct InvalidPeriod(pub u8);

impl TryFrom<u8> for Period {
    type Error = InvalidPeriod;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Period::Evidence),
            1 => Ok(Period::Commit),
            2 => Ok(Period::Vote),
            3 => Ok(Period::Appeal),
            4 => Ok(Period::Execution),
            other => Err(InvalidPeriod(other)),
        }
    }
}

/// Convert a wei amount to a decimal ether string with trailing zeros trimmed,
/// e.g. `1500000000000000000` becomes `"1.5"` and `0` becomes `"0"`.
pub fn from_wei(value: U256) -> Result<String> {
    let units = format_units(value, "ether")?;
    Ok(units.trim_end_matches('0').trim_end_matches('.').to_string())
}

/// Convert a signed wei amount to an ether value as `f64`. Loses precision
/// beyond ~15 significant digits, which is acceptable for display amounts.
pub fn from_wei_f64(value: I256) -> Result<f64> {
    let units = format_units(value, "ether")?;
    Ok(units.parse::<f64>()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_from_ordinal() {
        assert_eq!(Period::try_from(0).unwrap(), Period::Evidence);
        assert_eq!(Period::try_from(2).unwrap(), Period::Vote);
        assert_eq!(Period::try_from(3).unwrap(), Period::Appeal);
        assert_eq!(Period::try_from(4).unwrap(), Period::Execution);
        assert!(Period::try_from(5).is_err());
    }

    #[test]
    fn from_wei_trims_trailing_zeros() {
        let eth = U256::from(10).pow(U256::from(18));
        assert_eq!(from_wei(eth + eth / U256::from(2)).unwrap(), "1.5");
        assert_eq!(from_wei(eth * U256::from(700_000)).unwrap(), "700000");
        assert_eq!(from_wei(U256::ZERO).unwrap(), "0");
        // 1 wei keeps full precision
        assert_eq!(from_wei(U256::from(1)).unwrap(), "0.000000000000000001");
    }

    #[test]
    fn from_wei_f64_keeps_sign() {
        let eth = I256::try_from(10).unwrap().pow(U256::from(18));
        assert_eq!(from_wei_f64(eth * I256::try_from(3).unwrap()).unwrap(), 3.0);
        assert_eq!(from_wei_f64(-eth / I256::try_from(2).unwrap()).unwrap(), -0.5);
    }
}
