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

//! Durable per-court scan state: last scanned block and the set of disputes
//! currently in their voting window.

use std::{collections::BTreeSet, str::FromStr, sync::Arc};

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{any::AnyPoolOptions, AnyPool, Row};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQL error {0:?}")]
    SqlErr(#[from] sqlx::Error),

    #[error("Invalid state table name: {0}")]
    BadTableName(String),

    #[error("Invalid block number: {0}")]
    BadBlockNumb(String),

    #[error("Invalid voting dispute set: {0}")]
    BadDisputeSet(String),

    #[error("Failed to set last scanned block")]
    SetBlockFail,

    #[error("Failed to set voting disputes")]
    SetDisputesFail,
}

/// Persisted scan state for one court address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanState {
    /// Next block to scan from.
    pub last_block: u64,
    /// Disputes believed to be in their voting period.
    pub voting_disputes: BTreeSet<U256>,
}

pub type NotifierDbObj = Arc<dyn CourtNotifierDb + Send + Sync>;

#[async_trait]
pub trait CourtNotifierDb {
    /// Fetch the persisted scan state for a court, if any.
    async fn get_state(&self, court: Address) -> Result<Option<ScanState>, DbError>;

    /// Create the scan state row for a never-seen court with an empty dispute set.
    async fn init_state(&self, court: Address, start_block: u64) -> Result<(), DbError>;

    /// Persist the scan cursor for a court.
    async fn set_last_block(&self, court: Address, block: u64) -> Result<(), DbError>;

    /// Persist the set of disputes currently in their voting window.
    async fn set_voting_disputes(
        &self,
        court: Address,
        disputes: &BTreeSet<U256>,
    ) -> Result<(), DbError>;
}

/// Dispute ids are stored as a JSON array of decimal strings so the same
/// column works across database backends.
fn encode_disputes(disputes: &BTreeSet<U256>) -> Result<String, DbError> {
    let ids: Vec<String> = disputes.iter().map(|id| id.to_string()).collect();
    serde_json::to_string(&ids).map_err(|e| DbError::BadDisputeSet(e.to_string()))
}

fn decode_disputes(raw: &str) -> Result<BTreeSet<U256>, DbError> {
    let ids: Vec<String> =
        serde_json::from_str(raw).map_err(|e| DbError::BadDisputeSet(e.to_string()))?;
    ids.iter()
        .map(|id| {
            U256::from_str(id).map_err(|e| DbError::BadDisputeSet(format!("{}: {}", id, e)))
        })
        .collect()
}

/// The table name is interpolated into queries, so only identifier characters
/// are accepted.
fn validate_table(name: &str) -> Result<(), DbError> {
    let mut chars = name.chars();
    let head_ok = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if head_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(DbError::BadTableName(name.to_string()))
    }
}

pub struct NotifierDb {
    pool: AnyPool,
    table: String,
}

impl NotifierDb {
    pub async fn new(database_url: &str, table: &str) -> Result<Self, DbError> {
        validate_table(table)?;
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new().max_connections(20).connect(database_url).await?;

        let ddl = format!(
            r#"CREATE TABLE IF NOT EXISTS {} (
                court_address TEXT PRIMARY KEY,
                last_block BIGINT NOT NULL,
                voting_disputes TEXT NOT NULL,
                updated_at TEXT
            )"#,
            table
        );
        sqlx::query(&ddl).execute(&pool).await?;

        Ok(Self { pool, table: table.to_string() })
    }
}

#[async_trait]
impl CourtNotifierDb for NotifierDb {
    async fn get_state(&self, court: Address) -> Result<Option<ScanState>, DbError> {
        let query = format!(
            "SELECT last_block, voting_disputes FROM {} WHERE court_address = $1",
            self.table
        );

        let row = sqlx::query(&query)
            .bind(format!("{:#x}", court))
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let raw_block = row.get::<i64, _>("last_block");
        let last_block = u64::try_from(raw_block)
            .map_err(|_| DbError::BadBlockNumb(raw_block.to_string()))?;
        let voting_disputes = decode_disputes(&row.get::<String, _>("voting_disputes"))?;

        Ok(Some(ScanState { last_block, voting_disputes }))
    }

    async fn init_state(&self, court: Address, start_block: u64) -> Result<(), DbError> {
        let query = format!(
            r#"INSERT INTO {} (court_address, last_block, voting_disputes, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (court_address) DO NOTHING"#,
            self.table
        );

        sqlx::query(&query)
            .bind(format!("{:#x}", court))
            .bind(start_block as i64)
            .bind(encode_disputes(&BTreeSet::new())?)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn set_last_block(&self, court: Address, block: u64) -> Result<(), DbError> {
        let query = format!(
            "UPDATE {} SET last_block = $1, updated_at = $2 WHERE court_address = $3",
            self.table
        );

        let res = sqlx::query(&query)
            .bind(block as i64)
            .bind(Utc::now().to_rfc3339())
            .bind(format!("{:#x}", court))
            .execute(&self.pool)
            .await?;

        if res.rows_affected() == 0 {
            return Err(DbError::SetBlockFail);
        }
        Ok(())
    }

    async fn set_voting_disputes(
        &self,
        court: Address,
        disputes: &BTreeSet<U256>,
    ) -> Result<(), DbError> {
        let query = format!(
            "UPDATE {} SET voting_disputes = $1, updated_at = $2 WHERE court_address = $3",
            self.table
        );

        let res = sqlx::query(&query)
            .bind(encode_disputes(disputes)?)
            .bind(Utc::now().to_rfc3339())
            .bind(format!("{:#x}", court))
            .execute(&self.pool)
            .await?;

        if res.rows_affected() == 0 {
            return Err(DbError::SetDisputesFail);
        }
        Ok(())
    }
}
