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

use std::{collections::BTreeSet, sync::Arc};

use alloy::primitives::{Address, U256};
use court_notifier::db::{DbError, NotifierDb, NotifierDbObj};

use super::common;

fn court() -> Address {
    common::COURT_ADDRESS.parse().expect("Invalid court address")
}

fn gnosis_court() -> Address {
    common::GNOSIS_COURT_ADDRESS.parse().expect("Invalid court address")
}

#[tokio::test]
async fn test_fresh_store_has_no_state() {
    let (db, _temp_file) = common::setup_test_db(common::TABLE).await;

    let state = db.get_state(court()).await.expect("Failed to query state");
    assert!(state.is_none());
}

#[tokio::test]
async fn test_init_state_starts_cursor_with_empty_dispute_set() {
    let (db, _temp_file) = common::setup_test_db(common::TABLE).await;

    db.init_state(court(), 1234).await.expect("Failed to init state");

    let state = db.get_state(court()).await.expect("Failed to query state").expect("No state");
    assert_eq!(state.last_block, 1234);
    assert!(state.voting_disputes.is_empty());
}

#[tokio::test]
async fn test_init_state_keeps_existing_cursor() {
    let (db, _temp_file) = common::setup_test_db(common::TABLE).await;

    db.init_state(court(), 100).await.expect("Failed to init state");
    db.init_state(court(), 999).await.expect("Failed to re-init state");

    let state = db.get_state(court()).await.expect("Failed to query state").expect("No state");
    assert_eq!(state.last_block, 100);
}

#[tokio::test]
async fn test_cursor_survives_reconnect() {
    let (db, temp_file) = common::setup_test_db(common::TABLE).await;

    db.init_state(court(), 100).await.expect("Failed to init state");
    db.set_last_block(court(), 5001).await.expect("Failed to set last block");
    drop(db);

    let reopened: NotifierDbObj = Arc::new(
        NotifierDb::new(&common::test_db_url(&temp_file), common::TABLE)
            .await
            .expect("Failed to reopen database"),
    );
    let state =
        reopened.get_state(court()).await.expect("Failed to query state").expect("No state");
    assert_eq!(state.last_block, 5001);
    assert!(state.voting_disputes.is_empty());
}

#[tokio::test]
async fn test_voting_dispute_set_round_trips() {
    let (db, _temp_file) = common::setup_test_db(common::TABLE).await;
    db.init_state(court(), 100).await.expect("Failed to init state");

    let disputes: BTreeSet<U256> =
        [U256::from(3), U256::from(7), U256::from(1042)].into_iter().collect();
    db.set_voting_disputes(court(), &disputes).await.expect("Failed to set disputes");

    let state = db.get_state(court()).await.expect("Failed to query state").expect("No state");
    assert_eq!(state.voting_disputes, disputes);

    // A later write replaces the set instead of merging into it.
    let smaller: BTreeSet<U256> = [U256::from(7)].into_iter().collect();
    db.set_voting_disputes(court(), &smaller).await.expect("Failed to overwrite disputes");

    let state = db.get_state(court()).await.expect("Failed to query state").expect("No state");
    assert_eq!(state.voting_disputes, smaller);
}

#[tokio::test]
async fn test_update_on_unknown_court_fails() {
    let (db, _temp_file) = common::setup_test_db(common::TABLE).await;

    let err = db.set_last_block(court(), 42).await.expect_err("Update should fail");
    assert!(matches!(err, DbError::SetBlockFail));

    let err = db
        .set_voting_disputes(court(), &BTreeSet::new())
        .await
        .expect_err("Update should fail");
    assert!(matches!(err, DbError::SetDisputesFail));
}

#[tokio::test]
async fn test_courts_are_isolated() {
    let (db, _temp_file) = common::setup_test_db(common::TABLE).await;

    db.init_state(court(), 100).await.expect("Failed to init mainnet court");
    db.init_state(gnosis_court(), 200).await.expect("Failed to init gnosis court");

    let disputes: BTreeSet<U256> = [U256::from(9)].into_iter().collect();
    db.set_voting_disputes(court(), &disputes).await.expect("Failed to set disputes");
    db.set_last_block(gnosis_court(), 777).await.expect("Failed to set last block");

    let mainnet = db.get_state(court()).await.expect("Failed to query state").expect("No state");
    assert_eq!(mainnet.last_block, 100);
    assert_eq!(mainnet.voting_disputes, disputes);

    let gnosis =
        db.get_state(gnosis_court()).await.expect("Failed to query state").expect("No state");
    assert_eq!(gnosis.last_block, 777);
    assert!(gnosis.voting_disputes.is_empty());
}
