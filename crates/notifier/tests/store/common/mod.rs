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

use std::sync::Arc;

use court_notifier::db::{NotifierDb, NotifierDbObj};
use tempfile::NamedTempFile;
use tracing_subscriber::EnvFilter;

// Court addresses for mainnet and Gnosis
pub const COURT_ADDRESS: &str = "0x988b3A538b618C7A603e1c11Ab82Cd16dbE28069";
pub const GNOSIS_COURT_ADDRESS: &str = "0x9C1dA9A04925bDfDedf0f6421bC7EEa8305F9002";

pub const TABLE: &str = "court_scan_state";

/// Open a fresh state store on a throwaway SQLite file. The temp file must
/// stay alive for as long as the pool does, so it is returned to the caller.
pub async fn setup_test_db(table: &str) -> (NotifierDbObj, NamedTempFile) {
    let _ = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).try_init();

    let temp_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_url = test_db_url(&temp_file);

    tracing::info!("Creating test database at: {}", db_url);

    let db = NotifierDb::new(&db_url, table).await.expect("Failed to create database");
    (Arc::new(db), temp_file)
}

/// Connection string for the given temp file, usable for reconnecting to the
/// same store.
pub fn test_db_url(temp_file: &NamedTempFile) -> String {
    let db_path = temp_file.path().to_str().expect("Invalid temp path");
    format!("sqlite:{}", db_path)
}
