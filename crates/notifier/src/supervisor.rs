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

//! Supervision of per-court scan loops.
//!
//! Each registered [`CourtNotifierService`] runs in its own task. A loop
//! failure either takes the whole supervisor down or, with auto-restart on,
//! waits out a backoff pause and runs the loop again while the failure stays
//! visible on the status board.

use std::{collections::HashMap, sync::Arc};

use alloy::primitives::Address;
use anyhow::{bail, Result};
use tokio::{sync::Mutex, task::JoinSet, time::Duration};

use crate::service::CourtNotifierService;

/// Health of one supervised court loop.
#[derive(Clone, Debug, Default)]
pub struct CourtStatus {
    /// Times the loop was restarted after a failure.
    pub restarts: u64,
    /// Message of the most recent failure, if any.
    pub last_error: Option<String>,
}

/// Shared per-court health, keyed by court address.
pub type StatusBoard = Arc<Mutex<HashMap<Address, CourtStatus>>>;

pub struct Supervisor {
    services: Vec<CourtNotifierService>,
    restart_backoff: Duration,
    auto_restart: bool,
    status: StatusBoard,
}

impl Supervisor {
    pub fn new(restart_backoff: Duration, auto_restart: bool) -> Self {
        Self {
            services: Vec::new(),
            restart_backoff,
            auto_restart,
            status: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register a court scan loop to supervise.
    pub fn add_service(&mut self, service: CourtNotifierService) {
        self.services.push(service);
    }

    /// Shared view of per-court restart counts and last errors.
    pub fn status(&self) -> StatusBoard {
        self.status.clone()
    }

    /// Spawn one task per registered court and run them until the first
    /// unrecovered failure or panic.
    pub async fn run(self) -> Result<()> {
        if self.services.is_empty() {
            bail!("No court scan loops registered");
        }

        let mut tasks = JoinSet::new();
        for service in self.services {
            let status = self.status.clone();
            let backoff = self.restart_backoff;
            let auto_restart = self.auto_restart;
            tasks.spawn(run_court_loop(service, status, backoff, auto_restart));
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => bail!("A court scan loop stopped unexpectedly"),
                Ok(Err(err)) => return Err(err),
                Err(join_err) => bail!("A court scan loop panicked: {join_err}"),
            }
        }
        Ok(())
    }
}

async fn run_court_loop(
    service: CourtNotifierService,
    status: StatusBoard,
    restart_backoff: Duration,
    auto_restart: bool,
) -> Result<()> {
    let court = service.court_address();
    let interval = service.interval();
    status.lock().await.entry(court).or_default();

    loop {
        match service.run().await {
            Ok(()) => {
                tokio::time::sleep(interval).await;
            }
            Err(err) => {
                tracing::error!("Scan loop for court {:#x} failed: {:?}", court, err);
                {
                    let mut board = status.lock().await;
                    let entry = board.entry(court).or_default();
                    entry.last_error = Some(format!("{err:#}"));
                    if auto_restart {
                        entry.restarts += 1;
                    }
                }
                if !auto_restart {
                    return Err(err.context(format!("Scan loop for court {court:#x} failed")));
                }
                tracing::info!(
                    "Restarting scan loop for court {:#x} in {}s",
                    court,
                    restart_backoff.as_secs()
                );
                tokio::time::sleep(restart_backoff).await;
            }
        }
    }
}
