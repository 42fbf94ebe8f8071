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

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use court_notifier::{CourtNotifierService, CourtNotifierServiceConfig, Supervisor};
use kleros_court::Deployment;
use url::Url;

/// Arguments for the court notifier.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct CourtNotifierArgs {
    /// URL of the Ethereum RPC endpoint.
    #[clap(short, long, env)]
    rpc_url: Url,

    /// Court deployment to watch. Defaults are resolved from the chain ID.
    #[clap(flatten, next_help_heading = "Court Deployment")]
    deployment: Option<Deployment>,

    /// DB connection string.
    #[clap(long, env = "DATABASE_URL")]
    db: String,

    /// URL receiving every notification payload.
    #[clap(long, env)]
    webhook_url: Url,

    /// Gateway serving content-addressed metadata.
    #[clap(long, env, default_value = "https://ipfs.kleros.io")]
    ipfs_gateway: Url,

    /// Name of the scan state table.
    #[clap(long, env, default_value = "court_scan_state")]
    state_table: String,

    /// Block to start scanning from on a never-seen court (if not set, starts
    /// at the current chain head).
    #[clap(long)]
    start_block: Option<u64>,

    /// Interval in seconds between scan cycles.
    #[clap(long, default_value = "300")]
    interval: u64,

    /// Milliseconds to wait before each webhook delivery.
    #[clap(long, default_value = "1000")]
    notify_delay_ms: u64,

    /// Seconds to wait before restarting a failed scan loop.
    #[clap(long, default_value = "300")]
    restart_backoff: u64,

    /// Whether to restart a failed scan loop instead of exiting.
    #[clap(long, env, default_value_t = false)]
    auto_restart: bool,

    /// Whether to log in JSON format.
    #[clap(long, env, default_value_t = false)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CourtNotifierArgs::parse();

    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        .from_env_lossy();

    if args.log_json {
        tracing_subscriber::fmt().with_ansi(false).json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_ansi(false).with_env_filter(filter).init();
    }

    let config = CourtNotifierServiceConfig {
        interval: Duration::from_secs(args.interval),
        notify_delay: Duration::from_millis(args.notify_delay_ms),
        start_block: args.start_block,
        ipfs_gateway: args.ipfs_gateway,
        webhook_url: args.webhook_url,
        state_table: args.state_table,
    };

    let service = CourtNotifierService::new(args.rpc_url, args.deployment, &args.db, config).await?;

    let mut supervisor =
        Supervisor::new(Duration::from_secs(args.restart_backoff), args.auto_restart);
    supervisor.add_service(service);
    supervisor.run().await
}
