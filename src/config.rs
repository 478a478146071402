//! Process configuration: command-line flags with environment fallbacks.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::fetch::{AggregationLimits, PageFetcher, PaginationAggregator, RetryPolicy};
use crate::supervisor::FixedDelay;
use crate::upstream::{wallet_rest::WALLET_API_BASE, WalletConnector};

#[derive(Parser, Debug, Clone)]
#[command(name = "p2p-history")]
#[command(about = "Serves completed P2P order history from the Wallet API")]
pub struct Args {
    /// Listen address
    #[arg(long, env = "P2P_HISTORY_BIND", default_value = "0.0.0.0:9000")]
    pub bind: String,

    /// Wallet API base URL
    #[arg(long, env = "WALLET_API_BASE_URL", default_value = WALLET_API_BASE)]
    pub upstream_base_url: String,

    /// Transport timeout for a single upstream attempt, in seconds
    #[arg(long, env = "WALLET_API_TIMEOUT_SECS", default_value = "10")]
    pub upstream_timeout_secs: u64,

    /// Records requested per upstream page
    #[arg(long, env = "P2P_HISTORY_PAGE_LIMIT", default_value = "100")]
    pub page_limit: u32,

    /// Maximum records returned per request
    #[arg(long, env = "P2P_HISTORY_RESULT_CAP", default_value = "500")]
    pub result_cap: usize,

    /// Wait between failed page attempts, in milliseconds
    #[arg(long, env = "P2P_HISTORY_RETRY_INTERVAL_MS", default_value = "1000")]
    pub retry_interval_ms: u64,

    /// Time a single page may spend retrying, in seconds
    #[arg(long, env = "P2P_HISTORY_RETRY_BUDGET_SECS", default_value = "30")]
    pub retry_budget_secs: u64,

    /// Delay before restarting a crashed server, in seconds
    #[arg(long, env = "P2P_HISTORY_RESTART_DELAY_SECS", default_value = "5")]
    pub restart_delay_secs: u64,

    /// Stale token file removed on every (re)start
    #[arg(long, env = "P2P_HISTORY_LEGACY_TOKEN_PATH", default_value = "token.txt")]
    pub legacy_token_path: PathBuf,
}

impl Args {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            interval: Duration::from_millis(self.retry_interval_ms),
            budget: Duration::from_secs(self.retry_budget_secs),
        }
    }

    pub fn aggregator(&self) -> Result<PaginationAggregator> {
        let limits = AggregationLimits::new(self.page_limit, self.result_cap)
            .context("Invalid pagination settings")?;
        Ok(PaginationAggregator::new(
            PageFetcher::new(self.retry_policy()),
            limits,
        ))
    }

    pub fn connector(&self) -> Result<WalletConnector> {
        WalletConnector::new(
            self.upstream_base_url.clone(),
            Duration::from_secs(self.upstream_timeout_secs),
        )
    }

    pub fn restart_policy(&self) -> FixedDelay {
        FixedDelay::new(Duration::from_secs(self.restart_delay_secs))
    }
}

/// Load `.env` from the working directory (and parents), then from the crate root.
pub fn load_env() {
    let _ = dotenv::dotenv();

    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}
