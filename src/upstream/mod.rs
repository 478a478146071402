//! Upstream trade-history collaborator
//!
//! The fetch engine only talks to these traits. [`wallet_rest`] is the
//! production implementation; tests plug in scripted sources.

pub mod wallet_rest;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::credential::Credential;
use crate::models::OrderRecord;

pub use wallet_rest::{WalletConnector, WalletRestClient};

/// Completed trades where the caller was the requesting side.
pub const COMPLETED_FOR_REQUESTER: &str = "COMPLETED_FOR_REQUESTER";

/// One offset/limit window of order history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub offset: u32,
    pub limit: u32,
    pub status_filter: String,
}

/// Records from a single upstream call. Empty means no more data.
pub type Page = Vec<OrderRecord>;

#[async_trait]
pub trait TradeHistorySource: Send + Sync {
    async fn order_history(&self, request: &FetchRequest) -> Result<Page>;
}

/// Materializes an authenticated source for one caller's credential.
pub trait UpstreamConnector: Send + Sync {
    fn connect(&self, credential: &Credential) -> Result<Arc<dyn TradeHistorySource>>;
}
