//! Wallet P2P REST API client
//!
//! One shared connection pool; the caller's token is attached per request so
//! no credential outlives the request that supplied it.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{FetchRequest, Page, TradeHistorySource, UpstreamConnector};
use crate::credential::Credential;
use crate::models::OrderRecord;

pub const WALLET_API_BASE: &str = "https://walletbot.me";
const ORDER_HISTORY_PATH: &str = "/p2p/public-api/v2/offer/order/history/get-by-user-id";

/// Builds per-request [`WalletRestClient`]s on top of one pooled HTTP client.
#[derive(Clone)]
pub struct WalletConnector {
    client: Client,
    base_url: String,
}

impl WalletConnector {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .context("Failed to build wallet HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

impl UpstreamConnector for WalletConnector {
    fn connect(&self, credential: &Credential) -> Result<Arc<dyn TradeHistorySource>> {
        Ok(Arc::new(WalletRestClient::new(
            self.client.clone(),
            &self.base_url,
            credential,
        )?))
    }
}

/// Wallet API handle authenticated as a single caller.
#[derive(Clone)]
pub struct WalletRestClient {
    client: Client,
    base_url: String,
    authorization: HeaderValue,
}

impl WalletRestClient {
    pub fn new(client: Client, base_url: &str, credential: &Credential) -> Result<Self> {
        let mut authorization =
            HeaderValue::from_str(credential.expose()).context("Invalid wallet token")?;
        authorization.set_sensitive(true);

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            authorization,
        })
    }

    #[inline]
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl TradeHistorySource for WalletRestClient {
    async fn order_history(&self, request: &FetchRequest) -> Result<Page> {
        let url = self.url(ORDER_HISTORY_PATH);
        let body = OrderHistoryQuery {
            offset: request.offset,
            limit: request.limit,
            filter: StatusFilter {
                status: &request.status_filter,
            },
        };

        let resp = self
            .client
            .post(url)
            .header(AUTHORIZATION, self.authorization.clone())
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .context("POST order history failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("POST order history {}: {}", status, text));
        }

        let envelope = resp
            .json::<OrderHistoryEnvelope>()
            .await
            .context("Failed to parse order history response")?;

        let page = envelope.into_page()?;
        debug!(
            offset = request.offset,
            limit = request.limit,
            records = page.len(),
            "Wallet order history page"
        );
        Ok(page)
    }
}

#[derive(Debug, Serialize)]
struct OrderHistoryQuery<'a> {
    offset: u32,
    limit: u32,
    filter: StatusFilter<'a>,
}

#[derive(Debug, Serialize)]
struct StatusFilter<'a> {
    status: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderHistoryEnvelope {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    data: Option<Vec<OrderRecord>>,
}

impl OrderHistoryEnvelope {
    fn into_page(self) -> Result<Page> {
        match self.status.as_deref() {
            None | Some("SUCCESS") => Ok(self.data.unwrap_or_default()),
            Some(other) => Err(anyhow!(
                "Order history returned status {} ({})",
                other,
                self.error_code.as_deref().unwrap_or("no error code")
            )),
        }
    }
}
