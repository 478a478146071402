//! Completed-order history endpoint
//! `POST /get_orders`: token in, normalized orders (or a JSON error) out.

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::AppState;
use crate::credential::{Credential, CredentialError};
use crate::fetch::{FetchError, PaginationAggregator};
use crate::mapping::{self, MappingError};
use crate::models::NormalizedOrder;
use crate::upstream::{UpstreamConnector, COMPLETED_FOR_REQUESTER};

/// Orchestrates one inbound call: credential, upstream handle, pagination, mapping.
pub struct OrdersService {
    connector: Arc<dyn UpstreamConnector>,
    aggregator: PaginationAggregator,
}

impl OrdersService {
    pub fn new(connector: Arc<dyn UpstreamConnector>, aggregator: PaginationAggregator) -> Self {
        Self {
            connector,
            aggregator,
        }
    }

    pub async fn handle(&self, raw_token: Option<&str>) -> Result<Vec<NormalizedOrder>, OrdersApiError> {
        let credential = Credential::from_raw(raw_token)?;
        info!(token = %credential.redacted(), "📥 Order history requested");

        let source = self
            .connector
            .connect(&credential)
            .map_err(OrdersApiError::Connect)?;

        let records = self
            .aggregator
            .collect(source.as_ref(), COMPLETED_FOR_REQUESTER)
            .await?;

        let orders = mapping::normalize_all(&records)?;
        info!(orders = orders.len(), "✅ Order history served");
        Ok(orders)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OrdersApiError {
    #[error(transparent)]
    Validation(#[from] CredentialError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error("Failed to create upstream client: {0:#}")]
    Connect(anyhow::Error),
    #[error("Order history request crashed: {0}")]
    Crashed(String),
}

impl OrdersApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            OrdersApiError::Validation(_) => StatusCode::BAD_REQUEST,
            OrdersApiError::Fetch(_)
            | OrdersApiError::Mapping(_)
            | OrdersApiError::Connect(_)
            | OrdersApiError::Crashed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for OrdersApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Order history failed: {}", self);
        } else {
            warn!("Order history rejected: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TokenForm {
    pub token: Option<String>,
}

/// Get completed orders - POST /get_orders
///
/// Token comes from the `token` form field, falling back to an
/// `Authorization: Bearer` header. The work runs on its own task so a panic or
/// a long retry window stays confined to this request.
pub async fn post_get_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: Option<Form<TokenForm>>,
) -> Result<Json<Vec<NormalizedOrder>>, OrdersApiError> {
    let token = form
        .and_then(|Form(f)| f.token)
        .or_else(|| bearer_token(&headers));

    let service = state.orders.clone();
    let task = tokio::spawn(async move { service.handle(token.as_deref()).await });

    match task.await {
        Ok(result) => result.map(Json),
        Err(e) => Err(OrdersApiError::Crashed(e.to_string())),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}
