pub mod orders;

use std::sync::Arc;

pub use orders::{post_get_orders, OrdersApiError, OrdersService};

/// Application state shared across request handlers
#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<OrdersService>,
}

impl AppState {
    pub fn new(orders: OrdersService) -> Self {
        Self {
            orders: Arc::new(orders),
        }
    }
}

pub async fn health_check() -> &'static str {
    "🚀 P2P history backend operational"
}
