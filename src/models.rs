//! Trade history data model
//!
//! `OrderRecord` mirrors what the Wallet P2P API sends; `NormalizedOrder` is the
//! shape returned to our callers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Monetary amount as delivered upstream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    #[serde(default, rename = "amount")]
    pub value: Option<Decimal>,
    #[serde(default)]
    pub currency_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    #[serde(default, deserialize_with = "string_or_number")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentMethod {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
}

/// One completed P2P order, exactly as the upstream reports it.
///
/// Every field is optional at this layer; the mapper decides which absences
/// are malformed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub amount: Option<Money>,
    #[serde(default)]
    pub volume: Option<Money>,
    #[serde(default)]
    pub buyer: Option<Participant>,
    #[serde(default)]
    pub seller: Option<Participant>,
    #[serde(default)]
    pub payment_details: Option<PaymentDetails>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "statusUpdateDateTime")]
    pub status_update_time: Option<String>,
}

impl OrderRecord {
    pub fn buyer_id(&self) -> Option<&str> {
        self.buyer.as_ref()?.user_id.as_deref()
    }

    pub fn seller_id(&self) -> Option<&str> {
        self.seller.as_ref()?.user_id.as_deref()
    }

    pub fn payment_method(&self) -> Option<&str> {
        self.payment_details
            .as_ref()?
            .payment_method
            .as_ref()?
            .name
            .as_deref()
    }
}

/// Amount/volume on the wire. Both fields are always present, possibly null.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MoneyView {
    pub value: Option<Decimal>,
    pub currency_code: Option<String>,
}

impl From<Option<&Money>> for MoneyView {
    fn from(money: Option<&Money>) -> Self {
        match money {
            Some(m) => Self {
                value: m.value,
                currency_code: m.currency_code.clone(),
            },
            None => Self::default(),
        }
    }
}

/// Response record for `POST /get_orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedOrder {
    pub order_id: String,
    pub amount: MoneyView,
    pub volume: MoneyView,
    pub buyer_id: Option<String>,
    pub seller_id: Option<String>,
    pub payment_method: Option<String>,
    pub status: String,
    pub status_update_time: DateTime<Utc>,
}

/// Upstream ids come as JSON strings or numbers depending on the endpoint version.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}
