//! Projection of upstream order records into the response shape.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::models::{MoneyView, NormalizedOrder, OrderRecord};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MappingError {
    #[error("Malformed upstream order at position {position}: missing `{field}`")]
    MissingField {
        position: usize,
        field: &'static str,
    },
    #[error("Malformed upstream order {order_id}: unparseable statusUpdateDateTime `{raw}`")]
    BadTimestamp { order_id: String, raw: String },
}

pub fn normalize_all(records: &[OrderRecord]) -> Result<Vec<NormalizedOrder>, MappingError> {
    records
        .iter()
        .enumerate()
        .map(|(position, record)| normalize(position, record))
        .collect()
}

pub fn normalize(position: usize, record: &OrderRecord) -> Result<NormalizedOrder, MappingError> {
    let missing = |field| MappingError::MissingField { position, field };

    let order_id = record.id.clone().ok_or_else(|| missing("id"))?;
    let status = record.status.clone().ok_or_else(|| missing("status"))?;
    let raw_time = record
        .status_update_time
        .as_deref()
        .ok_or_else(|| missing("statusUpdateDateTime"))?;
    let status_update_time =
        parse_timestamp(raw_time).ok_or_else(|| MappingError::BadTimestamp {
            order_id: order_id.clone(),
            raw: raw_time.to_string(),
        })?;

    Ok(NormalizedOrder {
        order_id,
        amount: MoneyView::from(record.amount.as_ref()),
        volume: MoneyView::from(record.volume.as_ref()),
        buyer_id: record.buyer_id().map(str::to_string),
        seller_id: record.seller_id().map(str::to_string),
        payment_method: record.payment_method().map(str::to_string),
        status,
        status_update_time,
    })
}

/// RFC 3339, ISO 8601 with a colon-less offset (`+0300`), or a zone-less
/// ISO timestamp which the upstream reports in UTC. Always rendered as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
