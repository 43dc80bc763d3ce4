use core::fmt;
use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use serde::{Deserialize, Serialize};
use ulid::Ulid;
use utoipa::ToSchema;

/// Flash Sale Status Enum
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Upcoming,
    Active,
    Ended,
}

impl From<SaleStatus> for AttributeValue {
    fn from(value: SaleStatus) -> Self {
        AttributeValue::S(value.to_string())
    }
}

impl Default for SaleStatus {
    fn default() -> Self {
        Self::Upcoming
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let out = match *self {
            SaleStatus::Upcoming => "upcoming",
            SaleStatus::Active => "active",
            SaleStatus::Ended => "ended",
        };
        write!(f, "{}", out)
    }
}

/// Status derived from the wall clock and the sale window. Only evaluated on
/// write paths; a sale whose window has elapsed keeps its last stored status
/// until the next update touches it.
pub fn derive_status(now: u64, start_time: u64, end_time: u64) -> SaleStatus {
    if now < start_time {
        SaleStatus::Upcoming
    } else if now > end_time {
        SaleStatus::Ended
    } else {
        SaleStatus::Active
    }
}

#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlashSale {
    /// Ulid, hash key
    pub id: Ulid,
    /// Create time, in unix timestamp millis
    pub create_at: u64,
    /// Campaign name
    pub name: String,
    /// Window start, unix timestamp millis
    pub start_time: u64,
    /// Window end, unix timestamp millis
    pub end_time: u64,
    /// Stored status, recomputed on every write touching the window
    pub status: SaleStatus,
    /// Optional cap on units a single user may buy across the sale
    pub max_quantity_per_user: Option<u32>,
    /// Optional minimum order amount to qualify
    pub min_order_amount: Option<u64>,
}

impl FlashSale {
    pub fn new_from_request(req: CreateFlashSaleRequest, now: u64) -> Self {
        Self {
            id: Ulid::new(),
            create_at: now,
            status: derive_status(now, req.start_time, req.end_time),
            name: req.name,
            start_time: req.start_time,
            end_time: req.end_time,
            max_quantity_per_user: req.max_quantity_per_user,
            min_order_amount: req.min_order_amount,
        }
    }

    /// Merge a partial update over the stored record, re-deriving status from
    /// the resulting window. Fields not supplied keep their stored values.
    pub fn apply_update(&self, req: UpdateFlashSaleRequest, now: u64) -> Self {
        let start_time = req.start_time.unwrap_or(self.start_time);
        let end_time = req.end_time.unwrap_or(self.end_time);
        Self {
            id: self.id,
            create_at: self.create_at,
            name: req.name.unwrap_or_else(|| self.name.clone()),
            start_time,
            end_time,
            status: derive_status(now, start_time, end_time),
            max_quantity_per_user: req.max_quantity_per_user.or(self.max_quantity_per_user),
            min_order_amount: req.min_order_amount.or(self.min_order_amount),
        }
    }

    /// A sale is live only when its stored status says active AND the wall
    /// clock is inside the window. The stored status alone is not enough
    /// since nothing transitions it in the background.
    pub fn is_live(&self, now: u64) -> bool {
        self.status == SaleStatus::Active && self.start_time <= now && now <= self.end_time
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFlashSaleRequest {
    /// Campaign name
    pub name: String,
    /// Window start, unix timestamp millis
    pub start_time: u64,
    /// Window end, unix timestamp millis
    pub end_time: u64,
    /// Optional cap on units a single user may buy across the sale
    pub max_quantity_per_user: Option<u32>,
    /// Optional minimum order amount to qualify
    pub min_order_amount: Option<u64>,
}

#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFlashSaleRequest {
    /// Campaign name
    pub name: Option<String>,
    /// Window start, unix timestamp millis
    pub start_time: Option<u64>,
    /// Window end, unix timestamp millis
    pub end_time: Option<u64>,
    /// Optional cap on units a single user may buy across the sale
    pub max_quantity_per_user: Option<u32>,
    /// Optional minimum order amount to qualify
    pub min_order_amount: Option<u64>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListSalesQuery {
    /// Page size, defaults to 20, capped at 100
    pub limit: Option<i32>,
    /// Sale id of the last record on the previous page
    pub cursor: Option<String>,
    /// Filter by stored status
    pub status: Option<SaleStatus>,
    /// Substring match on the campaign name
    pub search: Option<String>,
}

/// Typed scan filter built from the list query. `status` and `name` are both
/// DynamoDB reserved words, so attribute names go through the names map.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SaleFilter {
    pub expression: Option<String>,
    pub names: HashMap<String, String>,
    pub values: HashMap<String, AttributeValue>,
}

impl SaleFilter {
    pub fn from_query(query: &ListSalesQuery) -> Self {
        let mut filter = Self::default();
        let mut clauses: Vec<&str> = Vec::new();

        if let Some(status) = query.status {
            clauses.push("#status = :status");
            filter
                .names
                .insert("#status".to_string(), "status".to_string());
            filter.values.insert(":status".to_string(), status.into());
        }

        if let Some(search) = query.search.as_ref().filter(|s| !s.is_empty()) {
            clauses.push("contains(#name, :search)");
            filter.names.insert("#name".to_string(), "name".to_string());
            filter
                .values
                .insert(":search".to_string(), AttributeValue::S(search.clone()));
        }

        if !clauses.is_empty() {
            filter.expression = Some(clauses.join(" AND "));
        }
        filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: u64 = 60 * 60 * 1000;

    #[test]
    fn status_derivation_follows_window() {
        let (start, end) = (10 * HOUR, 12 * HOUR);
        assert_eq!(derive_status(9 * HOUR, start, end), SaleStatus::Upcoming);
        assert_eq!(derive_status(11 * HOUR, start, end), SaleStatus::Active);
        assert_eq!(derive_status(13 * HOUR, start, end), SaleStatus::Ended);
        // window bounds are inclusive
        assert_eq!(derive_status(start, start, end), SaleStatus::Active);
        assert_eq!(derive_status(end, start, end), SaleStatus::Active);
    }

    #[test]
    fn create_derives_status_at_write_time() {
        let req = CreateFlashSaleRequest {
            name: "Tết Sale".to_string(),
            start_time: HOUR,
            end_time: 3 * HOUR,
            max_quantity_per_user: Some(2),
            min_order_amount: None,
        };
        let sale = FlashSale::new_from_request(req, 2 * HOUR);
        assert_eq!(sale.status, SaleStatus::Active);
        assert_eq!(sale.max_quantity_per_user, Some(2));
    }

    #[test]
    fn elapsed_sale_keeps_stale_status_but_is_not_live() {
        // Written while active, never touched again.
        let sale = FlashSale {
            start_time: HOUR,
            end_time: 3 * HOUR,
            status: SaleStatus::Active,
            ..Default::default()
        };
        // Two hours past the window the stored status still reads active...
        assert_eq!(sale.status, SaleStatus::Active);
        // ...but the sale no longer qualifies as the live one.
        assert!(sale.is_live(2 * HOUR));
        assert!(!sale.is_live(5 * HOUR));
        assert!(!sale.is_live(0));
    }

    #[test]
    fn update_merges_partial_fields_and_rederives_status() {
        let sale = FlashSale {
            name: "Old".to_string(),
            start_time: HOUR,
            end_time: 3 * HOUR,
            status: SaleStatus::Active,
            max_quantity_per_user: Some(5),
            ..Default::default()
        };
        let updated = sale.apply_update(
            UpdateFlashSaleRequest {
                end_time: Some(10 * HOUR),
                ..Default::default()
            },
            5 * HOUR,
        );
        assert_eq!(updated.name, "Old");
        assert_eq!(updated.start_time, HOUR);
        assert_eq!(updated.end_time, 10 * HOUR);
        assert_eq!(updated.status, SaleStatus::Active);
        assert_eq!(updated.max_quantity_per_user, Some(5));

        // Pulling the window fully into the past flips the stored status.
        let ended = sale.apply_update(UpdateFlashSaleRequest::default(), 4 * HOUR);
        assert_eq!(ended.status, SaleStatus::Ended);
    }

    #[test]
    fn filter_spec_accumulates_clauses() {
        let empty = SaleFilter::from_query(&ListSalesQuery::default());
        assert_eq!(empty.expression, None);
        assert!(empty.values.is_empty());

        let query = ListSalesQuery {
            status: Some(SaleStatus::Active),
            search: Some("tet".to_string()),
            ..Default::default()
        };
        let filter = SaleFilter::from_query(&query);
        assert_eq!(
            filter.expression.as_deref(),
            Some("#status = :status AND contains(#name, :search)")
        );
        assert_eq!(filter.names.get("#status"), Some(&"status".to_string()));
        assert_eq!(filter.names.get("#name"), Some(&"name".to_string()));
        assert_eq!(
            filter.values.get(":status"),
            Some(&AttributeValue::S("active".to_string()))
        );
    }

    #[test]
    fn blank_search_is_ignored() {
        let query = ListSalesQuery {
            search: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(SaleFilter::from_query(&query).expression, None);
    }
}
