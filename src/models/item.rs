use serde::{Deserialize, Serialize};
use ulid::Ulid;
use utoipa::ToSchema;

/// A product enrolled in a flash sale. Keyed by (flashSaleId, productId) so a
/// conditional put enforces at most one entry per pair.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlashSaleItem {
    /// Owning sale's Ulid, hash key
    pub flash_sale_id: Ulid,
    /// Product identifier, range key
    pub product_id: String,
    /// Ulid
    pub id: Ulid,
    /// Create time, in unix timestamp millis
    pub create_at: u64,
    /// List price before discount
    pub original_price: u64,
    /// Discounted price, strictly below originalPrice
    pub sale_price: u64,
    /// round((originalPrice-salePrice)/originalPrice*100)
    pub discount_percent: u32,
    /// Units allocated to the sale
    pub total_quantity: u32,
    /// Units left, starts at totalQuantity, never auto-adjusted afterwards
    pub remaining_quantity: u32,
    /// Per-user purchase cap for this item
    pub max_per_user: u32,
    /// Display ordering, higher first
    pub priority: i32,
}

impl FlashSaleItem {
    pub fn new_from_request(flash_sale_id: Ulid, req: AddItemRequest, now: u64) -> Self {
        Self {
            flash_sale_id,
            product_id: req.product_id,
            id: Ulid::new(),
            create_at: now,
            discount_percent: discount_percent(req.original_price, req.sale_price),
            original_price: req.original_price,
            sale_price: req.sale_price,
            total_quantity: req.total_quantity,
            remaining_quantity: req.total_quantity,
            max_per_user: req.max_per_user,
            priority: req.priority.unwrap_or(0),
        }
    }
}

/// Percentage off, rounded to the nearest integer. Callers must have checked
/// sale < original.
pub fn discount_percent(original_price: u64, sale_price: u64) -> u32 {
    (((original_price - sale_price) as f64 / original_price as f64) * 100.0).round() as u32
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    /// Product identifier
    pub product_id: String,
    /// List price before discount
    pub original_price: u64,
    /// Discounted price
    pub sale_price: u64,
    /// Optional; when supplied it must match the computed rounded percentage
    pub discount_percent: Option<u32>,
    /// Units allocated to the sale
    pub total_quantity: u32,
    /// Per-user purchase cap for this item
    pub max_per_user: u32,
    /// Display ordering, higher first
    pub priority: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discount_percent_matches_rounded_formula() {
        assert_eq!(discount_percent(100_000, 80_000), 20);
        assert_eq!(discount_percent(100, 66), 34);
        // 66.66..% rounds up
        assert_eq!(discount_percent(99, 33), 67);
        // 0.4% rounds down to zero
        assert_eq!(discount_percent(1000, 996), 0);
    }

    #[test]
    fn new_item_initializes_remaining_to_total() {
        let req = AddItemRequest {
            product_id: "prod-1".to_string(),
            original_price: 100_000,
            sale_price: 80_000,
            discount_percent: None,
            total_quantity: 50,
            max_per_user: 2,
            priority: None,
        };
        let sale_id = Ulid::new();
        let item = FlashSaleItem::new_from_request(sale_id, req, 42);
        assert_eq!(item.flash_sale_id, sale_id);
        assert_eq!(item.remaining_quantity, 50);
        assert_eq!(item.total_quantity, 50);
        assert_eq!(item.discount_percent, 20);
        assert_eq!(item.priority, 0);
    }
}
