use aws_sdk_dynamodb::{types::AttributeValue, Client};
use serde::de::DeserializeOwned;
use serde_dynamo::{from_item, from_items};
use ulid::Ulid;

use crate::{
    constants::{FLASH_SALE_TABLE, SALE_ITEM_TABLE},
    errors::HandlerError,
    models::{
        auth::{Claim, Role},
        item::FlashSaleItem,
        sale::FlashSale,
    },
};

pub mod admin;
pub mod storefront;

/// The original storefront reports role mismatches as 401, not 403.
fn check_admin(claim: Claim) -> Result<(), HandlerError> {
    if claim.role != Role::Admin {
        return Err(HandlerError::auth("Admin access required."));
    }
    Ok(())
}

async fn fetch_sale(client: &Client, sale_id: Ulid) -> Result<FlashSale, HandlerError> {
    let get_sale_resp = client
        .get_item()
        .table_name(FLASH_SALE_TABLE)
        .key("id", AttributeValue::S(sale_id.to_string()))
        .send()
        .await?;

    let item = get_sale_resp
        .item
        .ok_or_else(|| HandlerError::not_found("Flash sale not found"))?;

    Ok(from_item(item)?)
}

/// Every item of one sale, priority descending. Follows last_evaluated_key
/// so result sets past one page are not truncated.
async fn query_sale_items(client: &Client, sale_id: Ulid) -> Result<Vec<FlashSaleItem>, HandlerError> {
    let mut items: Vec<FlashSaleItem> = Vec::new();
    let mut start_key = None;

    loop {
        let query_resp = client
            .query()
            .table_name(SALE_ITEM_TABLE)
            .key_condition_expression("flashSaleId = :sid")
            .expression_attribute_values(":sid", AttributeValue::S(sale_id.to_string()))
            .set_exclusive_start_key(start_key.clone())
            .send()
            .await?;

        let page: Vec<FlashSaleItem> = from_items(query_resp.items().to_vec())?;
        items.extend(page);

        start_key = query_resp.last_evaluated_key().cloned();
        if start_key.is_none() {
            break;
        }
    }

    items.sort_by(|a, b| b.priority.cmp(&a.priority));

    Ok(items)
}

/// Query an event table for one sale, optionally bounded below by the Ulid
/// floor of a trailing time window. Follows last_evaluated_key to the end;
/// a sale's event history routinely spans DynamoDB pages.
async fn query_events<T: DeserializeOwned>(
    client: &Client,
    table: &str,
    sale_id: Ulid,
    floor: Option<Ulid>,
) -> Result<Vec<T>, HandlerError> {
    let condition = match floor {
        Some(_) => "flashSaleId = :sid AND id >= :from",
        None => "flashSaleId = :sid",
    };

    let mut events: Vec<T> = Vec::new();
    let mut start_key = None;

    loop {
        let mut query = client
            .query()
            .table_name(table)
            .key_condition_expression(condition)
            .expression_attribute_values(":sid", AttributeValue::S(sale_id.to_string()))
            .set_exclusive_start_key(start_key.clone());
        if let Some(floor) = floor {
            query = query.expression_attribute_values(":from", AttributeValue::S(floor.to_string()));
        }
        let query_resp = query.send().await?;

        let page: Vec<T> = from_items(query_resp.items().to_vec())?;
        events.extend(page);

        start_key = query_resp.last_evaluated_key().cloned();
        if start_key.is_none() {
            break;
        }
    }

    Ok(events)
}
