use std::{collections::HashMap, sync::Arc};

use aws_sdk_dynamodb::{
    types::{AttributeValue, Delete, TransactWriteItem},
    Client,
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde_dynamo::{from_items, to_item};
use ulid::Ulid;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::{
    constants::{
        ANALYTICS_TABLE, DAY_MILLIS, DEFAULT_PAGE_SIZE, FLASH_SALE_TABLE, MAX_PAGE_SIZE,
        MAX_TRANSACT_ITEMS, PURCHASE_EVENT_TABLE, SALE_ITEM_TABLE, VIEW_EVENT_TABLE, WEEK_MILLIS,
    },
    errors::{put_conflict_or_error, HandlerError},
    models::{
        analytics::{FlashSaleAnalytics, PurchaseEvent, ViewEvent},
        auth::ClaimOwned,
        item::{discount_percent, AddItemRequest, FlashSaleItem},
        sale::{CreateFlashSaleRequest, FlashSale, ListSalesQuery, SaleFilter, UpdateFlashSaleRequest},
        PageInfo, PaginatedSales,
    },
    state::AppState,
    utils::{now_millis, window_floor},
};

use super::{check_admin, fetch_sale, query_events, query_sale_items};

pub fn router() -> OpenApiRouter<Arc<AppState>> {
    OpenApiRouter::new()
        .routes(routes!(list_sales, create_sale))
        .routes(routes!(get_sale, update_sale, delete_sale))
        .routes(routes!(list_items, add_item))
        .routes(routes!(sale_analytics))
}

fn validate_window(start_time: u64, end_time: u64) -> Result<(), HandlerError> {
    if end_time <= start_time {
        return Err(HandlerError::validation("endTime must be after startTime"));
    }
    Ok(())
}

// List sales
/// List flash sales, paginated, optionally filtered by status or name.
#[utoipa::path(
    get,
    path = "/",
    tag = "Admin",
    params(
        ("limit" = Option<i32>, Query, description = "Page size, default 20, max 100"),
        ("cursor" = Option<String>, Query, description = "Sale id ending the previous page"),
        ("status" = Option<String>, Query, description = "Filter by stored status"),
        ("search" = Option<String>, Query, description = "Substring match on the name"),
    ),
    responses(
        (status = OK, description = "One page of sales", body = PaginatedSales),
        (status = UNAUTHORIZED, description = "Missing or non-admin token", body = HandlerError),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
)]
async fn list_sales(
    Extension(claim): Extension<ClaimOwned>,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListSalesQuery>,
) -> Result<Json<PaginatedSales>, HandlerError> {
    check_admin(claim.as_claim())?;

    let client = Client::new(&state.aws_config);
    let filter = SaleFilter::from_query(&query);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

    let mut scan = client.scan().table_name(FLASH_SALE_TABLE).limit(limit);
    if let Some(expression) = filter.expression {
        scan = scan
            .filter_expression(expression)
            .set_expression_attribute_names(Some(filter.names))
            .set_expression_attribute_values(Some(filter.values));
    }
    if let Some(cursor) = query.cursor {
        scan = scan.set_exclusive_start_key(Some(HashMap::from([(
            "id".to_string(),
            AttributeValue::S(cursor),
        )])));
    }

    let scan_resp = scan.send().await?;

    let sales: Vec<FlashSale> = from_items(scan_resp.items().to_vec())?;
    let next_cursor = scan_resp
        .last_evaluated_key()
        .and_then(|key| key.get("id"))
        .and_then(|v| v.as_s().ok())
        .cloned();

    Ok(Json(PaginatedSales {
        pagination: PageInfo {
            next_cursor,
            count: sales.len(),
        },
        sales,
    }))
}

// Create sale
/// Create a flash sale; status is derived from now vs the window.
#[utoipa::path(
    post,
    path = "/",
    tag = "Admin",
    request_body = CreateFlashSaleRequest,
    responses(
        (status = OK, description = "Created sale", body = FlashSale),
        (status = BAD_REQUEST, description = "Inverted window or empty name", body = HandlerError),
        (status = UNAUTHORIZED, description = "Missing or non-admin token", body = HandlerError),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
)]
async fn create_sale(
    Extension(claim): Extension<ClaimOwned>,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateFlashSaleRequest>,
) -> Result<Json<FlashSale>, HandlerError> {
    check_admin(claim.as_claim())?;

    if payload.name.trim().is_empty() {
        return Err(HandlerError::validation("name must not be empty"));
    }
    validate_window(payload.start_time, payload.end_time)?;

    let client = Client::new(&state.aws_config);
    let sale = FlashSale::new_from_request(payload, now_millis());

    client
        .put_item()
        .table_name(FLASH_SALE_TABLE)
        .set_item(Some(to_item(sale.clone())?))
        .send()
        .await?;

    Ok(Json(sale))
}

// Get sale
/// Get a flash sale by id.
#[utoipa::path(
    get,
    path = "/{saleId}",
    tag = "Admin",
    params(
        ("saleId" = String, Path, description = "Flash sale id", format = Ulid),
    ),
    responses(
        (status = OK, description = "The sale", body = FlashSale),
        (status = UNAUTHORIZED, description = "Missing or non-admin token", body = HandlerError),
        (status = NOT_FOUND, description = "Sale not found", body = HandlerError),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
)]
async fn get_sale(
    Extension(claim): Extension<ClaimOwned>,
    State(state): State<Arc<AppState>>,
    Path(sale_id): Path<Ulid>,
) -> Result<Json<FlashSale>, HandlerError> {
    check_admin(claim.as_claim())?;

    let client = Client::new(&state.aws_config);
    let sale = fetch_sale(&client, sale_id).await?;

    Ok(Json(sale))
}

// Update sale
/// Partially update a sale; unsupplied fields keep their stored values and
/// status is re-derived from the resulting window.
#[utoipa::path(
    put,
    path = "/{saleId}",
    tag = "Admin",
    params(
        ("saleId" = String, Path, description = "Flash sale id", format = Ulid),
    ),
    request_body = UpdateFlashSaleRequest,
    responses(
        (status = OK, description = "Updated sale", body = FlashSale),
        (status = BAD_REQUEST, description = "Empty update or inverted window", body = HandlerError),
        (status = UNAUTHORIZED, description = "Missing or non-admin token", body = HandlerError),
        (status = NOT_FOUND, description = "Sale not found", body = HandlerError),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
)]
async fn update_sale(
    Extension(claim): Extension<ClaimOwned>,
    State(state): State<Arc<AppState>>,
    Path(sale_id): Path<Ulid>,
    Json(payload): Json<UpdateFlashSaleRequest>,
) -> Result<Json<FlashSale>, HandlerError> {
    check_admin(claim.as_claim())?;

    if payload == UpdateFlashSaleRequest::default() {
        return Err(HandlerError::validation(
            "Must have at least 1 field to update.",
        ));
    }

    let client = Client::new(&state.aws_config);
    let sale = fetch_sale(&client, sale_id).await?;

    let updated = sale.apply_update(payload, now_millis());
    validate_window(updated.start_time, updated.end_time)?;

    client
        .put_item()
        .table_name(FLASH_SALE_TABLE)
        .set_item(Some(to_item(updated.clone())?))
        .send()
        .await?;

    Ok(Json(updated))
}

// Delete sale
/// Delete a sale and cascade to its items, event history and analytics,
/// grouped into transactional batches.
#[utoipa::path(
    delete,
    path = "/{saleId}",
    tag = "Admin",
    params(
        ("saleId" = String, Path, description = "Flash sale id", format = Ulid),
    ),
    responses(
        (status = OK, description = "Sale and children deleted"),
        (status = UNAUTHORIZED, description = "Missing or non-admin token", body = HandlerError),
        (status = NOT_FOUND, description = "Sale not found", body = HandlerError),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
)]
async fn delete_sale(
    Extension(claim): Extension<ClaimOwned>,
    State(state): State<Arc<AppState>>,
    Path(sale_id): Path<Ulid>,
) -> Result<(), HandlerError> {
    check_admin(claim.as_claim())?;

    let client = Client::new(&state.aws_config);
    fetch_sale(&client, sale_id).await?;

    let items = query_sale_items(&client, sale_id).await?;
    let views: Vec<ViewEvent> = query_events(&client, VIEW_EVENT_TABLE, sale_id, None).await?;
    let purchases: Vec<PurchaseEvent> =
        query_events(&client, PURCHASE_EVENT_TABLE, sale_id, None).await?;

    let deletes = cascade_deletes(sale_id, &items, &views, &purchases)?;

    for chunk in deletes.chunks(MAX_TRANSACT_ITEMS) {
        let mut transaction = client.transact_write_items();
        for delete in chunk {
            transaction = transaction.transact_items(delete.clone());
        }
        transaction.send().await?;
    }

    Ok(())
}

/// One delete per record the sale owns: the sale itself, its analytics row,
/// every item, and the full view/purchase history. The sale record leads so
/// a partial batch failure cannot leave a visible sale with missing
/// children.
fn cascade_deletes(
    sale_id: Ulid,
    items: &[FlashSaleItem],
    views: &[ViewEvent],
    purchases: &[PurchaseEvent],
) -> Result<Vec<TransactWriteItem>, HandlerError> {
    let mut deletes: Vec<TransactWriteItem> = Vec::new();
    deletes.push(delete_op(FLASH_SALE_TABLE, &[("id", sale_id.to_string())])?);
    deletes.push(delete_op(
        ANALYTICS_TABLE,
        &[("flashSaleId", sale_id.to_string())],
    )?);
    for item in items {
        deletes.push(delete_op(
            SALE_ITEM_TABLE,
            &[
                ("flashSaleId", sale_id.to_string()),
                ("productId", item.product_id.clone()),
            ],
        )?);
    }
    for view in views {
        deletes.push(delete_op(
            VIEW_EVENT_TABLE,
            &[
                ("flashSaleId", sale_id.to_string()),
                ("id", view.id.to_string()),
            ],
        )?);
    }
    for purchase in purchases {
        deletes.push(delete_op(
            PURCHASE_EVENT_TABLE,
            &[
                ("flashSaleId", sale_id.to_string()),
                ("id", purchase.id.to_string()),
            ],
        )?);
    }
    Ok(deletes)
}

fn delete_op(table: &str, keys: &[(&str, String)]) -> Result<TransactWriteItem, HandlerError> {
    let mut delete = Delete::builder().table_name(table);
    for (name, value) in keys {
        delete = delete.key(*name, AttributeValue::S(value.clone()));
    }
    Ok(TransactWriteItem::builder().delete(delete.build()?).build())
}

// List items
/// List a sale's items, priority descending.
#[utoipa::path(
    get,
    path = "/{saleId}/items",
    tag = "Admin",
    params(
        ("saleId" = String, Path, description = "Flash sale id", format = Ulid),
    ),
    responses(
        (status = OK, description = "Items by priority", body = Vec<FlashSaleItem>),
        (status = UNAUTHORIZED, description = "Missing or non-admin token", body = HandlerError),
        (status = NOT_FOUND, description = "Sale not found", body = HandlerError),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
)]
async fn list_items(
    Extension(claim): Extension<ClaimOwned>,
    State(state): State<Arc<AppState>>,
    Path(sale_id): Path<Ulid>,
) -> Result<Json<Vec<FlashSaleItem>>, HandlerError> {
    check_admin(claim.as_claim())?;

    let client = Client::new(&state.aws_config);
    fetch_sale(&client, sale_id).await?;

    let items = query_sale_items(&client, sale_id).await?;

    Ok(Json(items))
}

// Add item
/// Enroll a product in a sale. One entry per (sale, product); the discount
/// percentage, when supplied, must match the computed rounded value.
#[utoipa::path(
    post,
    path = "/{saleId}/items",
    tag = "Admin",
    params(
        ("saleId" = String, Path, description = "Flash sale id", format = Ulid),
    ),
    request_body = AddItemRequest,
    responses(
        (status = OK, description = "Created item", body = FlashSaleItem),
        (status = BAD_REQUEST, description = "Bad prices, discount mismatch, or duplicate product", body = HandlerError),
        (status = UNAUTHORIZED, description = "Missing or non-admin token", body = HandlerError),
        (status = NOT_FOUND, description = "Sale not found", body = HandlerError),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
)]
async fn add_item(
    Extension(claim): Extension<ClaimOwned>,
    State(state): State<Arc<AppState>>,
    Path(sale_id): Path<Ulid>,
    Json(payload): Json<AddItemRequest>,
) -> Result<Json<FlashSaleItem>, HandlerError> {
    check_admin(claim.as_claim())?;

    if payload.sale_price >= payload.original_price {
        return Err(HandlerError::validation(
            "salePrice must be below originalPrice",
        ));
    }
    if payload.total_quantity == 0 {
        return Err(HandlerError::validation("totalQuantity must be positive"));
    }
    if let Some(claimed) = payload.discount_percent {
        let computed = discount_percent(payload.original_price, payload.sale_price);
        if claimed != computed {
            return Err(HandlerError::validation(format!(
                "discountPercent {} does not match computed {}",
                claimed, computed
            )));
        }
    }

    let client = Client::new(&state.aws_config);
    fetch_sale(&client, sale_id).await?;

    let item = FlashSaleItem::new_from_request(sale_id, payload, now_millis());

    client
        .put_item()
        .table_name(SALE_ITEM_TABLE)
        .set_item(Some(to_item(item.clone())?))
        .condition_expression("attribute_not_exists(productId)")
        .send()
        .await
        .map_err(|e| put_conflict_or_error(e, "Product is already enrolled in this flash sale"))?;

    Ok(Json(item))
}

// Analytics
/// Recompute a sale's analytics from the event tables and resync the stored
/// row. Six window queries run concurrently.
#[utoipa::path(
    get,
    path = "/{saleId}/analytics",
    tag = "Admin",
    params(
        ("saleId" = String, Path, description = "Flash sale id", format = Ulid),
    ),
    responses(
        (status = OK, description = "Fresh analytics snapshot", body = FlashSaleAnalytics),
        (status = UNAUTHORIZED, description = "Missing or non-admin token", body = HandlerError),
        (status = NOT_FOUND, description = "Sale not found", body = HandlerError),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
)]
async fn sale_analytics(
    Extension(claim): Extension<ClaimOwned>,
    State(state): State<Arc<AppState>>,
    Path(sale_id): Path<Ulid>,
) -> Result<Json<FlashSaleAnalytics>, HandlerError> {
    check_admin(claim.as_claim())?;

    let client = Client::new(&state.aws_config);
    fetch_sale(&client, sale_id).await?;

    let now = now_millis();
    let day_floor = window_floor(now, DAY_MILLIS);
    let week_floor = window_floor(now, WEEK_MILLIS);

    // One query per metric per window, concurrent for latency only.
    let (all_views, day_views, week_views, all_purchases, day_purchases, week_purchases) = tokio::join!(
        query_events::<ViewEvent>(&client, VIEW_EVENT_TABLE, sale_id, None),
        query_events::<ViewEvent>(&client, VIEW_EVENT_TABLE, sale_id, Some(day_floor)),
        query_events::<ViewEvent>(&client, VIEW_EVENT_TABLE, sale_id, Some(week_floor)),
        query_events::<PurchaseEvent>(&client, PURCHASE_EVENT_TABLE, sale_id, None),
        query_events::<PurchaseEvent>(&client, PURCHASE_EVENT_TABLE, sale_id, Some(day_floor)),
        query_events::<PurchaseEvent>(&client, PURCHASE_EVENT_TABLE, sale_id, Some(week_floor)),
    );

    let snapshot = FlashSaleAnalytics::compute(
        sale_id,
        &all_views?,
        &all_purchases?,
        &day_views?,
        &day_purchases?,
        &week_views?,
        &week_purchases?,
        now,
    );

    // Resync the denormalized row the lazy increments may have drifted.
    client
        .put_item()
        .table_name(ANALYTICS_TABLE)
        .set_item(Some(to_item(snapshot.clone())?))
        .send()
        .await?;

    Ok(Json(snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sale_item(sale_id: Ulid, product_id: &str) -> FlashSaleItem {
        FlashSaleItem {
            flash_sale_id: sale_id,
            product_id: product_id.to_string(),
            id: Ulid::new(),
            create_at: 0,
            original_price: 100_000,
            sale_price: 80_000,
            discount_percent: 20,
            total_quantity: 50,
            remaining_quantity: 50,
            max_per_user: 2,
            priority: 0,
        }
    }

    fn view_event(sale_id: Ulid) -> ViewEvent {
        ViewEvent {
            flash_sale_id: sale_id,
            id: Ulid::new(),
            flash_sale_item_id: Ulid::nil(),
            user_id: None,
            session_id: None,
            ip: None,
            user_agent: None,
            device: None,
            created_at: 0,
        }
    }

    fn purchase_event(sale_id: Ulid) -> PurchaseEvent {
        PurchaseEvent {
            flash_sale_id: sale_id,
            id: Ulid::new(),
            flash_sale_item_id: Ulid::nil(),
            user_id: None,
            session_id: None,
            quantity: 1,
            total_price: 80_000,
            created_at: 0,
        }
    }

    // An event history larger than one DynamoDB page (and one transaction)
    // still gets a delete per record, batched within the transact cap.
    #[test]
    fn cascade_covers_multi_page_history() {
        let sale_id = Ulid::new();
        let items: Vec<FlashSaleItem> = (0..3)
            .map(|i| sale_item(sale_id, &format!("prod-{}", i)))
            .collect();
        let views: Vec<ViewEvent> = (0..180).map(|_| view_event(sale_id)).collect();
        let purchases: Vec<PurchaseEvent> = (0..70).map(|_| purchase_event(sale_id)).collect();

        let deletes = cascade_deletes(sale_id, &items, &views, &purchases).unwrap();

        // sale + analytics row + every child record
        assert_eq!(deletes.len(), 2 + 3 + 180 + 70);
        assert_eq!(deletes.chunks(MAX_TRANSACT_ITEMS).count(), 3);
        assert!(deletes
            .chunks(MAX_TRANSACT_ITEMS)
            .all(|chunk| chunk.len() <= MAX_TRANSACT_ITEMS));
    }

    #[test]
    fn cascade_deletes_nothing_but_the_sale_when_childless() {
        let deletes = cascade_deletes(Ulid::new(), &[], &[], &[]).unwrap();
        assert_eq!(deletes.len(), 2);
        assert_eq!(deletes.chunks(MAX_TRANSACT_ITEMS).count(), 1);
    }
}
