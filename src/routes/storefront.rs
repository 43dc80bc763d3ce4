use std::sync::Arc;

use aws_sdk_dynamodb::{types::AttributeValue, Client};
use axum::{
    extract::State,
    http::HeaderMap,
    Json,
};
use lambda_http::tracing;
use serde_dynamo::{from_items, to_item};
use ulid::Ulid;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::{
    constants::{ANALYTICS_TABLE, FLASH_SALE_TABLE, PURCHASE_EVENT_TABLE, VIEW_EVENT_TABLE},
    errors::HandlerError,
    middlewares::auth::optional_claim,
    models::{
        analytics::{PurchaseEvent, TrackPurchaseRequest, TrackViewRequest, ViewEvent},
        sale::{FlashSale, SaleStatus},
        ActiveSaleResponse, PlainSuccessResponse,
    },
    state::AppState,
    utils::{client_ip, now_millis, user_agent},
};

use super::query_sale_items;

pub fn router() -> OpenApiRouter<Arc<AppState>> {
    OpenApiRouter::new()
        .routes(routes!(get_active_sale))
        .routes(routes!(track_view))
        .routes(routes!(track_purchase))
}

// Active sale
/// Get the currently running flash sale with its items, or null.
#[utoipa::path(
    get,
    path = "/active",
    tag = "Storefront",
    responses(
        (status = OK, description = "The live sale with items by priority, or null", body = ActiveSaleResponse),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
)]
async fn get_active_sale(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Option<ActiveSaleResponse>>, HandlerError> {
    let client = Client::new(&state.aws_config);
    let now = now_millis();

    // Follow last_evaluated_key: the filter is applied after the page is
    // read, so the live sale can sit on any page of the table.
    let mut sales: Vec<FlashSale> = Vec::new();
    let mut start_key = None;
    loop {
        let scan_resp = client
            .scan()
            .table_name(FLASH_SALE_TABLE)
            .filter_expression("#status = :active")
            .expression_attribute_names("#status", "status")
            .expression_attribute_values(":active", SaleStatus::Active.into())
            .set_exclusive_start_key(start_key.clone())
            .send()
            .await?;

        let page: Vec<FlashSale> = from_items(scan_resp.items().to_vec())?;
        sales.extend(page);

        start_key = scan_resp.last_evaluated_key().cloned();
        if start_key.is_none() {
            break;
        }
    }

    // A stale stored status does not make a sale live; the wall clock must
    // agree. At most one live sale is expected by convention, not enforced.
    let sale = match sales.into_iter().find(|s| s.is_live(now)) {
        Some(sale) => sale,
        None => return Ok(Json(None)),
    };

    let items = query_sale_items(&client, sale.id).await?;

    Ok(Json(Some(ActiveSaleResponse { sale, items })))
}

// Track view
/// Record a storefront view of a flash-sale item. Best-effort: store
/// failures never reach the caller.
#[utoipa::path(
    post,
    path = "/track-view",
    tag = "Storefront",
    request_body = TrackViewRequest,
    responses(
        (status = OK, description = "View accepted", body = PlainSuccessResponse),
    ),
)]
async fn track_view(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<TrackViewRequest>,
) -> PlainSuccessResponse {
    let now = now_millis();
    let claim = optional_claim(&state, &headers);

    let event = ViewEvent {
        flash_sale_id: payload.flash_sale_id,
        id: Ulid::new(),
        flash_sale_item_id: payload.flash_sale_item_id,
        user_id: claim.map(|c| c.id),
        session_id: payload.session_id,
        ip: client_ip(&headers),
        user_agent: user_agent(&headers),
        device: payload.device,
        created_at: payload.timestamp.unwrap_or(now),
    };

    if let Err(e) = record_view(&state, event).await {
        tracing::warn!("view tracking failed, dropping event: {}", e);
    }

    PlainSuccessResponse::ok("view recorded")
}

async fn record_view(state: &AppState, event: ViewEvent) -> Result<(), HandlerError> {
    let client = Client::new(&state.aws_config);
    let sale_id = event.flash_sale_id;
    let device = event.device;

    client
        .put_item()
        .table_name(VIEW_EVENT_TABLE)
        .set_item(Some(to_item(event)?))
        .send()
        .await?;

    // Lazy upsert: ADD creates the analytics row on the first view.
    let update_expr = match device {
        Some(d) => format!("ADD totalViews :one, {} :one", d.views_attr()),
        None => "ADD totalViews :one".to_string(),
    };
    client
        .update_item()
        .table_name(ANALYTICS_TABLE)
        .key("flashSaleId", AttributeValue::S(sale_id.to_string()))
        .update_expression(update_expr)
        .expression_attribute_values(":one", AttributeValue::N("1".to_string()))
        .send()
        .await?;

    Ok(())
}

// Track purchase
/// Record a purchase event. Telemetry only: remainingQuantity is not
/// decremented here (stock mutation is unresolved upstream).
#[utoipa::path(
    post,
    path = "/track-purchase",
    tag = "Storefront",
    request_body = TrackPurchaseRequest,
    responses(
        (status = OK, description = "Purchase accepted", body = PlainSuccessResponse),
    ),
)]
async fn track_purchase(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<TrackPurchaseRequest>,
) -> PlainSuccessResponse {
    let now = now_millis();
    let claim = optional_claim(&state, &headers);

    let event = PurchaseEvent {
        flash_sale_id: payload.flash_sale_id,
        id: Ulid::new(),
        flash_sale_item_id: payload.flash_sale_item_id,
        user_id: claim.map(|c| c.id),
        session_id: payload.session_id,
        quantity: payload.quantity,
        total_price: payload.total_price,
        created_at: payload.timestamp.unwrap_or(now),
    };

    if let Err(e) = record_purchase(&state, event).await {
        tracing::warn!("purchase tracking failed, dropping event: {}", e);
    }

    PlainSuccessResponse::ok("purchase recorded")
}

async fn record_purchase(state: &AppState, event: PurchaseEvent) -> Result<(), HandlerError> {
    let client = Client::new(&state.aws_config);
    let sale_id = event.flash_sale_id;
    let total_price = event.total_price;

    client
        .put_item()
        .table_name(PURCHASE_EVENT_TABLE)
        .set_item(Some(to_item(event)?))
        .send()
        .await?;

    client
        .update_item()
        .table_name(ANALYTICS_TABLE)
        .key("flashSaleId", AttributeValue::S(sale_id.to_string()))
        .update_expression("ADD totalPurchases :one, totalRevenue :revenue")
        .expression_attribute_values(":one", AttributeValue::N("1".to_string()))
        .expression_attribute_values(":revenue", AttributeValue::N(total_price.to_string()))
        .send()
        .await?;

    Ok(())
}
