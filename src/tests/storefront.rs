use axum::http::StatusCode;
use lambda_http::{tower::ServiceExt, Error};
use ulid::Ulid;

use crate::{
    create_service,
    models::{
        analytics::{Device, TrackPurchaseRequest, TrackViewRequest},
        PlainSuccessResponse,
    },
    tests::{build_request, parse_resp, test_state},
};

#[tokio::test]
async fn health_check_is_public() -> Result<(), Error> {
    let state = test_state().await?;
    let service = create_service(state).await?;

    let req = build_request::<()>("GET", "/v1/health", None, None)?;
    let resp = service.oneshot(req).await?;

    assert_eq!(resp.status(), StatusCode::OK);
    Ok(())
}

// View tracking is best-effort telemetry: even with the record store down
// (nothing listens on the test endpoint) the caller gets a 200.
#[tokio::test]
async fn track_view_never_fails_the_caller() -> Result<(), Error> {
    let state = test_state().await?;
    let service = create_service(state).await?;

    let payload = TrackViewRequest {
        flash_sale_id: Ulid::new(),
        flash_sale_item_id: Ulid::new(),
        session_id: Some("sess-1".to_string()),
        device: Some(Device::Mobile),
        timestamp: None,
    };
    let req = build_request("POST", "/v1/flash-sales/track-view", None, Some(payload))?;
    let resp = service.oneshot(req).await?;

    assert_eq!(resp.status(), StatusCode::OK);

    let body: PlainSuccessResponse = parse_resp(resp).await?;
    assert_eq!(body.message, "view recorded");

    Ok(())
}

#[tokio::test]
async fn track_purchase_never_fails_the_caller() -> Result<(), Error> {
    let state = test_state().await?;
    let service = create_service(state).await?;

    let payload = TrackPurchaseRequest {
        flash_sale_id: Ulid::new(),
        flash_sale_item_id: Ulid::new(),
        session_id: None,
        quantity: 2,
        total_price: 160_000,
        timestamp: Some(1_700_000_000_000),
    };
    let req = build_request("POST", "/v1/flash-sales/track-purchase", None, Some(payload))?;
    let resp = service.oneshot(req).await?;

    assert_eq!(resp.status(), StatusCode::OK);

    let body: PlainSuccessResponse = parse_resp(resp).await?;
    assert_eq!(body.message, "purchase recorded");

    Ok(())
}
