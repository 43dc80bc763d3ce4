use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod analytics;
pub mod auth;
pub mod item;
pub mod sale;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlainSuccessResponse {
    pub status: u16,
    pub message: String,
}

impl PlainSuccessResponse {
    pub fn ok<S: Into<String>>(message: S) -> Self {
        Self {
            status: StatusCode::OK.as_u16(),
            message: message.into(),
        }
    }
}

/// JSON error envelope: `{error, details?}`, HTTP status carried out of band.
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for PlainSuccessResponse {
    fn into_response(self) -> Response {
        let code = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        let body = Json(self);

        (code, body).into_response()
    }
}

#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Pass back as `cursor` to fetch the next page
    pub next_cursor: Option<String>,
    /// Records in this page
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedSales {
    pub sales: Vec<sale::FlashSale>,
    pub pagination: PageInfo,
}

/// The live sale with its items, priority descending.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSaleResponse {
    pub sale: sale::FlashSale,
    pub items: Vec<item::FlashSaleItem>,
}
