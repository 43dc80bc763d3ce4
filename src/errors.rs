use aws_sdk_dynamodb::{
    error::SdkError as DynamoSdkError,
    operation::{
        delete_item::DeleteItemError, get_item::GetItemError, put_item::PutItemError,
        query::QueryError, scan::ScanError, transact_write_items::TransactWriteItemsError,
        update_item::UpdateItemError,
    },
};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lambda_http::tracing;
use utoipa::{PartialSchema, ToSchema};

use crate::models::ErrorResponse;

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Unauthorized: {0}")]
    Auth(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("DynamoDB Error: GetItem: {0}")]
    DynamoDBGetError(#[from] DynamoSdkError<GetItemError>),
    #[error("DynamoDB Error: PutItem: {0}")]
    DynamoDBPutError(#[from] DynamoSdkError<PutItemError>),
    #[error("DynamoDB Error: Query: {0}")]
    DynamoDBQueryError(#[from] DynamoSdkError<QueryError>),
    #[error("DynamoDB Error: Scan: {0}")]
    DynamoDBScanError(#[from] DynamoSdkError<ScanError>),
    #[error("DynamoDB Error: DeleteItem: {0}")]
    DynamoDBDeleteError(#[from] DynamoSdkError<DeleteItemError>),
    #[error("DynamoDB Error: UpdateItem: {0}")]
    DynamoDBUpdateError(#[from] DynamoSdkError<UpdateItemError>),
    #[error("DynamoDB Error: TransactWriteItems: {0}")]
    DynamoDBTransactWriteItemsError(#[from] DynamoSdkError<TransactWriteItemsError>),
    #[error("Failed to build transaction: {0}")]
    TransactionBuildError(#[from] aws_sdk_dynamodb::error::BuildError),
    #[error("SerdeDynamo failed to process DynamoDB data: {0}")]
    SerdeDynamoError(#[from] serde_dynamo::Error),
    #[error("YAML serialization failed: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl HandlerError {
    pub fn status(&self) -> StatusCode {
        match self {
            // Uniqueness violations report as 400, not 409.
            HandlerError::Validation(_) | HandlerError::Conflict(_) => StatusCode::BAD_REQUEST,
            HandlerError::Auth(_) => StatusCode::UNAUTHORIZED,
            HandlerError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found<S: Into<String>>(what: S) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict<S: Into<String>>(message: S) -> Self {
        Self::Conflict(message.into())
    }

    pub fn auth<S: Into<String>>(message: S) -> Self {
        Self::Auth(message.into())
    }
}

impl From<&HandlerError> for ErrorResponse {
    fn from(value: &HandlerError) -> Self {
        match value.status() {
            // Unexpected errors keep the detail server-side only.
            StatusCode::INTERNAL_SERVER_ERROR => Self {
                error: "Internal server error".to_string(),
                details: None,
            },
            _ => Self {
                error: value.to_string(),
                details: None,
            },
        }
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("handler failed: {}", self);
        }
        (status, Json(ErrorResponse::from(&self))).into_response()
    }
}

impl PartialSchema for HandlerError {
    fn schema() -> utoipa::openapi::RefOr<utoipa::openapi::schema::Schema> {
        ErrorResponse::schema()
    }
}

impl ToSchema for HandlerError {
    fn schemas(
        schemas: &mut Vec<(
            String,
            utoipa::openapi::RefOr<utoipa::openapi::schema::Schema>,
        )>,
    ) {
        <ErrorResponse as ToSchema>::schemas(schemas);
    }
}

/// Conditional puts signal uniqueness violations; everything else stays a
/// store error.
pub fn put_conflict_or_error<S: Into<String>>(
    err: DynamoSdkError<PutItemError>,
    message: S,
) -> HandlerError {
    match err.as_service_error() {
        Some(service_err) if service_err.is_conditional_check_failed_exception() => {
            HandlerError::conflict(message)
        }
        _ => HandlerError::from(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_expected_status_codes() {
        assert_eq!(
            HandlerError::validation("bad window").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            HandlerError::conflict("duplicate").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            HandlerError::auth("no token").status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            HandlerError::not_found("sale").status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn unexpected_errors_return_generic_message() {
        let err = HandlerError::YamlError(serde_yaml::from_str::<u32>("- not a number").unwrap_err());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse::from(&err);
        assert_eq!(body.error, "Internal server error");
        assert_eq!(body.details, None);
    }

    #[test]
    fn client_errors_keep_their_message() {
        let body = ErrorResponse::from(&HandlerError::not_found("Flash sale not found"));
        assert_eq!(body.error, "Not found: Flash sale not found");
    }
}
