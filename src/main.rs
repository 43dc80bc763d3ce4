mod constants;
mod errors;
mod middlewares;
mod models;
mod routes;
mod state;
#[cfg(test)]
mod tests;
mod utils;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware,
    routing::get,
    Router,
};
use lambda_http::{run, tracing, Error};
use state::AppState;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

#[derive(OpenApi)]
#[openapi(info(
    title = "flash-sale-rs",
    description = "Flash sale inventory and analytics engine"
))]
struct ApiDoc;

async fn health_check() -> (StatusCode, String) {
    let health = true;
    match health {
        true => (StatusCode::OK, "Healthy!".to_string()),
        false => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Not healthy!".to_string(),
        ),
    }
}

pub async fn create_service(state: Arc<AppState>) -> Result<Router, Error> {
    let admin = routes::admin::router().layer(middleware::from_fn_with_state(
        state.clone(),
        middlewares::auth::auth_middleware,
    ));

    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/v1/flash-sales", routes::storefront::router())
        .nest("/v1/admin/flash-sales", admin)
        .split_for_parts();

    let spec = api.to_yaml()?;

    let trace_layer =
        TraceLayer::new_for_http().on_request(|req: &Request<Body>, _: &tracing::Span| {
            let path = req.uri().path();
            tracing::info!("Got request with path: {}", path);
        });

    let app = router
        .route("/v1/health", get(health_check))
        .route("/v1/openapi.yaml", get(move || async move { spec }))
        .layer(trace_layer)
        .with_state(state);

    Ok(app)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    tracing::info!("Flash Sale API Handler Start!!!");

    let state = Arc::new(AppState::new().await?);
    let app = create_service(state).await?;

    run(app).await
}
