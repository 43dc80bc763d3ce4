mod storefront;

use std::sync::Arc;

use axum::{
    body::{Body, HttpBody},
    extract::Request,
    response::Response,
};
use chrono::Duration;
use lambda_http::Error;
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    constants::JWT_AUDIENCE,
    models::auth::{Claim, Role},
    state::AppState,
};

// base64 of "test-secret-for-flash-sale-tests"
pub(crate) const TEST_JWT_SECRET: &str = "dGVzdC1zZWNyZXQtZm9yLWZsYXNoLXNhbGUtdGVzdHM=";

async fn test_state() -> Result<Arc<AppState>, Error> {
    if std::env::var("JWT_SECRET").is_err() {
        std::env::set_var("JWT_SECRET", TEST_JWT_SECRET);
    }
    Ok(Arc::new(AppState::test().await?))
}

fn mint_token(state: &AppState, role: Role) -> Result<String, Error> {
    let now = chrono::Local::now();
    let claim = Claim {
        id: "user_test",
        email: "admin@test.org",
        role,
        aud: JWT_AUDIENCE,
        iat: now.timestamp() as u64,
        exp: (now + Duration::hours(1)).timestamp() as u64,
    };
    let token = jsonwebtoken::encode(&state.jwt.2, &claim, &state.jwt.0)?;
    Ok(token)
}

async fn parse_resp<T: DeserializeOwned>(resp: Response<Body>) -> Result<T, Error> {
    let body = resp.into_body();
    let limit = body.size_hint().upper().unwrap_or(u64::MAX) as usize;
    let data = axum::body::to_bytes(body, limit).await?;
    let res: T = serde_json::from_slice(&data)?;

    Ok(res)
}

fn build_request<T: Serialize>(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<T>,
) -> Result<Request<Body>, Error> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let req = match body {
        Some(v) => {
            let content = serde_json::to_string(&v)?;
            builder
                .header("Content-Type", "application/json")
                .body(Body::new(content))
        }
        None => builder.body(Body::empty()),
    }?;
    Ok(req)
}
