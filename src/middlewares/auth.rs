use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{self, HeaderMap},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, Validation};

use crate::{constants::JWT_AUDIENCE, errors::HandlerError, models::auth::ClaimOwned, state::AppState};

fn bearer_token(headers: &HeaderMap) -> Result<&str, HandlerError> {
    let header = headers
        .get(http::header::AUTHORIZATION)
        .ok_or_else(|| HandlerError::auth("Missing authorization header."))?
        .to_str()
        .map_err(|e| HandlerError::auth(format!("Malformed authorization header: {}", e)))?;

    // header should be "Bearer ..."
    let mut it = header.split_whitespace();
    let (_, token) = (it.next(), it.next());
    token.ok_or_else(|| HandlerError::auth("Empty token value"))
}

fn decode_claim(state: &AppState, token: &str) -> Result<ClaimOwned, HandlerError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[JWT_AUDIENCE]);
    let data = jsonwebtoken::decode::<ClaimOwned>(token, &state.jwt.1, &validation)
        .map_err(|e| HandlerError::auth(format!("Failed to decode JWT token: {}", e)))?;
    Ok(data.claims)
}

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response<Body>, HandlerError> {
    let token = bearer_token(req.headers())?;
    let claim = decode_claim(&state, token)?;
    req.extensions_mut().insert(claim);

    Ok(next.run(req).await)
}

/// Best-effort identity for public telemetry endpoints: a missing or invalid
/// token is simply an anonymous caller.
pub fn optional_claim(state: &AppState, headers: &HeaderMap) -> Option<ClaimOwned> {
    let token = bearer_token(headers).ok()?;
    decode_claim(state, token).ok()
}
