use std::env;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header};
use lambda_http::Error;

use crate::constants::{DEFAULT_REGION, TEST_STORE_ENDPOINT};

pub struct AppState {
    pub aws_config: SdkConfig,
    pub jwt: (EncodingKey, DecodingKey, Header),
}

fn jwt_keys() -> Result<(EncodingKey, DecodingKey, Header), Error> {
    let secret = env::var("JWT_SECRET").map_err(|e| e.to_string())?;
    Ok((
        EncodingKey::from_base64_secret(&secret)?,
        DecodingKey::from_base64_secret(&secret)?,
        Header::new(Algorithm::HS256),
    ))
}

impl AppState {
    /// Record-store config comes from the environment: AWS_REGION and, for
    /// non-AWS deployments, STORE_ENDPOINT.
    pub async fn new() -> Result<Self, Error> {
        let region = env::var("AWS_REGION").unwrap_or_else(|_| DEFAULT_REGION.to_string());
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region));
        if let Ok(endpoint) = env::var("STORE_ENDPOINT") {
            loader = loader.endpoint_url(endpoint);
        }

        Ok(Self {
            aws_config: loader.load().await,
            jwt: jwt_keys()?,
        })
    }

    /// Points at DynamoDB Local.
    pub async fn test() -> Result<Self, Error> {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(TEST_STORE_ENDPOINT)
            .region(Region::new("test"))
            .load()
            .await;

        Ok(Self {
            aws_config: config,
            jwt: jwt_keys()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn config_honors_store_env_overrides() {
        if env::var("JWT_SECRET").is_err() {
            env::set_var("JWT_SECRET", crate::tests::TEST_JWT_SECRET);
        }
        env::set_var("AWS_REGION", "ap-southeast-1");
        env::set_var("STORE_ENDPOINT", "http://localhost:4566");

        let state = AppState::new().await.unwrap();
        assert_eq!(
            state.aws_config.endpoint_url(),
            Some("http://localhost:4566")
        );
        assert_eq!(
            state.aws_config.region().map(|r| r.as_ref()),
            Some("ap-southeast-1")
        );

        env::remove_var("AWS_REGION");
        env::remove_var("STORE_ENDPOINT");
    }

    #[tokio::test]
    async fn test_state_targets_dynamodb_local() {
        if env::var("JWT_SECRET").is_err() {
            env::set_var("JWT_SECRET", crate::tests::TEST_JWT_SECRET);
        }
        let state = AppState::test().await.unwrap();
        assert_eq!(
            state.aws_config.endpoint_url(),
            Some(crate::constants::TEST_STORE_ENDPOINT)
        );
    }
}
