//! IP geolocation provider client

use async_trait::async_trait;

use super::LocationResolver;
use crate::error::AlertError;

/// Looks up coordinates from an endpoint answering `lat,long` as plain text
#[derive(Clone)]
pub struct IpInfoResolver {
    client: reqwest::Client,
    endpoint: String,
}

impl IpInfoResolver {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl LocationResolver for IpInfoResolver {
    async fn lookup(&self) -> Result<String, AlertError> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| AlertError::Dispatch(e.to_string()))?;

        response
            .text()
            .await
            .map_err(|e| AlertError::Dispatch(e.to_string()))
    }
}
