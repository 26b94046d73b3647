//! HTTP delivery of the package document.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use tracing::{debug, info};

use crate::traits::{HarvestError, Transmitter};

/// Posts documents as `application/json`. Only `200 OK` counts as delivered.
#[derive(Debug, Clone, Default)]
pub struct HttpTransmitter {
    client: reqwest::Client,
}

impl HttpTransmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transmitter for HttpTransmitter {
    async fn transmit(&self, url: &str, body: Vec<u8>) -> Result<(), HarvestError> {
        info!("Sending POST request to server {}", url);
        debug!(bytes = body.len(), "Request body prepared");

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| HarvestError::TransmissionFailure {
                url: url.to_string(),
                status: None,
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(HarvestError::TransmissionFailure {
                url: url.to_string(),
                status: Some(status.as_u16()),
                reason: format!("HTTP error code: {}", status),
            });
        }

        info!("Successfully sent data");
        Ok(())
    }
}
