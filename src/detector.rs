//! Public IP detection.

use crate::error::{DdnsError, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::net::Ipv4Addr;
use std::time::Duration;

const DEFAULT_SERVICE: &str = "https://api.ipify.org";

/// Anything able to tell us the current public IPv4 address.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Resolve the current public IPv4 address.
    async fn current_ipv4(&self) -> Result<Ipv4Addr>;
}

/// IP detector backed by a single plain-text echo service.
pub struct IpDetector {
    client: reqwest::Client,
    service: String,
}

impl IpDetector {
    /// Create a new IP detector using api.ipify.org.
    pub fn new(timeout: Duration) -> Self {
        Self::with_service(DEFAULT_SERVICE.to_string(), timeout)
    }

    /// Create a new IP detector with a custom echo service.
    pub fn with_service(service: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self { client, service }
    }

    pub fn service(&self) -> &str {
        &self.service
    }
}

#[async_trait]
impl IpSource for IpDetector {
    async fn current_ipv4(&self) -> Result<Ipv4Addr> {
        tracing::debug!("Retrieving current IP address from {}", self.service);

        let response = self.client.get(&self.service).send().await?;

        if response.status() != StatusCode::OK {
            return Err(DdnsError::Api {
                status: response.status().as_u16(),
                message: format!("unexpected status from {}", self.service),
            });
        }

        let text = response.text().await?;
        parse_ipv4(&text)
    }
}

/// Validate an echo service body as a dotted-quad IPv4 address.
pub fn parse_ipv4(body: &str) -> Result<Ipv4Addr> {
    let ip_str = body.trim();
    ip_str
        .parse()
        .map_err(|_| DdnsError::InvalidIp(ip_str.to_string()))
}
