//! OVH DynHost provider.

use super::{DynHostProvider, DynHostRecord, RecordId};
use crate::config::{OvhConfig, Target};
use crate::error::{DdnsError, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Response, Url};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Path pattern every DynHost call falls under.
const ZONE_PATH: &str = "/domain/zone/*";

/// OVH API client, shared by reference for the whole run.
pub struct OvhClient {
    client: reqwest::Client,
    base_url: String,
    application_key: String,
    application_secret: String,
    consumer_key: Option<String>,
    /// Server time minus local time, fetched on the first signed call.
    time_delta: OnceCell<i64>,
}

/// One method/path pair a consumer key is allowed to use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRule {
    pub method: String,
    pub path: String,
}

/// Pending consumer key, valid once the operator visits `validation_url`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRequest {
    pub validation_url: String,
    pub consumer_key: String,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CredentialBody<'a> {
    access_rules: &'a [AccessRule],
    #[serde(skip_serializing_if = "Option::is_none")]
    redirection: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct OvhError {
    message: String,
}

/// Access rules needed to read and update DynHost records.
pub fn dynhost_access_rules() -> Vec<AccessRule> {
    ["GET", "PUT"]
        .into_iter()
        .map(|method| AccessRule {
            method: method.to_string(),
            path: ZONE_PATH.to_string(),
        })
        .collect()
}

impl OvhClient {
    /// Create a client for `base_url` (e.g. "https://eu.api.ovh.com/1.0").
    pub fn new(
        base_url: String,
        application_key: String,
        application_secret: String,
        consumer_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            application_key,
            application_secret,
            consumer_key,
            time_delta: OnceCell::new(),
        }
    }

    /// Create a client from the `[ovh]` configuration table.
    ///
    /// Application key and secret are mandatory; the consumer key is not,
    /// since `auth` is how one gets it.
    pub fn from_config(config: &OvhConfig, timeout: Duration) -> Result<Self> {
        let (application_key, application_secret) = config.application_credentials()?;
        Ok(Self::new(
            config.endpoint_url()?,
            application_key,
            application_secret,
            config.consumer_key().ok(),
            timeout,
        ))
    }

    /// Ask OVH for a new consumer key restricted to `rules`.
    pub async fn request_consumer_key(
        &self,
        rules: &[AccessRule],
        redirection: Option<&str>,
    ) -> Result<CredentialRequest> {
        tracing::debug!("Requesting new consumer key with {} access rules", rules.len());

        let response = self
            .client
            .post(format!("{}/auth/credential", self.base_url))
            .header("X-Ovh-Application", &self.application_key)
            .json(&CredentialBody {
                access_rules: rules,
                redirection,
            })
            .send()
            .await?;

        let body = read_body(response).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Compute the `X-Ovh-Signature` header value.
    pub(crate) fn sign(
        &self,
        consumer_key: &str,
        method: &Method,
        url: &str,
        body: &str,
        timestamp: i64,
    ) -> String {
        let payload = format!(
            "{}+{}+{}+{}+{}+{}",
            self.application_secret,
            consumer_key,
            method.as_str(),
            url,
            body,
            timestamp
        );
        format!("$1${}", hex::encode(Sha1::digest(payload.as_bytes())))
    }

    async fn time_delta(&self) -> Result<i64> {
        self.time_delta
            .get_or_try_init(|| async {
                let response = self
                    .client
                    .get(format!("{}/auth/time", self.base_url))
                    .send()
                    .await?;
                let body = read_body(response).await?;
                let server_time: i64 = serde_json::from_str(body.trim())?;
                let delta = server_time - chrono::Utc::now().timestamp();
                tracing::debug!("OVH server time delta is {}s", delta);
                Ok::<_, DdnsError>(delta)
            })
            .await
            .copied()
    }

    fn url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        let raw = format!("{}{}", self.base_url, path);
        let url = if params.is_empty() {
            Url::parse(&raw)
        } else {
            Url::parse_with_params(&raw, params)
        };
        url.map_err(|e| DdnsError::Config(format!("invalid API URL {}: {}", raw, e)))
    }

    /// Perform a signed call and return the raw response body.
    async fn call(&self, method: Method, url: Url, body: Option<String>) -> Result<String> {
        let consumer_key = self.consumer_key.as_deref().ok_or_else(|| {
            DdnsError::Config("no consumer key configured, run `ovh-dynhost auth` first".to_string())
        })?;

        let body = body.unwrap_or_default();
        let timestamp = chrono::Utc::now().timestamp() + self.time_delta().await?;
        let signature = self.sign(consumer_key, &method, url.as_str(), &body, timestamp);

        let mut request = self
            .client
            .request(method, url)
            .header("X-Ovh-Application", &self.application_key)
            .header("X-Ovh-Consumer", consumer_key)
            .header("X-Ovh-Timestamp", timestamp.to_string())
            .header("X-Ovh-Signature", signature);

        if !body.is_empty() {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        read_body(request.send().await?).await
    }
}

/// Return the body of a successful response, or the OVH error message.
async fn read_body(response: Response) -> Result<String> {
    let status = response.status();
    let text = response.text().await?;

    if status.is_success() {
        return Ok(text);
    }

    let message = serde_json::from_str::<OvhError>(&text)
        .map(|e| e.message)
        .unwrap_or_else(|_| text.trim().to_string());

    Err(DdnsError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl DynHostProvider for OvhClient {
    fn name(&self) -> &'static str {
        "ovh"
    }

    async fn find_record(&self, target: &Target) -> Result<RecordId> {
        tracing::debug!("Getting ID of record {}", target.display_name());

        let subdomain = target.subdomain.clone().unwrap_or_default();
        let url = self.url(
            &format!("/domain/zone/{}/dynHost/record", target.domain),
            &[("subDomain", subdomain.as_str())],
        )?;

        let body = self.call(Method::GET, url, None).await?;
        let ids: Vec<RecordId> = serde_json::from_str(&body)?;

        match ids.as_slice() {
            [id] => Ok(*id),
            [] => Err(DdnsError::RecordNotFound {
                zone: target.domain.clone(),
                subdomain,
            }),
            _ => {
                tracing::debug!("Matching records: {:?}", ids);
                Err(DdnsError::AmbiguousRecord {
                    zone: target.domain.clone(),
                    subdomain,
                    count: ids.len(),
                })
            }
        }
    }

    async fn read_record(&self, zone: &str, id: RecordId) -> Result<DynHostRecord> {
        tracing::debug!("Getting record {} in zone {}", id, zone);

        let url = self.url(&format!("/domain/zone/{}/dynHost/record/{}", zone, id), &[])?;
        let body = self.call(Method::GET, url, None).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn update_record(&self, zone: &str, id: RecordId, ip: Ipv4Addr) -> Result<()> {
        tracing::info!("Update dynhost record {}:{} with IP {}", zone, id, ip);

        let url = self.url(&format!("/domain/zone/{}/dynHost/record/{}", zone, id), &[])?;
        let body = serde_json::json!({ "ip": ip.to_string() }).to_string();
        self.call(Method::PUT, url, Some(body)).await?;
        Ok(())
    }
}
