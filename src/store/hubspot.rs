use super::{ObjectStore, PropertyMap, PropertyMetadata, RecordSnapshot, StoreError};
use crate::config::ClientConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;
use url::Url;

/// CRM v3 REST client authenticated with a private-app bearer token.
pub struct HubSpotStore {
    http: reqwest::Client,
    base_url: Url,
    access_token: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct RemoteErrorBody {
    message: Option<String>,
    category: Option<String>,
    #[serde(rename = "correlationId")]
    correlation_id: Option<String>,
}

impl HubSpotStore {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            access_token: config.access_token.clone(),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(&ClientConfig::from_env()?)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                StoreError::new(None, "INVALID_URL", format!("Bad API base URL: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, StoreError> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| {
                StoreError::new(e.status().map(|s| s.as_u16()), "NETWORK_ERROR", e.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(|e| {
                StoreError::new(Some(status.as_u16()), "INVALID_RESPONSE", e.to_string())
            });
        }

        let body = response.text().await.unwrap_or_default();
        Err(remote_error(status.as_u16(), &body))
    }
}

fn remote_error(status: u16, body: &str) -> StoreError {
    let parsed: RemoteErrorBody = serde_json::from_str(body).unwrap_or_default();
    StoreError {
        status: Some(status),
        category: parsed.category,
        message: parsed
            .message
            .unwrap_or_else(|| format!("HTTP {}: {}", status, body)),
        correlation_id: parsed.correlation_id,
    }
}

#[async_trait]
impl ObjectStore for HubSpotStore {
    async fn get_property_metadata(
        &self,
        object_type: &str,
        property_name: &str,
    ) -> Result<PropertyMetadata, StoreError> {
        let url = self.endpoint(&["crm", "v3", "properties", object_type, property_name])?;
        debug!(%url, "GET property metadata");
        self.execute(self.http.get(url)).await
    }

    async fn get_record_by_id(
        &self,
        object_type: &str,
        record_id: &str,
        property_names: &[String],
    ) -> Result<RecordSnapshot, StoreError> {
        let mut url = self.endpoint(&["crm", "v3", "objects", object_type, record_id])?;
        if !property_names.is_empty() {
            url.query_pairs_mut()
                .append_pair("properties", &property_names.join(","));
        }
        debug!(%url, "GET record");
        self.execute(self.http.get(url)).await
    }

    async fn update_record_properties(
        &self,
        object_type: &str,
        record_id: &str,
        properties: PropertyMap,
    ) -> Result<RecordSnapshot, StoreError> {
        let url = self.endpoint(&["crm", "v3", "objects", object_type, record_id])?;
        debug!(%url, "PATCH record");
        let body = serde_json::json!({ "properties": properties });
        self.execute(self.http.patch(url).json(&body)).await
    }
}
