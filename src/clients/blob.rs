use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use std::time::Duration;
use url::Url;

use crate::error::ProbeError;

const API_VERSION: &str = "2021-08-06";
const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

/// Opens a container on some blob service.
pub trait BlobConnector: Send + Sync {
    fn open(&self, endpoint: &str, container: &str) -> Result<Box<dyn BlobContainer>, ProbeError>;
}

/// One container's worth of blob operations.
#[async_trait]
pub trait BlobContainer: Send + Sync {
    /// Create the container unless it already exists.
    async fn ensure_exists(&self) -> Result<(), ProbeError>;
    async fn get(&self, blob: &str) -> Result<Vec<u8>, ProbeError>;
    /// Delete the blob. A missing blob is not an error.
    async fn delete(&self, blob: &str) -> Result<(), ProbeError>;
    /// Upload the blob, returning its new ETag.
    async fn put(&self, blob: &str, data: Vec<u8>) -> Result<String, ProbeError>;
}

/// Where the service lives and how requests are authorised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobEndpoint {
    pub base: Url,
    pub sas: Option<String>,
}

impl BlobEndpoint {
    /// Accepts either a service URL (optionally carrying a SAS query) or a
    /// `Key=Value;...` connection string.
    pub fn parse(endpoint: &str) -> Result<Self, ProbeError> {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            let mut base = Url::parse(endpoint)
                .map_err(|e| ProbeError::blob(format!("endpoint {endpoint:?}: {e}")))?;
            let sas = base.query().map(str::to_string);
            base.set_query(None);
            return Ok(Self { base, sas });
        }
        Self::from_connection_string(endpoint)
    }

    fn from_connection_string(conn: &str) -> Result<Self, ProbeError> {
        let mut blob_endpoint = None;
        let mut sas = None;
        let mut account = None;
        let mut account_key = false;
        let mut protocol = "https";
        let mut suffix = DEFAULT_ENDPOINT_SUFFIX;

        for part in conn.split(';').filter(|p| !p.trim().is_empty()) {
            let Some((key, value)) = part.split_once('=') else {
                return Err(ProbeError::blob(format!("malformed connection string segment {part:?}")));
            };
            match key.trim() {
                "BlobEndpoint" => blob_endpoint = Some(value.trim()),
                "SharedAccessSignature" => sas = Some(value.trim().trim_start_matches('?').to_string()),
                "AccountName" => account = Some(value.trim()),
                "AccountKey" => account_key = true,
                "DefaultEndpointsProtocol" => protocol = value.trim(),
                "EndpointSuffix" => suffix = value.trim(),
                _ => {}
            }
        }

        if sas.is_none() && account_key {
            return Err(ProbeError::blob(
                "account-key connection strings are not supported; use a SharedAccessSignature",
            ));
        }

        let base = match (blob_endpoint, account) {
            (Some(url), _) => url.to_string(),
            (None, Some(account)) => format!("{protocol}://{account}.blob.{suffix}"),
            (None, None) => {
                return Err(ProbeError::blob(
                    "connection string needs BlobEndpoint or AccountName",
                ));
            }
        };
        let base = Url::parse(&base).map_err(|e| ProbeError::blob(format!("endpoint {base:?}: {e}")))?;
        Ok(Self { base, sas })
    }

    /// Resource URL for the given path segments plus an optional extra query.
    pub fn url(&self, segments: &[&str], query: Option<&str>) -> Result<Url, ProbeError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ProbeError::blob(format!("endpoint {} cannot hold a path", self.base)))?
            .pop_if_empty()
            .extend(segments);

        let parts: Vec<&str> = query.into_iter().chain(self.sas.as_deref()).collect();
        if !parts.is_empty() {
            url.set_query(Some(&parts.join("&")));
        }
        Ok(url)
    }
}

/// Talks to an Azure-compatible blob REST API.
pub struct AzureBlobConnector {
    client: reqwest::Client,
}

impl AzureBlobConnector {
    pub fn new(connect_timeout: Duration) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl BlobConnector for AzureBlobConnector {
    fn open(&self, endpoint: &str, container: &str) -> Result<Box<dyn BlobContainer>, ProbeError> {
        Ok(Box::new(AzureContainer {
            client: self.client.clone(),
            endpoint: BlobEndpoint::parse(endpoint)?,
            container: container.to_string(),
        }))
    }
}

struct AzureContainer {
    client: reqwest::Client,
    endpoint: BlobEndpoint,
    container: String,
}

impl AzureContainer {
    fn blob_url(&self, blob: &str) -> Result<Url, ProbeError> {
        self.endpoint.url(&[&self.container, blob], None)
    }
}

async fn service_error(op: &str, response: Response) -> ProbeError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    ProbeError::blob(format!(
        "{op} returned {} {}: {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or(""),
        body.trim()
    ))
}

#[async_trait]
impl BlobContainer for AzureContainer {
    async fn ensure_exists(&self) -> Result<(), ProbeError> {
        let url = self.endpoint.url(&[&self.container], Some("restype=container"))?;
        let response = self
            .client
            .put(url)
            .header("x-ms-version", API_VERSION)
            .header(reqwest::header::CONTENT_LENGTH, 0)
            .send()
            .await?;
        match response.status() {
            StatusCode::CREATED | StatusCode::CONFLICT => Ok(()),
            _ => Err(service_error("create container", response).await),
        }
    }

    async fn get(&self, blob: &str) -> Result<Vec<u8>, ProbeError> {
        let response = self
            .client
            .get(self.blob_url(blob)?)
            .header("x-ms-version", API_VERSION)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(service_error("download", response).await);
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn delete(&self, blob: &str) -> Result<(), ProbeError> {
        let response = self
            .client
            .delete(self.blob_url(blob)?)
            .header("x-ms-version", API_VERSION)
            .send()
            .await?;
        match response.status() {
            s if s.is_success() || s == StatusCode::NOT_FOUND => Ok(()),
            _ => Err(service_error("delete", response).await),
        }
    }

    async fn put(&self, blob: &str, data: Vec<u8>) -> Result<String, ProbeError> {
        let response = self
            .client
            .put(self.blob_url(blob)?)
            .header("x-ms-version", API_VERSION)
            .header("x-ms-blob-type", "BlockBlob")
            .body(data)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(service_error("upload", response).await);
        }
        let etag = response
            .headers()
            .get(reqwest::header::ETAG)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        Ok(etag)
    }
}
