//! Direct REST client for a Results endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use super::{named_path, ListRecordsRequest, ListRecordsResponse, ResultsClient, RESULTS_GROUP, RESULTS_VERSION};
use crate::error::{Result, ResultsError};
use crate::record::StoredRecord;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Results client speaking REST to a fixed base URL.
#[derive(Clone)]
pub struct HttpResultsClient {
    client: Client,
    /// Normalised API root, always ending without a slash.
    base_url: String,
    bearer_token: Option<String>,
}

impl std::fmt::Debug for HttpResultsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResultsClient")
            .field("base_url", &self.base_url)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl HttpResultsClient {
    /// Create a client for `base_url`.
    ///
    /// # Arguments
    /// * `base_url` - Results endpoint; `https` is assumed when no scheme is given
    /// * `bearer_token` - optional token sent as `Authorization: Bearer`
    /// * `insecure_skip_verify` - accept any TLS certificate
    ///
    /// # Errors
    /// Returns [`ResultsError::Config`] for an unusable URL and
    /// [`ResultsError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, bearer_token: Option<String>, insecure_skip_verify: bool) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .default_headers(headers)
            .danger_accept_invalid_certs(insecure_skip_verify)
            .build()?;

        if insecure_skip_verify {
            warn!(base_url = %base_url, "TLS verification disabled for Results API");
        }

        Ok(Self {
            client,
            base_url,
            bearer_token: bearer_token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// Normalised API root requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, path: &str, query: &[(&'static str, String)]) -> Result<Vec<u8>> {
        let url = format!("{}/{path}", self.base_url);
        debug!(url = %url, "GET request");

        let mut request = self.client.get(&url).query(query);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        let status = response.status();
        let body = response.bytes().await?;
        if status.is_success() {
            Ok(body.to_vec())
        } else {
            Err(ResultsError::from_status(status.as_u16(), &String::from_utf8_lossy(&body)))
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<T> {
        let body = self.get(path, query).await?;
        serde_json::from_slice(&body).map_err(|e| {
            warn!(error = %e, path = %path, "Failed to parse response");
            ResultsError::Serialization(e)
        })
    }
}

#[async_trait]
impl ResultsClient for HttpResultsClient {
    async fn get_record(&self, record_name: &str) -> Result<StoredRecord> {
        let path = named_path(record_name, "record name")?;
        self.get_json(&path, &[]).await
    }

    async fn list_records(&self, request: &ListRecordsRequest) -> Result<ListRecordsResponse> {
        let path = request.path()?;
        self.get_json(&path, &request.query()).await
    }

    async fn get_log(&self, log_path: &str) -> Result<Vec<u8>> {
        let path = named_path(log_path, "log path")?;
        self.get(&path, &[]).await
    }
}

/// Normalise a user supplied Results endpoint into the API root.
///
/// # Errors
/// Returns [`ResultsError::Config`] when the URL cannot be parsed or has no host.
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ResultsError::Config("base URL is empty".to_string()));
    }
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };

    let mut url = Url::parse(&with_scheme)
        .map_err(|e| ResultsError::Config(format!("invalid base URL {raw:?}: {e}")))?;
    if url.host_str().unwrap_or_default().is_empty() {
        return Err(ResultsError::Config(format!("base URL {raw:?} has no host")));
    }

    let path = url.path().trim_end_matches('/').to_string();
    if path.contains(RESULTS_GROUP) {
        url.set_path(&path);
    } else {
        url.set_path(&format!("{path}/apis/{RESULTS_GROUP}/{RESULTS_VERSION}"));
    }
    url.set_query(None);
    url.set_fragment(None);

    Ok(url.as_str().trim_end_matches('/').to_string())
}
