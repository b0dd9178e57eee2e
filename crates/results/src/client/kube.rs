//! Results client routed through the Kubernetes API server.
//!
//! Tekton Results registers itself as an aggregated API, so the same REST
//! paths are reachable under `/apis/results.tekton.dev/v1alpha2` on the API
//! server. Authentication and TLS come from the kubeconfig.

use async_trait::async_trait;
use kube::Client;
use tracing::{debug, warn};

use super::{named_path, ListRecordsRequest, ListRecordsResponse, ResultsClient, RESULTS_GROUP, RESULTS_VERSION};
use crate::error::{Result, ResultsError};
use crate::record::StoredRecord;

/// Results client using the Kubernetes aggregation layer.
#[derive(Clone)]
pub struct KubeResultsClient {
    client: Client,
}

impl KubeResultsClient {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the default kubeconfig or in-cluster environment.
    ///
    /// # Errors
    /// Returns [`ResultsError::Kube`] when no cluster configuration can be inferred.
    pub async fn try_default() -> Result<Self> {
        Ok(Self::new(Client::try_default().await?))
    }

    async fn get(&self, path: &str, query: &[(&'static str, String)]) -> Result<String> {
        let uri = request_uri(path, query);
        debug!(uri = %uri, "GET request via API server");

        let request = http::Request::get(&uri)
            .header(http::header::ACCEPT, "application/json")
            .body(Vec::new())
            .map_err(kube::Error::HttpError)?;

        match self.client.request_text(request).await {
            Ok(text) => Ok(text),
            Err(kube::Error::Api(e)) => Err(ResultsError::from_status(e.code, &e.message)),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<T> {
        let text = self.get(path, query).await?;
        serde_json::from_str(&text).map_err(|e| {
            warn!(error = %e, path = %path, "Failed to parse response");
            ResultsError::Serialization(e)
        })
    }
}

#[async_trait]
impl ResultsClient for KubeResultsClient {
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
        Ok(self.get(&path, &[]).await?.into_bytes())
    }
}

/// API server relative URI for a Results REST path.
fn request_uri(path: &str, query: &[(&'static str, String)]) -> String {
    let mut uri = format!("/apis/{RESULTS_GROUP}/{RESULTS_VERSION}/{path}");
    if !query.is_empty() {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())))
            .finish();
        uri.push('?');
        uri.push_str(&encoded);
    }
    uri
}
