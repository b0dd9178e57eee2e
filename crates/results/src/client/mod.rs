//! Transport collaborators for the Results API.
//!
//! The resolver only depends on [`ResultsClient`]. Two implementations ship
//! with the crate:
//!
//! - [`HttpResultsClient`] talks to a Results endpoint directly with `reqwest`.
//! - [`KubeResultsClient`] goes through the Kubernetes API server's
//!   aggregation layer and reuses the kubeconfig's authentication.

mod http;
mod kube;

pub use self::http::{normalize_base_url, HttpResultsClient};
pub use self::kube::KubeResultsClient;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{Result, ResultsError};
use crate::record::StoredRecord;

/// API group served by Tekton Results.
pub const RESULTS_GROUP: &str = "results.tekton.dev";

/// API version served by Tekton Results.
pub const RESULTS_VERSION: &str = "v1alpha2";

/// Sort order that yields newest records first.
pub const ORDER_NEWEST_FIRST: &str = "create_time desc";

/// One page request against the record list API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRecordsRequest {
    /// Parent scope, e.g. `foo/results/-`.
    pub parent: String,
    /// CEL filter expression.
    pub filter: String,
    pub order_by: String,
    /// Zero leaves the page size to the server.
    pub page_size: u32,
    /// Continuation token from the previous page.
    pub page_token: String,
    /// Field projection.
    pub fields: String,
}

impl ListRecordsRequest {
    /// Relative path of the list endpoint.
    ///
    /// # Errors
    /// Returns [`ResultsError::InvalidArgument`] when no parent is set.
    pub fn path(&self) -> Result<String> {
        if self.parent.trim().is_empty() {
            return Err(ResultsError::InvalidArgument("parent is required".to_string()));
        }
        Ok(format!("{}/records", parents_path(&self.parent)))
    }

    /// Query parameters, omitting unset values.
    #[must_use]
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if !self.filter.is_empty() {
            query.push(("filter", self.filter.clone()));
        }
        if !self.order_by.is_empty() {
            query.push(("order_by", self.order_by.clone()));
        }
        if self.page_size > 0 {
            query.push(("page_size", self.page_size.to_string()));
        }
        if !self.page_token.is_empty() {
            query.push(("page_token", self.page_token.clone()));
        }
        if !self.fields.is_empty() {
            query.push(("fields", self.fields.clone()));
        }
        query
    }
}

/// One page of records.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRecordsResponse {
    #[serde(default)]
    pub records: Vec<StoredRecord>,
    /// Empty when there are no further pages.
    #[serde(default)]
    pub next_page_token: String,
}

/// Read-only access to the Results API.
#[async_trait]
pub trait ResultsClient: Send + Sync {
    /// Fetch a single record by its storage address.
    async fn get_record(&self, record_name: &str) -> Result<StoredRecord>;

    /// Fetch one page of records.
    async fn list_records(&self, request: &ListRecordsRequest) -> Result<ListRecordsResponse>;

    /// Fetch the raw log payload stored at `log_path`.
    async fn get_log(&self, log_path: &str) -> Result<Vec<u8>>;
}

/// Relative REST path for a resource name: `parents/<name>`.
pub(crate) fn parents_path(name: &str) -> String {
    format!("parents/{}", name.trim_start_matches('/'))
}

/// Validate and map a record or log name to its REST path.
pub(crate) fn named_path(name: &str, what: &str) -> Result<String> {
    if name.trim().is_empty() {
        return Err(ResultsError::InvalidArgument(format!("{what} is required")));
    }
    Ok(parents_path(name))
}
