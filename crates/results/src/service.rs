//! Run listing and resolution against the Results API.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::client::{ListRecordsRequest, ResultsClient, ORDER_NEWEST_FIRST};
use crate::error::{Result, ResultsError};
use crate::filter::build_filter_expression;
use crate::kind::RunKind;
use crate::paginate::{with_cancel, PageWalker};
use crate::record::{direct_record_address, log_address, StoredRecord};
use crate::run::{RunDetail, RunSummary};
use crate::selector::{matches_labels, parse_label_selector, LabelMap, ListOptions, NamespaceScope, RunSelector};

/// Namespace used when neither the caller nor the configuration names one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Default number of runs returned by a listing.
pub const DEFAULT_LIST_LIMIT: usize = 50;

/// Largest page requested from the store.
pub const MAX_PAGE_SIZE: usize = 200;

/// Page size of the resolution scan.
const SCAN_PAGE_SIZE: u32 = 50;

/// A second match is enough to decide between "unique" and "ambiguous".
const SCAN_MATCH_LIMIT: usize = 2;

const LIST_FIELDS: &str =
    "records.name,records.uid,records.data.value.metadata,records.data.value.status,next_page_token";

const SCAN_FIELDS: &str = "records.name,records.uid,records.data.value";

/// Read-only access to runs stored in Tekton Results.
#[derive(Clone)]
pub struct Service {
    client: Arc<dyn ResultsClient>,
    default_namespace: String,
}

impl Service {
    #[must_use]
    pub fn new(client: Arc<dyn ResultsClient>) -> Self {
        Self {
            client,
            default_namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }

    /// Namespace used for direct lookups when the selector names none.
    #[must_use]
    pub fn with_default_namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        if !namespace.trim().is_empty() {
            self.default_namespace = namespace.trim().to_string();
        }
        self
    }

    #[must_use]
    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    /// List the most recent runs of `kind`, newest first.
    ///
    /// # Errors
    /// Fails on a malformed label selector, a transport failure, a record
    /// that cannot be decoded or cancellation.
    pub async fn list_runs(
        &self,
        kind: RunKind,
        options: &ListOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<RunSummary>> {
        let labels = parse_label_selector(&options.label_selector)?;
        let limit = if options.limit == 0 {
            DEFAULT_LIST_LIMIT
        } else {
            options.limit
        };
        let scope = NamespaceScope::parse(&options.namespace);

        let request = ListRecordsRequest {
            parent: scope.parent(),
            filter: build_filter_expression(kind, &labels, None),
            order_by: ORDER_NEWEST_FIRST.to_string(),
            page_size: page_size(limit.min(MAX_PAGE_SIZE)),
            page_token: String::new(),
            fields: LIST_FIELDS.to_string(),
        };

        PageWalker::new(request, limit)
            .shrink_to_budget()
            .collect(self.client.as_ref(), cancel, |record| {
                let run = record.decode_run()?;
                if !matches_labels(run.metadata.labels(), &labels) {
                    return Ok(None);
                }
                if !options.prefix.is_empty() && !run.metadata.name.starts_with(&options.prefix) {
                    return Ok(None);
                }
                Ok(Some(RunSummary::new(&run, record)))
            })
            .await
    }

    /// List PipelineRuns.
    ///
    /// # Errors
    /// See [`Service::list_runs`].
    pub async fn list_pipeline_runs(
        &self,
        options: &ListOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<RunSummary>> {
        self.list_runs(RunKind::PipelineRun, options, cancel).await
    }

    /// List TaskRuns.
    ///
    /// # Errors
    /// See [`Service::list_runs`].
    pub async fn list_task_runs(&self, options: &ListOptions, cancel: &CancellationToken) -> Result<Vec<RunSummary>> {
        self.list_runs(RunKind::TaskRun, options, cancel).await
    }

    /// Resolve `selector` to exactly one run of `kind`.
    ///
    /// A unique identifier is looked up directly first. TaskRuns started by a
    /// PipelineRun live under the PipelineRun's result, so for those a missing
    /// direct record falls back to a scan. Otherwise the newest runs matching
    /// the selector are scanned; several matches resolve to the newest one when
    /// `select_last` is set and are an error otherwise.
    ///
    /// # Errors
    /// [`ResultsError::DirectLookup`] when the direct lookup fails for any
    /// reason other than a recoverable miss, [`ResultsError::NoRunFound`],
    /// [`ResultsError::AmbiguousSelector`], plus selector, decode, transport
    /// and cancellation failures.
    pub async fn resolve_run(
        &self,
        kind: RunKind,
        selector: &RunSelector,
        cancel: &CancellationToken,
    ) -> Result<RunDetail> {
        let labels = parse_label_selector(&selector.label_selector)?;

        if !selector.uid.is_empty() {
            if let Some(detail) = self.lookup_by_uid(kind, selector, cancel).await? {
                return Ok(detail);
            }
        }

        let mut matches = self.scan(kind, selector, &labels, cancel).await?;
        match matches.len() {
            0 => Err(ResultsError::NoRunFound),
            1 => Ok(matches.remove(0)),
            _ if selector.select_last => Ok(matches.remove(0)),
            _ => {
                let candidates: Vec<String> = matches
                    .iter()
                    .map(|d| format!("{}/{}", d.summary.namespace, d.summary.name))
                    .collect();
                debug!(kind = %kind, candidates = ?candidates, "Selector is ambiguous");
                Err(ResultsError::AmbiguousSelector { candidates })
            }
        }
    }

    /// Resolve a PipelineRun.
    ///
    /// # Errors
    /// See [`Service::resolve_run`].
    pub async fn get_pipeline_run(&self, selector: &RunSelector, cancel: &CancellationToken) -> Result<RunDetail> {
        self.resolve_run(RunKind::PipelineRun, selector, cancel).await
    }

    /// Resolve a TaskRun.
    ///
    /// # Errors
    /// See [`Service::resolve_run`].
    pub async fn get_task_run(&self, selector: &RunSelector, cancel: &CancellationToken) -> Result<RunDetail> {
        self.resolve_run(RunKind::TaskRun, selector, cancel).await
    }

    /// Fetch the logs stored next to the record at `record_name`.
    ///
    /// # Errors
    /// Fails when the log cannot be fetched or on cancellation.
    pub async fn fetch_logs(&self, record_name: &str, cancel: &CancellationToken) -> Result<String> {
        let path = log_address(record_name);
        debug!(path = %path, "Fetching logs");
        let bytes = with_cancel(cancel, self.client.get_log(&path)).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Direct lookup by uid. `Ok(None)` means "continue with a scan".
    async fn lookup_by_uid(
        &self,
        kind: RunKind,
        selector: &RunSelector,
        cancel: &CancellationToken,
    ) -> Result<Option<RunDetail>> {
        let namespace = if selector.namespace.trim().is_empty() {
            self.default_namespace.as_str()
        } else {
            selector.namespace.trim()
        };
        let address = direct_record_address(namespace, &selector.uid);
        debug!(address = %address, "Direct record lookup");

        let lookup = with_cancel(cancel, self.client.get_record(&address)).await;
        match lookup {
            Ok(record) => RunDetail::from_record(&record).map(Some),
            Err(ResultsError::Cancelled) => Err(ResultsError::Cancelled),
            Err(e) if e.is_not_found() && kind.may_nest_under_parent() => {
                info!(
                    kind = kind.display_name(),
                    uid = %selector.uid,
                    "Direct lookup missed, scanning for a run nested under a parent"
                );
                Ok(None)
            }
            Err(e) => Err(ResultsError::DirectLookup {
                uid: selector.uid.clone(),
                source: Box::new(e),
            }),
        }
    }

    async fn scan(
        &self,
        kind: RunKind,
        selector: &RunSelector,
        labels: &LabelMap,
        cancel: &CancellationToken,
    ) -> Result<Vec<RunDetail>> {
        let name = Some(selector.name.as_str()).filter(|n| !n.is_empty());
        let scope = NamespaceScope::parse(&selector.namespace);

        let request = ListRecordsRequest {
            parent: scope.parent(),
            filter: build_filter_expression(kind, labels, name),
            order_by: ORDER_NEWEST_FIRST.to_string(),
            page_size: SCAN_PAGE_SIZE,
            page_token: String::new(),
            fields: SCAN_FIELDS.to_string(),
        };

        PageWalker::new(request, SCAN_MATCH_LIMIT)
            .collect(self.client.as_ref(), cancel, |record| {
                accept_match(record, selector, labels)
            })
            .await
    }
}

/// Apply the in-memory predicates: uid, labels, prefix, then exact name.
fn accept_match(record: &StoredRecord, selector: &RunSelector, labels: &LabelMap) -> Result<Option<RunDetail>> {
    let run = record.decode_run()?;

    if !selector.uid.is_empty() {
        let uid = if run.metadata.uid.is_empty() {
            record.uid.as_str()
        } else {
            run.metadata.uid.as_str()
        };
        if uid != selector.uid {
            return Ok(None);
        }
    }
    if !matches_labels(run.metadata.labels(), labels) {
        return Ok(None);
    }
    if !selector.prefix.is_empty() && !run.metadata.name.starts_with(&selector.prefix) {
        return Ok(None);
    }
    if !selector.name.is_empty() && run.metadata.name != selector.name {
        return Ok(None);
    }

    RunDetail::from_decoded(&run, record).map(Some)
}

fn page_size(size: usize) -> u32 {
    u32::try_from(size).unwrap_or(u32::MAX)
}
