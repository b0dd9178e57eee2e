//! Shared test doubles.

use async_trait::async_trait;
use tekton_results::{ListOptions, ResultsError, RunDetail, RunSelector, RunSummary};
use tokio_util::sync::CancellationToken;

use crate::tools::RunService;

/// A store with no runs at all.
pub(crate) struct NoRuns;

#[async_trait]
impl RunService for NoRuns {
    async fn list_pipeline_runs(
        &self,
        _options: &ListOptions,
        _cancel: &CancellationToken,
    ) -> Result<Vec<RunSummary>, ResultsError> {
        Ok(Vec::new())
    }

    async fn list_task_runs(
        &self,
        _options: &ListOptions,
        _cancel: &CancellationToken,
    ) -> Result<Vec<RunSummary>, ResultsError> {
        Ok(Vec::new())
    }

    async fn get_pipeline_run(
        &self,
        _selector: &RunSelector,
        _cancel: &CancellationToken,
    ) -> Result<RunDetail, ResultsError> {
        Err(ResultsError::NoRunFound)
    }

    async fn get_task_run(
        &self,
        _selector: &RunSelector,
        _cancel: &CancellationToken,
    ) -> Result<RunDetail, ResultsError> {
        Err(ResultsError::NoRunFound)
    }

    async fn fetch_logs(&self, _record_name: &str, _cancel: &CancellationToken) -> Result<String, ResultsError> {
        Ok(String::new())
    }
}
