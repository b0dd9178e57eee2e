//! MCP tools for PipelineRuns and TaskRuns.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tekton_results::{
    ListOptions, OutputFormat, ResultsError, RunDetail, RunSelector, RunSummary, Service,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

const DEFAULT_LIST_LIMIT: usize = 50;
const MAX_LIST_LIMIT: usize = 200;

/// Label Tekton puts on TaskRuns started by a PipelineRun.
const PIPELINE_RUN_UID_LABEL: &str = "tekton.dev/pipelineRunUID";

const LOG_BANNER: &str = "========================================";

/// Run operations the tools need.
#[async_trait]
pub trait RunService: Send + Sync {
    async fn list_pipeline_runs(
        &self,
        options: &ListOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<RunSummary>, ResultsError>;

    async fn list_task_runs(
        &self,
        options: &ListOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<RunSummary>, ResultsError>;

    async fn get_pipeline_run(
        &self,
        selector: &RunSelector,
        cancel: &CancellationToken,
    ) -> Result<RunDetail, ResultsError>;

    async fn get_task_run(
        &self,
        selector: &RunSelector,
        cancel: &CancellationToken,
    ) -> Result<RunDetail, ResultsError>;

    async fn fetch_logs(&self, record_name: &str, cancel: &CancellationToken) -> Result<String, ResultsError>;
}

#[async_trait]
impl RunService for Service {
    async fn list_pipeline_runs(
        &self,
        options: &ListOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<RunSummary>, ResultsError> {
        Service::list_pipeline_runs(self, options, cancel).await
    }

    async fn list_task_runs(
        &self,
        options: &ListOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<RunSummary>, ResultsError> {
        Service::list_task_runs(self, options, cancel).await
    }

    async fn get_pipeline_run(
        &self,
        selector: &RunSelector,
        cancel: &CancellationToken,
    ) -> Result<RunDetail, ResultsError> {
        Service::get_pipeline_run(self, selector, cancel).await
    }

    async fn get_task_run(
        &self,
        selector: &RunSelector,
        cancel: &CancellationToken,
    ) -> Result<RunDetail, ResultsError> {
        Service::get_task_run(self, selector, cancel).await
    }

    async fn fetch_logs(&self, record_name: &str, cancel: &CancellationToken) -> Result<String, ResultsError> {
        Service::fetch_logs(self, record_name, cancel).await
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ListArgs {
    namespace: String,
    label_selector: String,
    prefix: String,
    limit: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SelectArgs {
    namespace: String,
    label_selector: String,
    prefix: String,
    name: String,
    uid: String,
    output: String,
    select_last: Option<bool>,
}

impl SelectArgs {
    fn identifies_run(&self, allow_uid: bool) -> bool {
        !self.name.is_empty()
            || !self.prefix.is_empty()
            || (allow_uid && !self.uid.is_empty())
            || !self.label_selector.trim().is_empty()
    }
}

/// Tool registry bound to a [`RunService`].
#[derive(Clone)]
pub struct Tools {
    service: Arc<dyn RunService>,
    default_namespace: String,
}

impl Tools {
    pub fn new(service: Arc<dyn RunService>, default_namespace: impl Into<String>) -> Self {
        let default_namespace = default_namespace.into();
        let default_namespace = if default_namespace.trim().is_empty() {
            tekton_results::service::DEFAULT_NAMESPACE.to_string()
        } else {
            default_namespace.trim().to_string()
        };
        Self {
            service,
            default_namespace,
        }
    }

    /// `tools/list` payload.
    pub fn definitions(&self) -> Value {
        let ns = &self.default_namespace;
        let label_selector = string_prop("Comma separated key=value selectors that must match run labels.", "");
        let output = string_prop("Return format: 'yaml' (default) or 'json'.", "yaml");
        let limit = json!({
            "type": "number",
            "description": "Maximum number of records to return (1-200).",
            "default": DEFAULT_LIST_LIMIT,
            "minimum": 1,
            "maximum": MAX_LIST_LIMIT
        });
        let uid = string_prop(
            "Exact TaskRun UID (unique identifier in Tekton Results database). This is the most efficient way to find a specific run.",
            "",
        );
        let select_last = |kind: &str| {
            json!({
                "type": "boolean",
                "description": format!(
                    "If true, automatically select the last (most recent) match when multiple {kind}s match the filters. Defaults to true."
                ),
                "default": true
            })
        };

        json!({
            "tools": [
                tool(
                    "pipelinerun_list",
                    "List Tekton PipelineRuns stored by the Tekton Results service with optional namespace, label, and name prefix filters.",
                    "List PipelineRuns",
                    json!({
                        "namespace": string_prop("Kubernetes namespace to query. Use '-' to search across all namespaces.", ns),
                        "labelSelector": label_selector,
                        "prefix": string_prop("Optional PipelineRun name prefix to match.", ""),
                        "limit": limit,
                    }),
                ),
                tool(
                    "pipelinerun_describe",
                    "Describe a Tekton PipelineRun stored in Tekton Results. Provide a name for exact match or combine labelSelector/prefix to narrow results.",
                    "Describe PipelineRun",
                    json!({
                        "name": string_prop("Exact PipelineRun name. Optional if labelSelector/prefix uniquely identify a run.", ""),
                        "namespace": string_prop("Kubernetes namespace that owns the PipelineRun. Use '-' to search across namespaces.", ns),
                        "labelSelector": label_selector,
                        "prefix": string_prop("Optional PipelineRun name prefix to disambiguate.", ""),
                        "output": output,
                        "selectLast": select_last("PipelineRun"),
                    }),
                ),
                tool(
                    "pipelinerun_logs",
                    "Retrieve stored logs for a completed Tekton PipelineRun.",
                    "PipelineRun Logs",
                    json!({
                        "name": string_prop("Exact PipelineRun name. Optional if labelSelector/prefix uniquely identify a run.", ""),
                        "namespace": string_prop("Kubernetes namespace for the PipelineRun. Use '-' to search all namespaces.", ns),
                        "labelSelector": label_selector,
                        "prefix": string_prop("Optional PipelineRun name prefix when multiple runs share similar names.", ""),
                        "selectLast": select_last("PipelineRun"),
                    }),
                ),
                tool(
                    "taskrun_list",
                    "List Tekton TaskRuns stored by the Tekton Results service with optional namespace, label, and name prefix filters.",
                    "List TaskRuns",
                    json!({
                        "namespace": string_prop("Kubernetes namespace to query. Use '-' to search across all namespaces.", ns),
                        "labelSelector": label_selector,
                        "prefix": string_prop("Optional TaskRun name prefix to match.", ""),
                        "limit": limit,
                    }),
                ),
                tool(
                    "taskrun_get",
                    "Get a Tekton TaskRun stored in Tekton Results. Provide a name for exact match or combine labelSelector/prefix to narrow results. Returns the full resource in YAML (default) or JSON format.",
                    "Get TaskRun",
                    json!({
                        "name": string_prop("Exact TaskRun name. Optional if labelSelector/prefix uniquely identify a run.", ""),
                        "namespace": string_prop("Kubernetes namespace that owns the TaskRun. Use '-' to search across namespaces.", ns),
                        "labelSelector": label_selector,
                        "prefix": string_prop("Optional TaskRun name prefix to disambiguate.", ""),
                        "uid": uid,
                        "output": output,
                        "selectLast": select_last("TaskRun"),
                    }),
                ),
                tool(
                    "taskrun_logs",
                    "Retrieve stored logs for a completed Tekton TaskRun.",
                    "TaskRun Logs",
                    json!({
                        "name": string_prop("Exact TaskRun name. Optional if labelSelector/prefix uniquely identify a run.", ""),
                        "namespace": string_prop("Kubernetes namespace for the TaskRun. Use '-' to search all namespaces.", ns),
                        "labelSelector": label_selector,
                        "prefix": string_prop("Optional TaskRun name prefix when multiple runs share similar names.", ""),
                        "uid": uid,
                        "selectLast": select_last("TaskRun"),
                    }),
                ),
            ]
        })
    }

    /// Run tool `name`. `Err` carries the message shown to the caller.
    pub async fn call(&self, name: &str, arguments: &Value, cancel: &CancellationToken) -> Result<String, String> {
        debug!(tool = %name, "Tool call");
        match name {
            "pipelinerun_list" => self.list(false, parse_args(arguments)?, cancel).await,
            "taskrun_list" => self.list(true, parse_args(arguments)?, cancel).await,
            "pipelinerun_describe" => self.pipelinerun_describe(parse_args(arguments)?, cancel).await,
            "taskrun_get" => self.taskrun_get(parse_args(arguments)?, cancel).await,
            "pipelinerun_logs" => self.pipelinerun_logs(parse_args(arguments)?, cancel).await,
            "taskrun_logs" => self.taskrun_logs(parse_args(arguments)?, cancel).await,
            _ => Err(format!("Unknown tool: {name}")),
        }
    }

    async fn list(&self, task_runs: bool, args: ListArgs, cancel: &CancellationToken) -> Result<String, String> {
        let options = ListOptions {
            namespace: self.namespace(&args.namespace),
            label_selector: args.label_selector,
            prefix: args.prefix,
            limit: sanitize_limit(args.limit),
        };

        let summaries = if task_runs {
            self.service.list_task_runs(&options, cancel).await
        } else {
            self.service.list_pipeline_runs(&options, cancel).await
        }
        .map_err(|e| e.to_string())?;

        serde_json::to_string_pretty(&summaries).map_err(|e| format!("format response: {e}"))
    }

    async fn pipelinerun_describe(&self, args: SelectArgs, cancel: &CancellationToken) -> Result<String, String> {
        if !args.identifies_run(false) {
            return Err("provide at least one of name, prefix, or labelSelector to identify a PipelineRun".to_string());
        }
        let output = parse_output(&args.output)?;
        let detail = self
            .service
            .get_pipeline_run(&self.selector(args, false), cancel)
            .await
            .map_err(|e| e.to_string())?;
        detail.format(output).map_err(|e| e.to_string())
    }

    async fn taskrun_get(&self, args: SelectArgs, cancel: &CancellationToken) -> Result<String, String> {
        if !args.identifies_run(true) {
            return Err("provide at least one of name, prefix, uid, or labelSelector to identify a TaskRun".to_string());
        }
        let output = parse_output(&args.output)?;
        let detail = self
            .service
            .get_task_run(&self.selector(args, true), cancel)
            .await
            .map_err(|e| e.to_string())?;
        detail.format(output).map_err(|e| e.to_string())
    }

    async fn taskrun_logs(&self, args: SelectArgs, cancel: &CancellationToken) -> Result<String, String> {
        if !args.identifies_run(true) {
            return Err("provide at least one of name, prefix, uid, or labelSelector to target a TaskRun".to_string());
        }
        let detail = self
            .service
            .get_task_run(&self.selector(args, true), cancel)
            .await
            .map_err(|e| e.to_string())?;
        if !detail.completed() {
            return Err("logs are only available after the TaskRun has completed".to_string());
        }
        self.service
            .fetch_logs(&detail.record_name, cancel)
            .await
            .map_err(|e| e.to_string())
    }

    async fn pipelinerun_logs(&self, args: SelectArgs, cancel: &CancellationToken) -> Result<String, String> {
        if !args.identifies_run(false) {
            return Err("provide at least one of name, prefix, or labelSelector to target a PipelineRun".to_string());
        }
        let selector = self.selector(args, false);
        let detail = self
            .service
            .get_pipeline_run(&selector, cancel)
            .await
            .map_err(|e| e.to_string())?;
        if !detail.completed() {
            return Err("logs are only available after the PipelineRun has completed".to_string());
        }

        // Names get reused across history, the uid does not.
        let options = ListOptions {
            namespace: selector.namespace,
            label_selector: format!("{PIPELINE_RUN_UID_LABEL}={}", detail.summary.uid),
            prefix: String::new(),
            limit: MAX_LIST_LIMIT,
        };
        let mut task_runs = self
            .service
            .list_task_runs(&options, cancel)
            .await
            .map_err(|e| format!("failed to list TaskRuns: {e}"))?;
        if task_runs.is_empty() {
            return Ok("No TaskRuns found for this PipelineRun".to_string());
        }

        sort_for_logs(&mut task_runs);

        let mut out = String::new();
        for (i, task_run) in task_runs.iter().enumerate() {
            if i > 0 {
                out.push_str("\n\n");
            }
            write_banner(&mut out, task_run);

            match self.service.fetch_logs(&task_run.record_name, cancel).await {
                Err(ResultsError::Cancelled) => return Err(ResultsError::Cancelled.to_string()),
                Err(e) => {
                    let _ = writeln!(out, "Error fetching logs: {e}");
                }
                Ok(logs) if logs.is_empty() => out.push_str("(no logs available)\n"),
                Ok(logs) => {
                    out.push_str(&logs);
                    if !logs.ends_with('\n') {
                        out.push('\n');
                    }
                }
            }
        }
        Ok(out)
    }

    fn namespace(&self, input: &str) -> String {
        normalize_namespace(input, &self.default_namespace)
    }

    fn selector(&self, args: SelectArgs, allow_uid: bool) -> RunSelector {
        RunSelector {
            namespace: self.namespace(&args.namespace),
            label_selector: args.label_selector,
            prefix: args.prefix,
            name: args.name,
            uid: if allow_uid { args.uid } else { String::new() },
            select_last: args.select_last.unwrap_or(true),
        }
    }
}

fn tool(name: &str, description: &str, title: &str, properties: Value) -> Value {
    json!({
        "name": name,
        "description": description,
        "inputSchema": {
            "type": "object",
            "properties": properties
        },
        "annotations": {
            "title": title,
            "readOnlyHint": true,
            "destructiveHint": false,
            "idempotentHint": true,
            "openWorldHint": true
        }
    })
}

fn string_prop(description: &str, default: &str) -> Value {
    json!({
        "type": "string",
        "description": description,
        "default": default
    })
}

fn parse_args<T: DeserializeOwned + Default>(arguments: &Value) -> Result<T, String> {
    if arguments.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(arguments.clone()).map_err(|e| format!("invalid arguments: {e}"))
}

fn parse_output(output: &str) -> Result<OutputFormat, String> {
    output.parse::<OutputFormat>().map_err(|e| e.to_string())
}

/// Empty falls back to `default`; every spelling of "all namespaces" becomes `-`.
pub fn normalize_namespace(input: &str, default: &str) -> String {
    let ns = input.trim();
    match ns.to_ascii_lowercase().as_str() {
        "" => default.to_string(),
        "-" | "all" | "*" => "-".to_string(),
        _ => ns.to_string(),
    }
}

/// Clamp a requested limit into `1..=200`; missing or non-positive means the default.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn sanitize_limit(limit: Option<f64>) -> usize {
    match limit {
        Some(l) if l >= 1.0 => (l as usize).min(MAX_LIST_LIMIT),
        _ => DEFAULT_LIST_LIMIT,
    }
}

/// Order TaskRuns by completion time, then start time. Runs missing a timestamp sort last.
fn sort_for_logs(task_runs: &mut [RunSummary]) {
    task_runs.sort_by_key(|r| {
        (
            r.completion_time.is_none(),
            r.completion_time,
            r.start_time.is_none(),
            r.start_time,
        )
    });
}

fn write_banner(out: &mut String, task_run: &RunSummary) {
    let _ = writeln!(out, "{LOG_BANNER}");
    let _ = writeln!(out, "TaskRun: {}", task_run.name);
    let _ = write!(out, "Status: {}", task_run.reason);
    if let Some(start) = task_run.start_time {
        let _ = write!(out, " | Started: {}", timestamp(start));
    }
    if let Some(done) = task_run.completion_time {
        let _ = write!(out, " | Completed: {}", timestamp(done));
    }
    let _ = writeln!(out, "\n{LOG_BANNER}");
}

fn timestamp(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
