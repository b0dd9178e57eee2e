//! Decoded run views.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, ResultsError};
use crate::record::StoredRecord;

/// Condition type carrying the overall outcome of a run.
pub const SUCCEEDED_CONDITION: &str = "Succeeded";

/// Subset of a PipelineRun or TaskRun needed for matching and summaries.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NormalizedRun {
    pub metadata: RunMetadata,
    pub status: RunStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RunMetadata {
    pub name: String,
    pub namespace: String,
    pub uid: String,
    labels: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunStatus {
    pub start_time: Option<DateTime<Utc>>,
    pub completion_time: Option<DateTime<Utc>>,
    conditions: Option<Vec<Condition>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: String,
    pub reason: String,
    pub message: String,
}

impl RunMetadata {
    /// Labels on the run; empty when the run has none.
    pub fn labels(&self) -> &BTreeMap<String, String> {
        static EMPTY: BTreeMap<String, String> = BTreeMap::new();
        self.labels.as_ref().unwrap_or(&EMPTY)
    }
}

impl RunStatus {
    pub fn conditions(&self) -> &[Condition] {
        self.conditions.as_deref().unwrap_or_default()
    }

    /// Status and reason of the `Succeeded` condition.
    ///
    /// Both are empty while the run has no terminal condition yet.
    #[must_use]
    pub fn success(&self) -> (&str, &str) {
        self.conditions()
            .iter()
            .find(|c| c.condition_type == SUCCEEDED_CONDITION)
            .map_or(("", ""), |c| (c.status.as_str(), c.reason.as_str()))
    }
}

/// Lightweight projection of a run for listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub name: String,
    pub namespace: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub uid: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub reason: String,
    pub record_name: String,
}

impl RunSummary {
    /// Summarize `run` decoded from `record`.
    ///
    /// The uid falls back to the record's own uid when the payload has none.
    #[must_use]
    pub fn new(run: &NormalizedRun, record: &StoredRecord) -> Self {
        let (status, reason) = run.status.success();
        let uid = if run.metadata.uid.is_empty() {
            record.uid.clone()
        } else {
            run.metadata.uid.clone()
        };
        Self {
            name: run.metadata.name.clone(),
            namespace: run.metadata.namespace.clone(),
            uid,
            labels: run.metadata.labels().clone(),
            start_time: run.status.start_time,
            completion_time: run.status.completion_time,
            status: status.to_string(),
            reason: reason.to_string(),
            record_name: record.name.clone(),
        }
    }
}

/// A single resolved run with its full payload.
#[derive(Debug, Clone)]
pub struct RunDetail {
    pub summary: RunSummary,
    /// Decoded resource as stored.
    pub raw: Value,
    /// Storage address of the record, used to derive the log address.
    pub record_name: String,
}

impl RunDetail {
    /// Build a detail view from a record.
    ///
    /// # Errors
    /// Fails when the record payload cannot be decoded.
    pub fn from_record(record: &StoredRecord) -> Result<Self> {
        let run = record.decode_run()?;
        Self::from_decoded(&run, record)
    }

    pub(crate) fn from_decoded(run: &NormalizedRun, record: &StoredRecord) -> Result<Self> {
        Ok(Self {
            summary: RunSummary::new(run, record),
            raw: record.value()?.clone(),
            record_name: record.name.clone(),
        })
    }

    /// Whether the run has finished.
    #[must_use]
    pub fn completed(&self) -> bool {
        self.summary.completion_time.is_some()
    }

    /// Render the stored resource.
    ///
    /// # Errors
    /// Returns [`ResultsError::Format`] if serialization fails.
    pub fn format(&self, output: OutputFormat) -> Result<String> {
        match output {
            OutputFormat::Json => serde_json::to_string_pretty(&self.raw)
                .map_err(|e| ResultsError::Format(format!("JSON: {e}"))),
            OutputFormat::Yaml => serde_yaml::to_string(&self.raw)
                .map_err(|e| ResultsError::Format(format!("YAML: {e}"))),
        }
    }
}

/// Rendering for [`RunDetail::format`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl FromStr for OutputFormat {
    type Err = ResultsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "yaml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            other => Err(ResultsError::Format(format!("unsupported output {other:?}"))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yaml => write!(f, "yaml"),
            Self::Json => write!(f, "json"),
        }
    }
}
