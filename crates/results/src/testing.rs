//! In-memory Results store for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::client::{ListRecordsRequest, ListRecordsResponse, ResultsClient};
use crate::error::{Result, ResultsError};
use crate::record::StoredRecord;

/// Scripted store: list calls walk `pages` in order, gets look up `records`.
#[derive(Default)]
pub(crate) struct ScriptedClient {
    pages: Vec<Vec<StoredRecord>>,
    records: HashMap<String, StoredRecord>,
    logs: HashMap<String, Vec<u8>>,
    get_error: Mutex<Option<ResultsError>>,
    cancel_after_first_list: Option<CancellationToken>,
    pub list_requests: Mutex<Vec<ListRecordsRequest>>,
    pub get_calls: AtomicUsize,
}

impl ScriptedClient {
    pub fn with_pages(pages: Vec<Vec<StoredRecord>>) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }

    pub fn with_record(mut self, record: StoredRecord) -> Self {
        self.records.insert(record.name.clone(), record);
        self
    }

    pub fn with_log(mut self, path: &str, body: &str) -> Self {
        self.logs.insert(path.to_string(), body.as_bytes().to_vec());
        self
    }

    pub fn failing_get(self, error: ResultsError) -> Self {
        *self.get_error.lock().unwrap() = Some(error);
        self
    }

    pub fn cancel_after_first_list(mut self, token: CancellationToken) -> Self {
        self.cancel_after_first_list = Some(token);
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ListRecordsRequest> {
        self.list_requests.lock().unwrap().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.list_calls() + self.get_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResultsClient for ScriptedClient {
    async fn get_record(&self, record_name: &str) -> Result<StoredRecord> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.get_error.lock().unwrap().take() {
            return Err(err);
        }
        self.records
            .get(record_name)
            .cloned()
            .ok_or_else(|| ResultsError::NotFound(record_name.to_string()))
    }

    async fn list_records(&self, request: &ListRecordsRequest) -> Result<ListRecordsResponse> {
        self.list_requests.lock().unwrap().push(request.clone());

        let index = match request.page_token.strip_prefix("page-") {
            Some(n) => n.parse::<usize>().unwrap(),
            None => 0,
        };
        let records = self.pages.get(index).cloned().unwrap_or_default();
        let next_page_token = if index + 1 < self.pages.len() {
            format!("page-{}", index + 1)
        } else {
            String::new()
        };

        if let Some(token) = &self.cancel_after_first_list {
            token.cancel();
        }

        Ok(ListRecordsResponse {
            records,
            next_page_token,
        })
    }

    async fn get_log(&self, log_path: &str) -> Result<Vec<u8>> {
        self.logs
            .get(log_path)
            .cloned()
            .ok_or_else(|| ResultsError::NotFound(log_path.to_string()))
    }
}

/// A run resource as the store would hold it.
pub(crate) fn run_value(namespace: &str, name: &str, uid: &str, labels: &[(&str, &str)]) -> Value {
    let labels: serde_json::Map<String, Value> = labels
        .iter()
        .map(|(k, v)| ((*k).to_string(), Value::String((*v).to_string())))
        .collect();
    json!({
        "metadata": {"name": name, "namespace": namespace, "uid": uid, "labels": labels},
        "status": {
            "startTime": "2025-12-29T11:00:00Z",
            "completionTime": "2025-12-29T11:05:00Z",
            "conditions": [{"type": "Succeeded", "status": "True", "reason": "Succeeded"}]
        }
    })
}

/// A record for a run stored under its own result.
pub(crate) fn run_record(namespace: &str, name: &str, uid: &str) -> StoredRecord {
    StoredRecord::new(
        format!("{namespace}/results/{uid}/records/{uid}"),
        uid,
        run_value(namespace, name, uid, &[]),
    )
}

/// Like [`run_record`] with labels.
pub(crate) fn labeled_record(namespace: &str, name: &str, uid: &str, labels: &[(&str, &str)]) -> StoredRecord {
    StoredRecord::new(
        format!("{namespace}/results/{uid}/records/{uid}"),
        uid,
        run_value(namespace, name, uid, labels),
    )
}
