//! Records as stored by the Results API and payload decoding.

use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, ResultsError};
use crate::run::NormalizedRun;

/// Payload section of a record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordData {
    /// Stored resource type, for example `tekton.dev/v1.TaskRun`.
    #[serde(default, rename = "type")]
    pub data_type: String,
    /// Either the resource itself or a base64 string holding its JSON.
    #[serde(default)]
    pub value: Value,
}

/// A record owned by the Results API.
///
/// The payload is decoded at most once per record value; later calls reuse
/// the cached result.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoredRecord {
    /// Storage address: `<namespace>/results/<result-id>/records/<record-id>`.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub data: RecordData,
    #[serde(skip)]
    decoded: OnceLock<Value>,
}

impl StoredRecord {
    pub fn new(name: impl Into<String>, uid: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            uid: uid.into(),
            data: RecordData {
                data_type: String::new(),
                value,
            },
            decoded: OnceLock::new(),
        }
    }

    /// Resolved resource payload.
    ///
    /// Objects and arrays are returned as stored. A string is treated as
    /// base64 encoded JSON and decoded once.
    ///
    /// # Errors
    /// [`ResultsError::EmptyRecord`] when there is no payload,
    /// [`ResultsError::Base64Decode`] when a string payload is not base64 and
    /// [`ResultsError::Decode`] when the decoded bytes are not JSON.
    pub fn value(&self) -> Result<&Value> {
        match &self.data.value {
            Value::Null => Err(self.empty()),
            Value::Object(_) | Value::Array(_) => Ok(&self.data.value),
            Value::String(encoded) => {
                if let Some(decoded) = self.decoded.get() {
                    return Ok(decoded);
                }
                let decoded = self.decode_base64(encoded)?;
                Ok(self.decoded.get_or_init(|| decoded))
            }
            other => Err(ResultsError::Decode {
                record: self.name.clone(),
                reason: format!("unexpected payload {other}"),
            }),
        }
    }

    /// Decode the payload into a [`NormalizedRun`].
    ///
    /// # Errors
    /// Propagates payload failures from [`StoredRecord::value`] and fails with
    /// [`ResultsError::Decode`] when the payload does not look like a run.
    pub fn decode_run(&self) -> Result<NormalizedRun> {
        let value = self.value()?;
        NormalizedRun::deserialize(value).map_err(|e| ResultsError::Decode {
            record: self.name.clone(),
            reason: e.to_string(),
        })
    }

    fn decode_base64(&self, encoded: &str) -> Result<Value> {
        if encoded.trim().is_empty() {
            return Err(self.empty());
        }
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|source| ResultsError::Base64Decode {
                record: self.name.clone(),
                source,
            })?;
        if bytes.is_empty() {
            return Err(self.empty());
        }
        serde_json::from_slice(&bytes).map_err(|e| ResultsError::Decode {
            record: self.name.clone(),
            reason: e.to_string(),
        })
    }

    fn empty(&self) -> ResultsError {
        ResultsError::EmptyRecord {
            record: self.name.clone(),
        }
    }
}

/// Direct lookup address of the record for run `uid` in `namespace`.
///
/// Standalone runs are stored under a result named after their own uid.
#[must_use]
pub fn direct_record_address(namespace: &str, uid: &str) -> String {
    format!("{namespace}/results/{uid}/records/{uid}")
}

/// Log address for the record at `record_name`.
#[must_use]
pub fn log_address(record_name: &str) -> String {
    let replaced = record_name.replacen("/records/", "/logs/", 1);
    if replaced == record_name {
        record_name.replacen("records", "logs", 1)
    } else {
        replaced
    }
}
