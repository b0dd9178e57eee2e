#![warn(clippy::pedantic)]
// Allow common pedantic lints that don't affect correctness
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]

//! # Tekton Results
//!
//! Read-only access to PipelineRuns and TaskRuns archived by Tekton Results.
//!
//! This crate provides:
//! - Label selector parsing and CEL filter construction for the list API
//! - Record payload decoding, including base64 wrapped payloads
//! - Bounded, cancellable pagination over record listings
//! - Resolution of a loose selector to exactly one run
//! - REST and Kubernetes aggregated API transports
//!
//! ## Example
//!
//! ```rust,ignore
//! use tekton_results::{ResultsConfig, RunSelector, Service};
//! use tokio_util::sync::CancellationToken;
//!
//! let client = ResultsConfig::from_env().build_client().await?;
//! let service = Service::new(client);
//!
//! let selector = RunSelector {
//!     namespace: "ci".to_string(),
//!     prefix: "build-".to_string(),
//!     select_last: true,
//!     ..Default::default()
//! };
//! let run = service.get_pipeline_run(&selector, &CancellationToken::new()).await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod filter;
pub mod kind;
pub mod paginate;
pub mod record;
pub mod run;
pub mod selector;
pub mod service;

#[cfg(test)]
mod testing;

pub use client::{HttpResultsClient, KubeResultsClient, ListRecordsRequest, ListRecordsResponse, ResultsClient};
pub use config::ResultsConfig;
pub use error::{Result, ResultsError};
pub use kind::RunKind;
pub use record::StoredRecord;
pub use run::{NormalizedRun, OutputFormat, RunDetail, RunSummary};
pub use selector::{ListOptions, NamespaceScope, RunSelector};
pub use service::Service;
