//! Client configuration.

use std::sync::Arc;

use tracing::{info, warn};

use crate::client::{HttpResultsClient, KubeResultsClient, ResultsClient};
use crate::error::Result;

/// Environment variable naming a direct Results endpoint.
pub const BASE_URL_ENV: &str = "TEKTON_RESULTS_BASE_URL";

/// Environment variable holding a bearer token for the direct endpoint.
pub const BEARER_TOKEN_ENV: &str = "TEKTON_RESULTS_BEARER_TOKEN";

/// Environment variable disabling TLS verification for the direct endpoint.
pub const INSECURE_SKIP_VERIFY_ENV: &str = "TEKTON_RESULTS_INSECURE_SKIP_VERIFY";

/// How to reach the Results API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultsConfig {
    /// Direct endpoint. When unset the API server's aggregation layer is used.
    pub base_url: Option<String>,
    pub bearer_token: Option<String>,
    pub insecure_skip_verify: bool,
}

impl ResultsConfig {
    /// Read configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let insecure_skip_verify = match non_empty(INSECURE_SKIP_VERIFY_ENV) {
            None => false,
            Some(raw) => parse_bool(&raw).unwrap_or_else(|| {
                warn!(value = %raw, "Ignoring invalid {INSECURE_SKIP_VERIFY_ENV}");
                false
            }),
        };

        Self {
            base_url: non_empty(BASE_URL_ENV),
            bearer_token: non_empty(BEARER_TOKEN_ENV),
            insecure_skip_verify,
        }
    }

    /// Build the client this configuration describes.
    ///
    /// # Errors
    /// Fails when the base URL is unusable or no Kubernetes configuration is available.
    pub async fn build_client(&self) -> Result<Arc<dyn ResultsClient>> {
        if let Some(base_url) = &self.base_url {
            let client = HttpResultsClient::new(
                base_url,
                self.bearer_token.clone(),
                self.insecure_skip_verify,
            )?;
            info!(base_url = %client.base_url(), "Using direct Results endpoint");
            return Ok(Arc::new(client));
        }

        info!("Using Results API through the Kubernetes API server");
        Ok(Arc::new(KubeResultsClient::try_default().await?))
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "yes" | "on" => Some(true),
        "0" | "f" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
