//! Client configuration, injected at construction time.

use std::env;
use std::time::Duration;

use codeset_core::GatewayError;

pub const DEFAULT_UMLS_BASE_URL: &str = "https://uts-ws.nlm.nih.gov/rest";
pub const DEFAULT_RXNAV_BASE_URL: &str = "https://rxnav.nlm.nih.gov/REST";

/// Explicit configuration for the terminology client. The credential is
/// injected here rather than read from ambient environment state at call
/// sites; a missing key fails before any network call.
#[derive(Debug, Clone)]
pub struct TerminologyConfig {
    pub api_key: String,
    pub umls_base_url: String,
    pub rxnav_base_url: String,
    pub timeout: Duration,
}

impl TerminologyConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            umls_base_url: DEFAULT_UMLS_BASE_URL.to_string(),
            rxnav_base_url: DEFAULT_RXNAV_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Load configuration from the environment. `UMLS_API_KEY` is required;
    /// `UMLS_BASE_URL` and `RXNAV_BASE_URL` override the public endpoints.
    pub fn from_env() -> Result<Self, GatewayError> {
        let api_key = env::var("UMLS_API_KEY").map_err(|_| {
            GatewayError::Config(
                "UMLS_API_KEY is not set; obtain a key from your UTS profile and export it"
                    .to_string(),
            )
        })?;
        let mut config = Self::new(api_key);
        if let Ok(url) = env::var("UMLS_BASE_URL") {
            config.umls_base_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(url) = env::var("RXNAV_BASE_URL") {
            config.rxnav_base_url = url.trim_end_matches('/').to_string();
        }
        Ok(config)
    }
}
