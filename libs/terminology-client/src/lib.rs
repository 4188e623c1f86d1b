//! UMLS/RxNav HTTP implementation of the code-set terminology gateway.
//!
//! # Example
//!
//! ```rust,no_run
//! use codeset_terminology_client::{TerminologyClient, TerminologyConfig};
//! use codeset_core::SearchSort;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use codeset_core::TerminologyGateway;
//! let client = TerminologyClient::new(TerminologyConfig::new("my-api-key"))?;
//! let hits = client
//!     .search_concepts("migraine", None, SearchSort::Alphabetical)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
mod http;
pub mod rxnav;
pub mod umls;
pub mod wire;

pub use config::{TerminologyConfig, DEFAULT_RXNAV_BASE_URL, DEFAULT_UMLS_BASE_URL};
pub use rxnav::{RxNavClient, RELATED_TTY_WHITELIST};
pub use umls::TerminologyClient;

// Re-export the gateway trait so downstream users need not name the core
// crate for the common case.
pub use codeset_core::{GatewayError, GatewayResult, SearchSort, TerminologyGateway};
