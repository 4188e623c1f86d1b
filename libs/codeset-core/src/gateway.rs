//! The seam between the build pipeline and the remote terminology services.
//!
//! The pipeline only ever talks to the [`TerminologyGateway`] trait; the HTTP
//! implementation lives in the `codeset-terminology-client` crate, and tests
//! script an in-memory implementation.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Atom, Concept, HierarchyNode, ProductCode, SearchHit};

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Errors crossing the gateway boundary.
///
/// Not-found is *not* represented here: absence of ancestors, descendants or
/// attributes is a valid terminal state and gateways normalize it to an empty
/// result.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("terminology service returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// How search results are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchSort {
    /// Sort hits alphabetically by name.
    Alphabetical,
    /// Keep the service's relevance order untouched.
    Relevance,
}

/// Typed façade over the terminology service's search, concept, atom,
/// ancestor and descendant operations plus the companion drug-relation
/// service. All operations are asynchronous and may fail with
/// [`GatewayError`].
#[async_trait]
pub trait TerminologyGateway: Send + Sync {
    /// Paged concept search. Drops the service's sentinel "no results"
    /// marker, deduplicates by concept id (first occurrence wins) and orders
    /// per `sort`.
    async fn search_concepts(
        &self,
        term: &str,
        vocabularies: Option<&[String]>,
        sort: SearchSort,
    ) -> GatewayResult<Vec<SearchHit>>;

    /// Concept metadata plus its atoms restricted to the given vocabularies,
    /// including suppressed/obsolete entries so the result is complete.
    async fn concept_with_atoms(
        &self,
        concept_id: &str,
        vocabularies: &[String],
    ) -> GatewayResult<(Concept, Vec<Atom>)>;

    /// Ancestors of a code. Empty when the service reports not-found, since
    /// that is the expected shape for a root concept.
    async fn ancestors(&self, vocabulary: &str, code: &str) -> GatewayResult<Vec<HierarchyNode>>;

    /// Immediate descendants of a code. Empty on not-found.
    async fn descendants(&self, vocabulary: &str, code: &str)
        -> GatewayResult<Vec<HierarchyNode>>;

    /// Pre-flight sizing: number of immediate descendants of a code.
    async fn immediate_descendant_count(
        &self,
        vocabulary: &str,
        code: &str,
    ) -> GatewayResult<usize>;

    /// Resolve a `(vocabulary, code)` pair to the concept identifier asserted
    /// by the source, by following the source record's atoms sub-resource to
    /// the first atom's concept reference. `None` when the chain cannot be
    /// followed.
    async fn source_concept_id(
        &self,
        vocabulary: &str,
        code: &str,
    ) -> GatewayResult<Option<String>>;

    /// Dispensable-product codes for a drug code, unioned from the
    /// drug-relation service and the terminology service's attribute
    /// listings, deduplicated by code value.
    async fn map_drug_to_product(
        &self,
        drug_code: &str,
        concept_id: Option<&str>,
    ) -> GatewayResult<Vec<ProductCode>>;

    /// Related drug concepts restricted to the clinically relevant
    /// relation-type whitelist (ingredients, clinical/branded drugs and their
    /// components; never packs or dose-form groups).
    async fn related_drug_concepts(&self, code: &str) -> GatewayResult<Vec<HierarchyNode>>;
}
