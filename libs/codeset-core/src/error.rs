//! Error types for the build pipeline.

use thiserror::Error;

use crate::gateway::GatewayError;

pub type Result<T> = std::result::Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    /// The single pipeline-abort condition: the root concept has no atom in
    /// the domain's standard vocabulary, so walking any other hierarchy
    /// would silently produce an incomplete code set.
    #[error(
        "no {vocabulary} code found for concept {concept_id}; a {vocabulary}-anchored \
         code set cannot be built from this concept"
    )]
    MissingStandardVocabulary {
        vocabulary: String,
        concept_id: String,
    },

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("build cancelled")]
    Cancelled,
}
