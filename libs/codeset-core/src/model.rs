//! Value objects shared across the build pipeline.
//!
//! Everything here is owned by a single build invocation: entities are
//! resolved on demand, never mutated, and never shared across builds.

use serde::{Deserialize, Serialize};

use crate::domain::Domain;

/// One semantic type attached to a concept, e.g. `T047` / "Disease or Syndrome".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticType {
    pub type_code: String,
    pub type_name: String,
}

/// A vocabulary-independent clinical idea, identified by its CUI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concept {
    pub concept_id: String,
    pub preferred_name: String,
    pub semantic_types: Vec<SemanticType>,
}

/// A concept's representation inside one specific vocabulary.
///
/// `(vocabulary, source_code)` is the natural identity, not `atom_id`: the
/// same code can appear under several atom ids with different term types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Atom {
    pub atom_id: String,
    pub source_code: String,
    pub vocabulary: String,
    pub term_type: String,
    pub display_term: String,
    /// Original URL-shaped code field, retained when `source_code` was
    /// extracted from one.
    pub code_url: Option<String>,
}

/// A `(vocabulary, code, term)` triple used during traversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub vocabulary: String,
    pub code: String,
    pub term: String,
}

impl HierarchyNode {
    pub fn new(
        vocabulary: impl Into<String>,
        code: impl Into<String>,
        term: impl Into<String>,
    ) -> Self {
        Self {
            vocabulary: vocabulary.into(),
            code: code.into(),
            term: term.into(),
        }
    }
}

/// One search hit from the terminology service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub concept_id: String,
    pub name: String,
    pub root_source: String,
}

/// Where a product code was discovered during drug→product mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductCodeOrigin {
    DrugRelationService,
    SourceAttribute,
    ConceptAttribute,
}

/// A dispensable-product code produced by drug→product mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCode {
    pub code: String,
    pub name: Option<String>,
    pub origin: ProductCodeOrigin,
}

/// One row of the final code set. Dedup key: `(vocabulary, code)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeRecord {
    pub concept_id: String,
    pub concept_name: String,
    pub vocabulary: String,
    pub code: String,
    pub term: String,
    /// Public browseable reference for the concept, not the REST URL.
    pub code_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dose_form: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strength: Option<String>,
    /// Set when this record originated from a drug→product mapping step;
    /// carries the parent drug's code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_rx_concept_id: Option<String>,
}

impl CodeRecord {
    /// The final-dedup key.
    pub fn key(&self) -> (&str, &str) {
        (&self.vocabulary, &self.code)
    }
}

/// The final artifact of one build invocation. Immutable after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildResult {
    pub root: HierarchyNode,
    pub source_vocabulary: String,
    pub domain: Domain,
    pub target_vocabularies: Vec<String>,
    pub codes: Vec<CodeRecord>,
    /// Number of unique concepts resolved during the initial hierarchy walk.
    pub source_concept_count: usize,
}

/// Extract a source code from a raw code field.
///
/// The terminology service sometimes returns the code as a REST URL such as
/// `https://.../source/ICD10CM/G43.909`; in that case the final path segment
/// is the code and the original URL is returned alongside it.
pub fn extract_source_code(raw: &str) -> (String, Option<String>) {
    if raw.starts_with("http://") || raw.starts_with("https://") {
        let code = raw
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or("")
            .to_string();
        (code, Some(raw.to_string()))
    } else {
        (raw.to_string(), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_source_code_from_url() {
        let (code, url) = extract_source_code(
            "https://uts-ws.nlm.nih.gov/rest/content/2024AB/source/ICD10CM/G43.909",
        );
        assert_eq!(code, "G43.909");
        assert_eq!(
            url.as_deref(),
            Some("https://uts-ws.nlm.nih.gov/rest/content/2024AB/source/ICD10CM/G43.909")
        );
    }

    #[test]
    fn test_extract_source_code_plain() {
        let (code, url) = extract_source_code("G43.909");
        assert_eq!(code, "G43.909");
        assert!(url.is_none());
    }

    #[test]
    fn test_extract_source_code_trailing_slash() {
        let (code, _) = extract_source_code("https://example.org/source/SNOMEDCT_US/37796009/");
        assert_eq!(code, "37796009");
    }
}
