//! Wire models for the UMLS and RxNav REST payloads.
//!
//! The deep nested payloads are mapped into the strongly-typed core model at
//! this boundary; nothing untyped crosses into the pipeline.

use serde::Deserialize;

use codeset_core::{extract_source_code, Atom, Concept, SemanticType};

/// Sentinel concept id the search operation uses for "no results".
pub const NO_RESULTS_UI: &str = "NONE";

#[derive(Debug, Deserialize)]
pub struct SearchEnvelope {
    pub result: SearchBody,
}

#[derive(Debug, Deserialize)]
pub struct SearchBody {
    #[serde(default)]
    pub results: Vec<SearchRow>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRow {
    pub ui: String,
    pub name: String,
    #[serde(default)]
    pub root_source: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConceptEnvelope {
    pub result: ConceptRow,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptRow {
    pub ui: String,
    pub name: String,
    #[serde(default)]
    pub semantic_types: Vec<SemanticTypeRow>,
}

#[derive(Debug, Deserialize)]
pub struct SemanticTypeRow {
    pub name: String,
    #[serde(default)]
    pub uri: Option<String>,
}

impl ConceptRow {
    pub fn into_concept(self) -> Concept {
        Concept {
            concept_id: self.ui,
            preferred_name: self.name,
            semantic_types: self
                .semantic_types
                .into_iter()
                .map(|st| {
                    // The type code is the trailing segment of the
                    // semantic-network URI, e.g. .../TUI/T047.
                    let type_code = st
                        .uri
                        .as_deref()
                        .map(|uri| extract_source_code(uri).0)
                        .unwrap_or_default();
                    SemanticType {
                        type_code,
                        type_name: st.name,
                    }
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AtomListEnvelope {
    #[serde(default)]
    pub result: Vec<AtomRow>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtomRow {
    pub ui: String,
    pub name: String,
    #[serde(default)]
    pub root_source: Option<String>,
    #[serde(default)]
    pub term_type: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    /// REST reference to the concept this atom belongs to.
    #[serde(default)]
    pub concept: Option<String>,
}

impl AtomRow {
    pub fn into_atom(self) -> Atom {
        let (source_code, code_url) = self
            .code
            .as_deref()
            .map(extract_source_code)
            .unwrap_or_default();
        Atom {
            atom_id: self.ui,
            source_code,
            vocabulary: self.root_source.unwrap_or_default(),
            term_type: self.term_type.unwrap_or_default(),
            display_term: self.name,
            code_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ClusterListEnvelope {
    #[serde(default)]
    pub result: Vec<ClusterRow>,
}

/// A source-asserted cluster row, as returned by the ancestor/descendant/
/// children operations; `ui` carries the source code.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterRow {
    pub ui: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct SourceEnvelope {
    pub result: SourceRow,
}

/// The source-code-asserted identifier record; `atoms` is the embedded
/// atoms-collection reference followed during reconciliation.
#[derive(Debug, Deserialize)]
pub struct SourceRow {
    #[serde(default)]
    pub atoms: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AttributeListEnvelope {
    #[serde(default)]
    pub result: Vec<AttributeRow>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeRow {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

// RxNav payloads.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedEnvelope {
    #[serde(default)]
    pub related_group: Option<RelatedGroup>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedGroup {
    #[serde(default)]
    pub concept_group: Vec<ConceptGroup>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptGroup {
    #[serde(default)]
    pub tty: Option<String>,
    #[serde(default)]
    pub concept_properties: Vec<ConceptProperty>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptProperty {
    pub rxcui: String,
    pub name: String,
    #[serde(default)]
    pub tty: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NdcEnvelope {
    #[serde(default)]
    pub ndc_group: Option<NdcGroup>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NdcGroup {
    #[serde(default)]
    pub ndc_list: Option<NdcList>,
}

#[derive(Debug, Deserialize)]
pub struct NdcList {
    #[serde(default)]
    pub ndc: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atom_row_extracts_url_shaped_code() {
        let json = r#"{
            "ui": "A0066000",
            "name": "Migraine, unspecified",
            "rootSource": "ICD10CM",
            "termType": "PT",
            "code": "https://uts-ws.nlm.nih.gov/rest/content/2024AB/source/ICD10CM/G43.909",
            "concept": "https://uts-ws.nlm.nih.gov/rest/content/2024AB/CUI/C0149931"
        }"#;
        let row: AtomRow = serde_json::from_str(json).unwrap();
        let atom = row.into_atom();
        assert_eq!(atom.source_code, "G43.909");
        assert_eq!(atom.vocabulary, "ICD10CM");
        assert!(atom.code_url.as_deref().unwrap().ends_with("/G43.909"));
    }

    #[test]
    fn test_concept_row_extracts_type_code_from_uri() {
        let json = r#"{
            "ui": "C0149931",
            "name": "Migraine",
            "semanticTypes": [
                {"name": "Disease or Syndrome",
                 "uri": "https://uts-ws.nlm.nih.gov/rest/semantic-network/2024AB/TUI/T047"}
            ]
        }"#;
        let row: ConceptRow = serde_json::from_str(json).unwrap();
        let concept = row.into_concept();
        assert_eq!(concept.semantic_types.len(), 1);
        assert_eq!(concept.semantic_types[0].type_code, "T047");
        assert_eq!(concept.semantic_types[0].type_name, "Disease or Syndrome");
    }

    #[test]
    fn test_related_envelope_tolerates_missing_groups() {
        let envelope: RelatedEnvelope = serde_json::from_str(r#"{}"#).unwrap();
        assert!(envelope.related_group.is_none());

        let envelope: RelatedEnvelope =
            serde_json::from_str(r#"{"relatedGroup": {"conceptGroup": [{"tty": "SCD"}]}}"#)
                .unwrap();
        let group = envelope.related_group.unwrap();
        assert_eq!(group.concept_group.len(), 1);
        assert!(group.concept_group[0].concept_properties.is_empty());
    }

    #[test]
    fn test_ndc_envelope() {
        let json = r#"{"ndcGroup": {"rxcui": "855332", "ndcList": {"ndc": ["00056017275"]}}}"#;
        let envelope: NdcEnvelope = serde_json::from_str(json).unwrap();
        let ndcs = envelope
            .ndc_group
            .and_then(|g| g.ndc_list)
            .map(|l| l.ndc)
            .unwrap_or_default();
        assert_eq!(ndcs, vec!["00056017275"]);
    }
}
