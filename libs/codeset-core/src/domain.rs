//! Clinical domain classification: pure lookup tables.
//!
//! Two deliberately separate semantic-type tables exist: one selects the
//! *build* domain (which drives target-vocabulary selection), the other a
//! *display* grouping for presentation layers. They overlap but must not be
//! conflated; e.g. lab-result types build as Measurement but display as Lab.

use std::fmt;
use std::str::FromStr;

use phf::phf_map;
use serde::{Deserialize, Serialize};

use crate::model::SemanticType;

pub mod vocab {
    //! UMLS source abbreviations used throughout the pipeline.
    pub const SNOMEDCT_US: &str = "SNOMEDCT_US";
    pub const ICD10CM: &str = "ICD10CM";
    pub const ICD9CM: &str = "ICD9CM";
    pub const ICD10PCS: &str = "ICD10PCS";
    pub const RXNORM: &str = "RXNORM";
    pub const NDC: &str = "NDC";
    pub const ATC: &str = "ATC";
    pub const LNC: &str = "LNC";
    pub const CPT: &str = "CPT";
    pub const HCPCS: &str = "HCPCS";
}

/// The five clinical domains a code set can be built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Condition,
    Drug,
    Measurement,
    Procedure,
    Observation,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Condition => "condition",
            Domain::Drug => "drug",
            Domain::Measurement => "measurement",
            Domain::Procedure => "procedure",
            Domain::Observation => "observation",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "condition" => Ok(Domain::Condition),
            "drug" => Ok(Domain::Drug),
            "measurement" => Ok(Domain::Measurement),
            "procedure" => Ok(Domain::Procedure),
            "observation" => Ok(Domain::Observation),
            other => Err(format!("unknown domain '{other}'")),
        }
    }
}

/// Display grouping for presentation layers. Distinct from [`Domain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayGroup {
    Disease,
    Drug,
    Lab,
    Procedure,
    Vaccine,
}

/// Semantic-type code → build domain. First match wins.
static DOMAIN_BY_TYPE: phf::Map<&'static str, Domain> = phf_map! {
    // Diseases, syndromes, findings with disease character
    "T047" => Domain::Condition,
    "T048" => Domain::Condition,
    "T046" => Domain::Condition,
    "T184" => Domain::Condition,
    "T191" => Domain::Condition,
    "T019" => Domain::Condition,
    // Substances and drug preparations
    "T109" => Domain::Drug,
    "T121" => Domain::Drug,
    "T200" => Domain::Drug,
    "T195" => Domain::Drug,
    // Laboratory procedures and results
    "T059" => Domain::Measurement,
    "T034" => Domain::Measurement,
    "T201" => Domain::Measurement,
    // Procedures
    "T060" => Domain::Procedure,
    "T061" => Domain::Procedure,
    // Findings and attributes without disease character
    "T033" => Domain::Observation,
    "T041" => Domain::Observation,
    "T032" => Domain::Observation,
};

/// Semantic-type code → display grouping. Deliberately a separate table.
static DISPLAY_GROUP_BY_TYPE: phf::Map<&'static str, DisplayGroup> = phf_map! {
    "T047" => DisplayGroup::Disease,
    "T048" => DisplayGroup::Disease,
    "T046" => DisplayGroup::Disease,
    "T184" => DisplayGroup::Disease,
    "T191" => DisplayGroup::Disease,
    "T019" => DisplayGroup::Disease,
    "T033" => DisplayGroup::Disease,
    "T109" => DisplayGroup::Drug,
    "T121" => DisplayGroup::Drug,
    "T200" => DisplayGroup::Drug,
    "T195" => DisplayGroup::Drug,
    "T059" => DisplayGroup::Lab,
    "T034" => DisplayGroup::Lab,
    "T201" => DisplayGroup::Lab,
    "T060" => DisplayGroup::Lab,
    "T061" => DisplayGroup::Procedure,
    "T129" => DisplayGroup::Vaccine,
};

/// The one vocabulary per domain considered authoritative for hierarchy
/// walking. Building from any other vocabulary re-anchors here first.
pub fn standard_vocabulary_for(domain: Domain) -> &'static str {
    match domain {
        Domain::Condition | Domain::Procedure | Domain::Observation => vocab::SNOMEDCT_US,
        Domain::Drug => vocab::RXNORM,
        Domain::Measurement => vocab::LNC,
    }
}

/// Ordered target vocabulary set per domain.
pub fn target_vocabularies_for(domain: Domain) -> &'static [&'static str] {
    match domain {
        Domain::Condition => &[vocab::SNOMEDCT_US, vocab::ICD10CM, vocab::ICD9CM],
        Domain::Drug => &[vocab::RXNORM, vocab::ATC, vocab::NDC],
        Domain::Measurement => &[vocab::LNC, vocab::SNOMEDCT_US, vocab::CPT],
        Domain::Procedure => &[
            vocab::SNOMEDCT_US,
            vocab::CPT,
            vocab::HCPCS,
            vocab::ICD10PCS,
        ],
        Domain::Observation => &[vocab::SNOMEDCT_US, vocab::LNC, vocab::ICD10CM],
    }
}

/// Classify a concept's semantic types into a build domain.
///
/// First matching type in input order wins; an empty or unmapped list falls
/// back to [`Domain::Condition`].
pub fn domain_for_semantic_types(types: &[SemanticType]) -> Domain {
    types
        .iter()
        .find_map(|t| DOMAIN_BY_TYPE.get(t.type_code.as_str()).copied())
        .unwrap_or(Domain::Condition)
}

/// Classify semantic types into a display grouping (first match wins,
/// defaulting to Disease).
pub fn display_group_for_semantic_types(types: &[SemanticType]) -> DisplayGroup {
    types
        .iter()
        .find_map(|t| DISPLAY_GROUP_BY_TYPE.get(t.type_code.as_str()).copied())
        .unwrap_or(DisplayGroup::Disease)
}

/// Whether a vocabulary participates in target-side hierarchical expansion.
///
/// RXNORM is included even though its traversal is flat; the walker decides
/// the traversal mode. NDC, CPT and HCPCS are flat code lists with no
/// walkable hierarchy on the service.
pub fn is_expandable(vocabulary: &str) -> bool {
    matches!(
        vocabulary,
        vocab::SNOMEDCT_US
            | vocab::ICD10CM
            | vocab::ICD9CM
            | vocab::ICD10PCS
            | vocab::RXNORM
            | vocab::ATC
            | vocab::LNC
    )
}
