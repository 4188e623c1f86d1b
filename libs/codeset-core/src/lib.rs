//! Hierarchy-expansion and cross-vocabulary reconciliation engine.
//!
//! Turns a single seed medical-terminology code into a comprehensive,
//! de-duplicated, cross-vocabulary code set suitable for clinical cohort
//! definitions: walk the seed vocabulary's descendant hierarchy, reconcile
//! every discovered code to its unifying concept, re-expand into the
//! clinical domain's target vocabularies, and apply the drug→product
//! secondary mapping.
//!
//! The engine talks to the remote terminology services exclusively through
//! the [`gateway::TerminologyGateway`] trait; the HTTP implementation lives
//! in the `codeset-terminology-client` crate.
//!
//! # Example
//!
//! ```rust,no_run
//! use codeset_core::{CodeSetBuilder, Domain, HierarchyNode};
//! # async fn example(gateway: &dyn codeset_core::TerminologyGateway)
//! # -> Result<(), codeset_core::BuildError> {
//! let builder = CodeSetBuilder::new(gateway);
//! let seed = HierarchyNode::new("SNOMEDCT_US", "37796009", "Migraine");
//! let result = builder.build(seed, Domain::Condition).await?;
//! println!("{} codes", result.codes.len());
//! # Ok(())
//! # }
//! ```

pub mod domain;
pub mod doseform;
pub mod error;
pub mod expander;
pub mod export;
pub mod gateway;
pub mod model;
pub mod progress;
pub mod reconciler;
pub mod walker;

pub use domain::{
    display_group_for_semantic_types, domain_for_semantic_types, standard_vocabulary_for,
    target_vocabularies_for, vocab, DisplayGroup, Domain,
};
pub use doseform::{parse_dose_form_and_strength, ParsedDrugName};
pub use error::{BuildError, Result};
pub use expander::{concept_browse_url, CodeSetBuilder};
pub use export::{export_file_name, select_for_export, to_tsv, ExportFilter};
pub use gateway::{GatewayError, GatewayResult, SearchSort, TerminologyGateway};
pub use model::{
    extract_source_code, Atom, BuildResult, CodeRecord, Concept, HierarchyNode, ProductCode,
    ProductCodeOrigin, SearchHit, SemanticType,
};
pub use progress::{CancelToken, ProgressFn};
pub use reconciler::resolve_concept_ids;
pub use walker::walk_descendants;
