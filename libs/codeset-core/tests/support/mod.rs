//! Scripted in-memory gateway for pipeline tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use codeset_core::{
    Atom, Concept, GatewayError, GatewayResult, HierarchyNode, ProductCode, SearchHit, SearchSort,
    SemanticType, TerminologyGateway,
};

/// Gateway whose responses are scripted per test. Unscripted lookups return
/// empty results (descendants, products) or a not-found-style error
/// (concepts), mirroring the real gateway's normalization.
#[derive(Default)]
pub struct ScriptedGateway {
    descendants: HashMap<(String, String), Vec<HierarchyNode>>,
    concept_ids: HashMap<(String, String), String>,
    concepts: HashMap<String, (Concept, Vec<Atom>)>,
    related: HashMap<String, Vec<HierarchyNode>>,
    products: HashMap<String, Vec<ProductCode>>,
    failing_descendants: HashSet<(String, String)>,
    failing_concepts: HashSet<String>,
    pub descendant_calls: AtomicUsize,
    pub related_calls: AtomicUsize,
    pub concept_calls: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_descendants(
        mut self,
        vocabulary: &str,
        code: &str,
        children: Vec<HierarchyNode>,
    ) -> Self {
        self.descendants
            .insert((vocabulary.to_string(), code.to_string()), children);
        self
    }

    pub fn with_concept_id(mut self, vocabulary: &str, code: &str, concept_id: &str) -> Self {
        self.concept_ids.insert(
            (vocabulary.to_string(), code.to_string()),
            concept_id.to_string(),
        );
        self
    }

    pub fn with_concept(mut self, concept: Concept, atoms: Vec<Atom>) -> Self {
        self.concepts
            .insert(concept.concept_id.clone(), (concept, atoms));
        self
    }

    pub fn with_related(mut self, code: &str, related: Vec<HierarchyNode>) -> Self {
        self.related.insert(code.to_string(), related);
        self
    }

    pub fn with_products(mut self, drug_code: &str, products: Vec<ProductCode>) -> Self {
        self.products.insert(drug_code.to_string(), products);
        self
    }

    /// Script a server-side failure for one descendant listing.
    pub fn with_descendants_failure(mut self, vocabulary: &str, code: &str) -> Self {
        self.failing_descendants
            .insert((vocabulary.to_string(), code.to_string()));
        self
    }

    /// Script a server-side failure for one concept fetch.
    pub fn with_concept_failure(mut self, concept_id: &str) -> Self {
        self.failing_concepts.insert(concept_id.to_string());
        self
    }
}

#[async_trait]
impl TerminologyGateway for ScriptedGateway {
    async fn search_concepts(
        &self,
        _term: &str,
        _vocabularies: Option<&[String]>,
        _sort: SearchSort,
    ) -> GatewayResult<Vec<SearchHit>> {
        Ok(Vec::new())
    }

    async fn concept_with_atoms(
        &self,
        concept_id: &str,
        vocabularies: &[String],
    ) -> GatewayResult<(Concept, Vec<Atom>)> {
        self.concept_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_concepts.contains(concept_id) {
            return Err(GatewayError::Status {
                status: 500,
                message: format!("scripted failure for {concept_id}"),
            });
        }
        let (concept, atoms) =
            self.concepts
                .get(concept_id)
                .ok_or_else(|| GatewayError::Status {
                    status: 404,
                    message: format!("unscripted concept {concept_id}"),
                })?;
        let filtered = atoms
            .iter()
            .filter(|a| vocabularies.iter().any(|v| v == &a.vocabulary))
            .cloned()
            .collect();
        Ok((concept.clone(), filtered))
    }

    async fn ancestors(&self, _vocabulary: &str, _code: &str) -> GatewayResult<Vec<HierarchyNode>> {
        Ok(Vec::new())
    }

    async fn descendants(
        &self,
        vocabulary: &str,
        code: &str,
    ) -> GatewayResult<Vec<HierarchyNode>> {
        self.descendant_calls.fetch_add(1, Ordering::SeqCst);
        if self
            .failing_descendants
            .contains(&(vocabulary.to_string(), code.to_string()))
        {
            return Err(GatewayError::Status {
                status: 500,
                message: format!("scripted failure for {vocabulary}/{code}"),
            });
        }
        Ok(self
            .descendants
            .get(&(vocabulary.to_string(), code.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn immediate_descendant_count(
        &self,
        vocabulary: &str,
        code: &str,
    ) -> GatewayResult<usize> {
        Ok(self
            .descendants
            .get(&(vocabulary.to_string(), code.to_string()))
            .map(Vec::len)
            .unwrap_or(0))
    }

    async fn source_concept_id(
        &self,
        vocabulary: &str,
        code: &str,
    ) -> GatewayResult<Option<String>> {
        Ok(self
            .concept_ids
            .get(&(vocabulary.to_string(), code.to_string()))
            .cloned())
    }

    async fn map_drug_to_product(
        &self,
        drug_code: &str,
        _concept_id: Option<&str>,
    ) -> GatewayResult<Vec<ProductCode>> {
        Ok(self.products.get(drug_code).cloned().unwrap_or_default())
    }

    async fn related_drug_concepts(&self, code: &str) -> GatewayResult<Vec<HierarchyNode>> {
        self.related_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.related.get(code).cloned().unwrap_or_default())
    }
}

pub fn node(vocabulary: &str, code: &str, term: &str) -> HierarchyNode {
    HierarchyNode::new(vocabulary, code, term)
}

pub fn concept(concept_id: &str, name: &str, type_codes: &[&str]) -> Concept {
    Concept {
        concept_id: concept_id.to_string(),
        preferred_name: name.to_string(),
        semantic_types: type_codes
            .iter()
            .map(|c| SemanticType {
                type_code: (*c).to_string(),
                type_name: String::new(),
            })
            .collect(),
    }
}

pub fn atom(vocabulary: &str, code: &str, term_type: &str, term: &str) -> Atom {
    Atom {
        atom_id: format!("A-{vocabulary}-{code}-{term_type}"),
        source_code: code.to_string(),
        vocabulary: vocabulary.to_string(),
        term_type: term_type.to_string(),
        display_term: term.to_string(),
        code_url: None,
    }
}
