//! The cross-vocabulary expansion pipeline.
//!
//! `build` runs eight strictly sequential stages: root normalization, source
//! hierarchy walk, concept reconciliation, target-vocabulary fetch,
//! target-side hierarchical expansion, drug→product mapping, final dedup,
//! and result assembly. The only hard abort is the standard-vocabulary gate
//! in stage 1; every other per-item failure is logged and skipped, because
//! an expansion touching thousands of remote calls must degrade gracefully
//! rather than void the whole build over one bad code.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::domain::{
    is_expandable, standard_vocabulary_for, target_vocabularies_for, vocab, Domain,
};
use crate::doseform::parse_dose_form_and_strength;
use crate::error::{BuildError, Result};
use crate::gateway::TerminologyGateway;
use crate::model::{Atom, BuildResult, CodeRecord, Concept, HierarchyNode};
use crate::progress::{report, CancelToken, ProgressFn};
use crate::reconciler::{resolve_concept_ids, resolve_one};
use crate::walker::walk_descendants;

const BROWSE_URL_BASE: &str = "https://uts.nlm.nih.gov/uts/umls/concept";

/// Public browseable reference for a concept.
pub fn concept_browse_url(concept_id: &str) -> String {
    format!("{BROWSE_URL_BASE}/{concept_id}")
}

/// Builds one code set per invocation. Holds no state across builds; the
/// visited/processed sets live inside `build`.
pub struct CodeSetBuilder<'a> {
    gateway: &'a dyn TerminologyGateway,
    progress: Option<&'a ProgressFn>,
    cancel: CancelToken,
}

impl<'a> CodeSetBuilder<'a> {
    pub fn new(gateway: &'a dyn TerminologyGateway) -> Self {
        Self {
            gateway,
            progress: None,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_progress(mut self, progress: &'a ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Pre-flight sizing for the confirmation step layered on top of this
    /// core: how many immediate descendants the root has.
    pub async fn estimate_immediate_descendant_count(
        &self,
        vocabulary: &str,
        code: &str,
    ) -> Result<usize> {
        Ok(self
            .gateway
            .immediate_descendant_count(vocabulary, code)
            .await?)
    }

    /// Pre-flight sizing against the hierarchy `build` will actually walk:
    /// the seed is re-anchored to the domain's standard vocabulary first, so
    /// a non-standard seed is sized by its standard anchor's fan-out, not
    /// its own. Fails with the same standard-vocabulary gate as `build`.
    pub async fn estimate_build_size(&self, seed: &HierarchyNode, domain: Domain) -> Result<usize> {
        let standard = standard_vocabulary_for(domain);
        let root = self.normalize_root(seed, standard).await?;
        Ok(self
            .gateway
            .immediate_descendant_count(standard, &root.code)
            .await?)
    }

    /// Run the full pipeline for one seed node.
    pub async fn build(&self, seed: HierarchyNode, domain: Domain) -> Result<BuildResult> {
        let standard = standard_vocabulary_for(domain);
        let targets: Vec<String> = target_vocabularies_for(domain)
            .iter()
            .map(|v| (*v).to_string())
            .collect();

        // Stage 1: anchor the walk in the domain's standard vocabulary.
        let walk_root = self.normalize_root(&seed, standard).await?;
        info!(
            domain = %domain,
            vocabulary = standard,
            code = %walk_root.code,
            "starting code set build"
        );

        // Stage 2: source hierarchy walk, root prepended.
        let mut source_nodes = vec![walk_root.clone()];
        source_nodes.extend(
            walk_descendants(
                self.gateway,
                standard,
                &walk_root.code,
                self.progress,
                &self.cancel,
            )
            .await?,
        );

        // Stage 3: reconcile every source code to its concept id.
        let pairs: Vec<(String, String)> = source_nodes
            .iter()
            .map(|n| (n.vocabulary.clone(), n.code.clone()))
            .collect();
        let concept_ids =
            resolve_concept_ids(self.gateway, &pairs, self.progress, &self.cancel).await?;
        let source_concept_count = concept_ids.len();
        info!(
            source_codes = pairs.len(),
            concepts = source_concept_count,
            "source hierarchy reconciled"
        );

        // Stage 4: target-vocabulary atoms for every resolved concept.
        let mut seen_concepts: HashSet<String> = concept_ids.iter().cloned().collect();
        let mut direct: Vec<CodeRecord> = Vec::new();
        for (index, concept_id) in concept_ids.iter().enumerate() {
            self.cancel.check()?;
            report(
                self.progress,
                "fetching target vocabularies",
                index + 1,
                concept_ids.len(),
            );
            match self.gateway.concept_with_atoms(concept_id, &targets).await {
                Ok((concept, atoms)) => {
                    for atom in dedup_atoms_prefer_preferred(atoms) {
                        direct.push(record_from_atom(&concept, &atom));
                    }
                }
                Err(err) => {
                    warn!(concept_id = %concept_id, error = %err, "skipping unfetchable concept");
                }
            }
        }

        // Stage 5: re-expand hierarchies within the target vocabularies.
        let expanded = self
            .expand_target_hierarchies(&direct, &targets, &mut seen_concepts)
            .await?;

        // Stage 6: drug→product secondary mapping.
        let products = if targets.iter().any(|t| t == vocab::NDC) {
            self.map_drug_products(direct.iter().chain(expanded.iter()))
                .await?
        } else {
            Vec::new()
        };

        // Stage 7: first-wins dedup; stage order encodes priority (direct
        // target atoms → hierarchically expanded → drug products).
        let mut seen_keys: HashSet<(String, String)> = HashSet::new();
        let codes: Vec<CodeRecord> = direct
            .into_iter()
            .chain(expanded)
            .chain(products)
            .filter(|record| {
                seen_keys.insert((record.vocabulary.clone(), record.code.clone()))
            })
            .collect();

        info!(codes = codes.len(), concepts = source_concept_count, "build complete");

        // Stage 8: assemble.
        Ok(BuildResult {
            root: seed,
            source_vocabulary: standard.to_string(),
            domain,
            target_vocabularies: targets,
            codes,
            source_concept_count,
        })
    }

    /// Stage 1: if the seed is not in the standard vocabulary, re-anchor to
    /// the standard-vocabulary atom sharing the same concept; fail the whole
    /// build if none exists.
    async fn normalize_root(&self, seed: &HierarchyNode, standard: &str) -> Result<HierarchyNode> {
        if seed.vocabulary == standard {
            return Ok(seed.clone());
        }

        let concept_id = resolve_one(self.gateway, &seed.vocabulary, &seed.code)
            .await?
            .ok_or_else(|| BuildError::MissingStandardVocabulary {
                vocabulary: standard.to_string(),
                concept_id: format!("{}/{}", seed.vocabulary, seed.code),
            })?;

        let (_, atoms) = self
            .gateway
            .concept_with_atoms(&concept_id, &[standard.to_string()])
            .await?;
        let anchor = atoms
            .iter()
            .find(|a| a.term_type == "PT")
            .or_else(|| atoms.first())
            .ok_or_else(|| BuildError::MissingStandardVocabulary {
                vocabulary: standard.to_string(),
                concept_id: concept_id.clone(),
            })?;

        info!(
            from = %format!("{}/{}", seed.vocabulary, seed.code),
            to = %format!("{}/{}", standard, anchor.source_code),
            "re-anchored root to standard vocabulary"
        );
        Ok(HierarchyNode::new(
            standard,
            anchor.source_code.clone(),
            anchor.display_term.clone(),
        ))
    }

    /// Stage 5: for every unique expandable `(vocabulary, code)` pair from
    /// stage 4, walk its descendants within the target vocabulary and emit
    /// records for each newly reconciled concept. The `processed` set spans
    /// the whole stage so no pair is expanded twice.
    async fn expand_target_hierarchies(
        &self,
        direct: &[CodeRecord],
        targets: &[String],
        seen_concepts: &mut HashSet<String>,
    ) -> Result<Vec<CodeRecord>> {
        let mut processed: HashSet<(String, String)> = HashSet::new();
        let roots: Vec<(String, String)> = direct
            .iter()
            .filter(|r| is_expandable(&r.vocabulary))
            .map(|r| (r.vocabulary.clone(), r.code.clone()))
            .filter(|pair| processed.insert(pair.clone()))
            .collect();

        let mut expanded: Vec<CodeRecord> = Vec::new();
        for (index, (vocabulary, code)) in roots.iter().enumerate() {
            self.cancel.check()?;
            report(
                self.progress,
                "expanding target hierarchies",
                index + 1,
                roots.len(),
            );

            let descendants = match walk_descendants(
                self.gateway,
                vocabulary,
                code,
                self.progress,
                &self.cancel,
            )
            .await
            {
                Ok(descendants) => descendants,
                Err(BuildError::Cancelled) => return Err(BuildError::Cancelled),
                Err(err) => {
                    warn!(vocabulary, code = %code, error = %err, "skipping target expansion");
                    continue;
                }
            };

            for descendant in descendants {
                if !processed.insert((descendant.vocabulary.clone(), descendant.code.clone())) {
                    continue;
                }
                let concept_id =
                    match resolve_one(self.gateway, &descendant.vocabulary, &descendant.code).await
                    {
                        Ok(Some(concept_id)) => concept_id,
                        Ok(None) => continue,
                        Err(err) => {
                            warn!(
                                vocabulary = %descendant.vocabulary,
                                code = %descendant.code,
                                error = %err,
                                "skipping unresolvable descendant"
                            );
                            continue;
                        }
                    };
                // A concept already fetched contributed its target atoms in
                // an earlier stage; refetching would only duplicate rows.
                if !seen_concepts.insert(concept_id.clone()) {
                    continue;
                }
                match self.gateway.concept_with_atoms(&concept_id, targets).await {
                    Ok((concept, atoms)) => {
                        for atom in dedup_atoms_prefer_preferred(atoms) {
                            expanded.push(record_from_atom(&concept, &atom));
                        }
                    }
                    Err(err) => {
                        warn!(concept_id = %concept_id, error = %err, "skipping unfetchable concept");
                    }
                }
            }
        }

        Ok(expanded)
    }

    /// Stage 6: map every distinct drug-vocabulary code to its dispensable
    /// product codes, carrying forward the parent drug's attributes.
    async fn map_drug_products(
        &self,
        records: impl Iterator<Item = &CodeRecord>,
    ) -> Result<Vec<CodeRecord>> {
        let mut seen_drug_codes: HashSet<String> = HashSet::new();
        let drugs: Vec<&CodeRecord> = records
            .filter(|r| r.vocabulary == vocab::RXNORM && seen_drug_codes.insert(r.code.clone()))
            .collect();

        let mut products: Vec<CodeRecord> = Vec::new();
        for (index, drug) in drugs.iter().enumerate() {
            self.cancel.check()?;
            report(self.progress, "mapping drug products", index + 1, drugs.len());

            let mapped = match self
                .gateway
                .map_drug_to_product(&drug.code, Some(&drug.concept_id))
                .await
            {
                Ok(mapped) => mapped,
                Err(err) => {
                    warn!(code = %drug.code, error = %err, "skipping drug product mapping");
                    continue;
                }
            };

            for product in mapped {
                products.push(CodeRecord {
                    concept_id: drug.concept_id.clone(),
                    concept_name: drug.concept_name.clone(),
                    vocabulary: vocab::NDC.to_string(),
                    code: product.code,
                    term: product.name.unwrap_or_else(|| drug.term.clone()),
                    code_url: concept_browse_url(&drug.concept_id),
                    dose_form: drug.dose_form.clone(),
                    strength: drug.strength.clone(),
                    source_rx_concept_id: Some(drug.code.clone()),
                });
            }
        }

        Ok(products)
    }
}

fn record_from_atom(concept: &Concept, atom: &Atom) -> CodeRecord {
    let parsed = if atom.vocabulary == vocab::RXNORM {
        parse_dose_form_and_strength(&atom.display_term)
    } else {
        Default::default()
    };
    CodeRecord {
        concept_id: concept.concept_id.clone(),
        concept_name: concept.preferred_name.clone(),
        vocabulary: atom.vocabulary.clone(),
        code: atom.source_code.clone(),
        term: atom.display_term.clone(),
        code_url: concept_browse_url(&concept.concept_id),
        dose_form: parsed.dose_form,
        strength: parsed.strength,
        source_rx_concept_id: None,
    }
}

/// Collapse atoms to one per `(vocabulary, code)`, preferring the preferred
/// term over synonyms when both carry the same code.
fn dedup_atoms_prefer_preferred(atoms: Vec<Atom>) -> Vec<Atom> {
    let mut kept: Vec<Atom> = Vec::new();
    for atom in atoms {
        match kept
            .iter_mut()
            .find(|a| a.vocabulary == atom.vocabulary && a.source_code == atom.source_code)
        {
            Some(existing) => {
                if existing.term_type != "PT" && atom.term_type == "PT" {
                    *existing = atom;
                }
            }
            None => kept.push(atom),
        }
    }
    kept
}
