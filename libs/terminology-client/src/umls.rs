//! The UMLS-backed implementation of the terminology gateway.

use std::collections::HashSet;

use async_trait::async_trait;
use futures::future::{join, join_all};
use reqwest::Client;
use tracing::{debug, warn};

use codeset_core::{
    extract_source_code, vocab, Atom, Concept, GatewayError, GatewayResult, HierarchyNode,
    ProductCode, ProductCodeOrigin, SearchHit, SearchSort, TerminologyGateway,
};

use crate::config::TerminologyConfig;
use crate::http::{get_optional, with_query};
use crate::rxnav::RxNavClient;
use crate::wire::{
    AtomListEnvelope, AtomRow, AttributeListEnvelope, ClusterListEnvelope, ConceptEnvelope,
    SearchEnvelope, SearchRow, SourceEnvelope, NO_RESULTS_UI,
};

const UMLS_VERSION: &str = "current";
const SEARCH_PAGE_SIZE: usize = 25;
const SEARCH_MAX_PAGES: usize = 4;
const TREE_PAGE_SIZE: usize = 500;
const TREE_MAX_PAGES: usize = 20;
const ATOM_PAGE_SIZE: usize = 500;
const ATOM_MAX_PAGES: usize = 20;

/// HTTP client for the UMLS terminology service and its companion
/// drug-relation service.
#[derive(Clone)]
pub struct TerminologyClient {
    http: Client,
    config: TerminologyConfig,
    rxnav: RxNavClient,
}

impl TerminologyClient {
    pub fn new(config: TerminologyConfig) -> GatewayResult<Self> {
        if config.api_key.is_empty() {
            return Err(GatewayError::Config("API key must not be empty".to_string()));
        }
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        let rxnav = RxNavClient::new(http.clone(), config.rxnav_base_url.clone());
        Ok(Self {
            http,
            config,
            rxnav,
        })
    }

    /// Client configured from the environment (see [`TerminologyConfig::from_env`]).
    pub fn from_env() -> GatewayResult<Self> {
        Self::new(TerminologyConfig::from_env()?)
    }

    fn content_url(&self, path: &str) -> String {
        let url = format!(
            "{}/content/{}/{}",
            self.config.umls_base_url, UMLS_VERSION, path
        );
        with_query(&url, "apiKey", &self.config.api_key)
    }

    /// Page through a source-asserted cluster listing (children, ancestors)
    /// until a short page or the hard page ceiling.
    async fn fetch_cluster_pages(
        &self,
        vocabulary: &str,
        code: &str,
        relation: &str,
    ) -> GatewayResult<Vec<HierarchyNode>> {
        let mut nodes: Vec<HierarchyNode> = Vec::new();
        for page in 1..=TREE_MAX_PAGES {
            let url = format!(
                "{}&pageNumber={}&pageSize={}",
                self.content_url(&format!("source/{vocabulary}/{code}/{relation}")),
                page,
                TREE_PAGE_SIZE
            );
            let envelope: Option<ClusterListEnvelope> = get_optional(&self.http, &url).await?;
            let rows = match envelope {
                Some(envelope) => envelope.result,
                None => break,
            };
            let count = rows.len();
            for row in rows {
                let (row_code, _) = extract_source_code(&row.ui);
                nodes.push(HierarchyNode::new(vocabulary, row_code, row.name));
            }
            if last_page(count, TREE_PAGE_SIZE) {
                break;
            }
        }
        debug!(vocabulary, code, relation, count = nodes.len(), "fetched cluster listing");
        Ok(nodes)
    }

    /// Page through an atoms listing until a short page or the hard page
    /// ceiling. `base_url` already carries the filter and pageSize query.
    async fn fetch_atom_pages(&self, base_url: &str) -> GatewayResult<Vec<AtomRow>> {
        let mut rows: Vec<AtomRow> = Vec::new();
        for page in 1..=ATOM_MAX_PAGES {
            let url = format!("{base_url}&pageNumber={page}");
            let envelope: Option<AtomListEnvelope> = get_optional(&self.http, &url).await?;
            let page_rows = match envelope {
                Some(envelope) => envelope.result,
                None => break,
            };
            let count = page_rows.len();
            rows.extend(page_rows);
            if last_page(count, ATOM_PAGE_SIZE) {
                break;
            }
        }
        Ok(rows)
    }

    async fn fetch_attributes(&self, path: &str) -> GatewayResult<Vec<(String, String)>> {
        let url = format!(
            "{}&pageSize={}",
            self.content_url(&format!("{path}/attributes")),
            ATOM_PAGE_SIZE
        );
        let envelope: Option<AttributeListEnvelope> = get_optional(&self.http, &url).await?;
        Ok(envelope
            .map(|e| e.result)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|row| Some((row.name?, row.value?)))
            .collect())
    }
}

#[async_trait]
impl TerminologyGateway for TerminologyClient {
    async fn search_concepts(
        &self,
        term: &str,
        vocabularies: Option<&[String]>,
        sort: SearchSort,
    ) -> GatewayResult<Vec<SearchHit>> {
        let mut base = format!(
            "{}/search/{}?string={}&pageSize={}&apiKey={}",
            self.config.umls_base_url,
            UMLS_VERSION,
            urlencoding::encode(term),
            SEARCH_PAGE_SIZE,
            self.config.api_key
        );
        if let Some(vocabularies) = vocabularies {
            if !vocabularies.is_empty() {
                base.push_str(&format!("&sabs={}", vocabularies.join(",")));
            }
        }

        let requests = (1..=SEARCH_MAX_PAGES).map(|page| {
            let url = format!("{base}&pageNumber={page}");
            async move { get_optional::<SearchEnvelope>(&self.http, &url).await }
        });
        let mut pages: Vec<Vec<SearchRow>> = Vec::new();
        for outcome in join_all(requests).await {
            pages.push(outcome?.map(|e| e.result.results).unwrap_or_default());
        }

        Ok(merge_search_pages(pages, sort))
    }

    async fn concept_with_atoms(
        &self,
        concept_id: &str,
        vocabularies: &[String],
    ) -> GatewayResult<(Concept, Vec<Atom>)> {
        let concept_url = self.content_url(&format!("CUI/{concept_id}"));
        // Suppressed and obsolete atoms included so the code set is complete.
        let atoms_url = format!(
            "{}&sabs={}&includeObsolete=true&includeSuppressible=true&pageSize={}",
            self.content_url(&format!("CUI/{concept_id}/atoms")),
            vocabularies.join(","),
            ATOM_PAGE_SIZE
        );

        let (concept_outcome, atoms_outcome) = join(
            get_optional::<ConceptEnvelope>(&self.http, &concept_url),
            self.fetch_atom_pages(&atoms_url),
        )
        .await;

        let concept = concept_outcome?
            .ok_or_else(|| GatewayError::Status {
                status: 404,
                message: format!("concept {concept_id} not found"),
            })?
            .result
            .into_concept();
        let atoms = atoms_outcome?
            .into_iter()
            .map(|row| row.into_atom())
            .filter(|atom| !atom.source_code.is_empty())
            .collect();

        Ok((concept, atoms))
    }

    async fn ancestors(&self, vocabulary: &str, code: &str) -> GatewayResult<Vec<HierarchyNode>> {
        self.fetch_cluster_pages(vocabulary, code, "ancestors").await
    }

    async fn descendants(
        &self,
        vocabulary: &str,
        code: &str,
    ) -> GatewayResult<Vec<HierarchyNode>> {
        // The drug vocabulary's related graph is cyclic; its "descendants"
        // are the flat related-concept listing.
        if vocabulary == vocab::RXNORM {
            return self.related_drug_concepts(code).await;
        }
        self.fetch_cluster_pages(vocabulary, code, "children").await
    }

    async fn immediate_descendant_count(
        &self,
        vocabulary: &str,
        code: &str,
    ) -> GatewayResult<usize> {
        Ok(self.descendants(vocabulary, code).await?.len())
    }

    async fn source_concept_id(
        &self,
        vocabulary: &str,
        code: &str,
    ) -> GatewayResult<Option<String>> {
        let url = self.content_url(&format!("source/{vocabulary}/{code}"));
        let source: Option<SourceEnvelope> = get_optional(&self.http, &url).await?;
        let Some(atoms_url) = source.and_then(|s| s.result.atoms) else {
            return Ok(None);
        };

        let atoms_url = with_query(&atoms_url, "apiKey", &self.config.api_key);
        let atoms: Option<AtomListEnvelope> = get_optional(&self.http, &atoms_url).await?;
        let Some(first) = atoms.map(|e| e.result).unwrap_or_default().into_iter().next() else {
            return Ok(None);
        };
        let Some(concept_url) = first.concept else {
            return Ok(None);
        };
        Ok(Some(extract_source_code(&concept_url).0))
    }

    async fn map_drug_to_product(
        &self,
        drug_code: &str,
        concept_id: Option<&str>,
    ) -> GatewayResult<Vec<ProductCode>> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut products: Vec<ProductCode> = Vec::new();
        let mut push = |code: String, name: Option<String>, origin: ProductCodeOrigin| {
            if seen.insert(normalize_ndc(&code)) {
                products.push(ProductCode { code, name, origin });
            }
        };

        // Each source is independent; one failing must not void the others.
        match self.rxnav.ndcs(drug_code).await {
            Ok(ndcs) => {
                for code in ndcs {
                    push(code, None, ProductCodeOrigin::DrugRelationService);
                }
            }
            Err(err) => warn!(drug_code, error = %err, "drug-relation product lookup failed"),
        }

        match self
            .fetch_attributes(&format!("source/{}/{}", vocab::RXNORM, drug_code))
            .await
        {
            Ok(attributes) => {
                for (name, value) in attributes {
                    if is_ndc_attribute(&name, &value) {
                        push(value, None, ProductCodeOrigin::SourceAttribute);
                    }
                }
            }
            Err(err) => warn!(drug_code, error = %err, "source attribute lookup failed"),
        }

        if let Some(concept_id) = concept_id {
            match self.fetch_attributes(&format!("CUI/{concept_id}")).await {
                Ok(attributes) => {
                    for (name, value) in attributes {
                        if is_ndc_attribute(&name, &value) {
                            push(value, None, ProductCodeOrigin::ConceptAttribute);
                        }
                    }
                }
                Err(err) => warn!(concept_id, error = %err, "concept attribute lookup failed"),
            }
        }

        Ok(products)
    }

    async fn related_drug_concepts(&self, code: &str) -> GatewayResult<Vec<HierarchyNode>> {
        let related = self.rxnav.related_concepts(code).await?;
        Ok(related
            .into_iter()
            .map(|p| HierarchyNode::new(vocab::RXNORM, p.rxcui, p.name))
            .collect())
    }
}

/// Merge paged search results: flatten in page order, drop the sentinel
/// "no results" marker, dedup by concept id (first occurrence wins) and
/// apply the requested ordering.
fn merge_search_pages(pages: Vec<Vec<SearchRow>>, sort: SearchSort) -> Vec<SearchHit> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut hits: Vec<SearchHit> = pages
        .into_iter()
        .flatten()
        .filter(|row| row.ui != NO_RESULTS_UI)
        .filter(|row| seen.insert(row.ui.clone()))
        .map(|row| SearchHit {
            concept_id: row.ui,
            name: row.name,
            root_source: row.root_source.unwrap_or_default(),
        })
        .collect();

    if sort == SearchSort::Alphabetical {
        hits.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    }
    hits
}

/// A page shorter than the requested size is the listing's last page.
fn last_page(count: usize, page_size: usize) -> bool {
    count < page_size
}

fn normalize_ndc(code: &str) -> String {
    code.replace('-', "")
}

/// NDC-shaped value heuristic: 10–11 digits ignoring dashes, or an
/// attribute explicitly named after the product-code system.
fn is_ndc_attribute(name: &str, value: &str) -> bool {
    name.to_uppercase().contains("NDC") || is_ndc_candidate(value)
}

fn is_ndc_candidate(value: &str) -> bool {
    let digits = normalize_ndc(value);
    (10..=11).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}
