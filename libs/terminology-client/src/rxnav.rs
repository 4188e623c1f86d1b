//! Client for the drug-relation service (RxNav-style API).

use codeset_core::GatewayResult;
use reqwest::Client;

use crate::http::get_optional;
use crate::wire::{ConceptProperty, NdcEnvelope, RelatedEnvelope};

/// Clinically relevant relation term types: ingredients, clinical and
/// branded drugs, and their component forms. Packs (BPCK/GPCK) and
/// dose-form groups (DF/DFG) are deliberately excluded.
pub const RELATED_TTY_WHITELIST: &[&str] = &["IN", "MIN", "PIN", "SCD", "SBD", "SCDC", "SBDC"];

#[derive(Clone)]
pub struct RxNavClient {
    http: Client,
    base_url: String,
}

impl RxNavClient {
    pub fn new(http: Client, base_url: String) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Related drug concepts restricted to the term-type whitelist.
    pub async fn related_concepts(&self, rxcui: &str) -> GatewayResult<Vec<ConceptProperty>> {
        let url = format!(
            "{}/rxcui/{}/related.json?tty={}",
            self.base_url,
            rxcui,
            RELATED_TTY_WHITELIST.join("+")
        );
        let envelope: Option<RelatedEnvelope> = get_optional(&self.http, &url).await?;
        Ok(envelope
            .map(filter_related)
            .unwrap_or_default())
    }

    /// Product codes for a drug concept.
    pub async fn ndcs(&self, rxcui: &str) -> GatewayResult<Vec<String>> {
        let url = format!("{}/rxcui/{}/ndcs.json", self.base_url, rxcui);
        let envelope: Option<NdcEnvelope> = get_optional(&self.http, &url).await?;
        Ok(envelope
            .and_then(|e| e.ndc_group)
            .and_then(|g| g.ndc_list)
            .map(|l| l.ndc)
            .unwrap_or_default())
    }
}

/// Flatten a related-concepts payload, keeping only whitelisted term types.
/// The service echoes the requested types back, but responses have been seen
/// to include extra groups; filtering here keeps the contract tight.
fn filter_related(envelope: RelatedEnvelope) -> Vec<ConceptProperty> {
    let Some(group) = envelope.related_group else {
        return Vec::new();
    };
    group
        .concept_group
        .into_iter()
        .filter(|g| {
            g.tty
                .as_deref()
                .map(|tty| RELATED_TTY_WHITELIST.contains(&tty))
                .unwrap_or(false)
        })
        .flat_map(|g| g.concept_properties)
        .collect()
}
