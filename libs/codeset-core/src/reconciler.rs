//! Source-code → unifying-concept reconciliation.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::error::Result;
use crate::gateway::TerminologyGateway;
use crate::progress::{report, CancelToken, ProgressFn};

static CONCEPT_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^C\d+$").expect("concept id regex is valid"));

/// Whether a string has the expected concept-id shape (`C` + digits).
pub fn is_concept_id(candidate: &str) -> bool {
    CONCEPT_ID_RE.is_match(candidate)
}

/// Resolve one `(vocabulary, code)` pair to its concept id.
///
/// Identifiers that do not match the concept-id shape are discarded silently
/// as noise. Gateway failures propagate; batch callers decide whether to
/// skip.
pub async fn resolve_one(
    gateway: &dyn TerminologyGateway,
    vocabulary: &str,
    code: &str,
) -> Result<Option<String>> {
    let resolved = gateway.source_concept_id(vocabulary, code).await?;
    Ok(resolved.filter(|id| is_concept_id(id)))
}

/// Resolve a batch of `(vocabulary, code)` pairs to a de-duplicated,
/// insertion-ordered list of concept ids.
///
/// Pairs are resolved one at a time to bound request concurrency against the
/// terminology service. Per-pair failures are logged and skipped; partial
/// reconciliation only means fewer target-vocabulary codes for that branch.
pub async fn resolve_concept_ids(
    gateway: &dyn TerminologyGateway,
    pairs: &[(String, String)],
    progress: Option<&ProgressFn>,
    cancel: &CancelToken,
) -> Result<Vec<String>> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut concept_ids: Vec<String> = Vec::new();

    for (index, (vocabulary, code)) in pairs.iter().enumerate() {
        cancel.check()?;
        report(progress, "resolving concepts", index + 1, pairs.len());

        match resolve_one(gateway, vocabulary, code).await {
            Ok(Some(concept_id)) => {
                if seen.insert(concept_id.clone()) {
                    concept_ids.push(concept_id);
                }
            }
            Ok(None) => {}
            Err(err) => {
                warn!(vocabulary, code = %code, error = %err, "skipping unresolvable code");
            }
        }
    }

    Ok(concept_ids)
}
