//! Descendant-hierarchy traversal.
//!
//! Two traversal modes, chosen by vocabulary:
//!
//! - **Flat** for RXNORM: the related-concept graph links clinical and
//!   branded forms in both directions, so recursing would loop forever.
//!   One gateway call, no recursion.
//! - **Recursive** for every other hierarchical vocabulary: an explicit
//!   stack-driven depth-first loop with a visited set. Depth is unbounded;
//!   the visited set prevents revisiting but does not cap total size, so
//!   callers own any count- or wall-clock-based abort policy.

use std::collections::HashSet;

use tracing::warn;

use crate::domain::vocab;
use crate::error::Result;
use crate::gateway::TerminologyGateway;
use crate::model::{extract_source_code, HierarchyNode};
use crate::progress::{report, CancelToken, ProgressFn};

/// Walk all descendants of `root_code` within one vocabulary.
///
/// The root itself is not included in the result. Siblings are emitted
/// depth-first, left-to-right as the gateway returns them; no further
/// ordering is guaranteed. Per-node fetch failures are logged and skipped.
pub async fn walk_descendants(
    gateway: &dyn TerminologyGateway,
    vocabulary: &str,
    root_code: &str,
    progress: Option<&ProgressFn>,
    cancel: &CancelToken,
) -> Result<Vec<HierarchyNode>> {
    if vocabulary == vocab::RXNORM {
        cancel.check()?;
        let related = gateway.related_drug_concepts(root_code).await?;
        report(progress, "walking drug relations", related.len(), 0);
        return Ok(related);
    }

    // Codes already emitted or queued; a code enters exactly once.
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(root_code.to_string());
    let mut found: Vec<HierarchyNode> = Vec::new();
    // LIFO stack of codes still to expand.
    let mut pending: Vec<String> = vec![root_code.to_string()];

    while let Some(code) = pending.pop() {
        cancel.check()?;

        let children = match gateway.descendants(vocabulary, &code).await {
            Ok(children) => children,
            Err(err) => {
                warn!(vocabulary, code = %code, error = %err, "skipping unfetchable node");
                continue;
            }
        };

        let mut discovered: Vec<String> = Vec::new();
        for child in children {
            let (child_code, _) = extract_source_code(&child.code);
            if child_code.is_empty() || !visited.insert(child_code.clone()) {
                continue;
            }
            found.push(HierarchyNode::new(
                vocabulary,
                child_code.clone(),
                child.term,
            ));
            discovered.push(child_code);
        }
        if !discovered.is_empty() {
            report(progress, "walking hierarchy", visited.len(), 0);
        }
        // Children pushed in reverse so they pop left-to-right.
        for child_code in discovered.into_iter().rev() {
            pending.push(child_code);
        }
    }

    Ok(found)
}
