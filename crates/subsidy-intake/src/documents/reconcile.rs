//! Keeps the derived requirement, the user's optional picks and existing uploads consistent.

use serde::Serialize;

use super::domain::{OptionalSelections, RequiredDocumentSet, UploadedDocuments};

/// Result of a reconciliation pass. Callers continue with `optional`, never with their input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub optional: OptionalSelections,
    pub changed: bool,
    pub promoted: usize,
    pub grandfathered: usize,
}

/// Apply promotion and grandfathering. Pure and idempotent.
///
/// Promotion drops optional picks that the requirement now covers. Grandfathering adds an
/// optional entry for every document that still has files but is neither required nor
/// optional, so uploaded evidence never disappears from view. Duplicate picks collapse.
pub fn reconcile(
    required: &RequiredDocumentSet,
    optional: &OptionalSelections,
    uploaded: &UploadedDocuments,
) -> Reconciliation {
    let mut corrected = optional.clone();
    let mut promoted = 0;
    let mut grandfathered = 0;
    let mut deduplicated = false;

    for (key, documents) in corrected.0.iter_mut() {
        let before = documents.len();
        let mut seen = Vec::with_capacity(before);
        documents.retain(|document| {
            if seen.contains(document) {
                return false;
            }
            seen.push(document.clone());
            true
        });
        deduplicated |= documents.len() != before;

        let before = documents.len();
        documents.retain(|document| !required.contains(key, document));
        promoted += before - documents.len();
    }

    for (key, document) in uploaded.populated() {
        if required.contains(key, document) || corrected.contains(key, document) {
            continue;
        }
        corrected.insert(*key, document.clone());
        grandfathered += 1;
    }

    let changed = deduplicated || promoted > 0 || grandfathered > 0;
    Reconciliation {
        optional: corrected,
        changed,
        promoted,
        grandfathered,
    }
}
