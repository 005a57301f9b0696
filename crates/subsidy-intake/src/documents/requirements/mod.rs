//! Derivation of the documents each applicant must submit.
//!
//! Derivation is a pure function of the facts: no I/O, no clock, no randomness. Missing
//! facts behave as `false`, every rule contributes independently, and each list is
//! de-duplicated and ordered by German display title.

mod collation;
pub mod income;
mod rules;

use std::collections::BTreeMap;

use super::domain::{DocumentTypeId, RequiredDocumentSet};
use super::facts::ApplicationFacts;
use super::registry;

pub use collation::{compare_titles, sort_key};
pub use income::{IncomeVariant, DEFAULT_INCOME_VARIANTS};

pub fn derive_requirements(facts: &ApplicationFacts) -> RequiredDocumentSet {
    derive_requirements_with(facts, DEFAULT_INCOME_VARIANTS)
}

pub fn derive_requirements_with(
    facts: &ApplicationFacts,
    income_variants: &[IncomeVariant],
) -> RequiredDocumentSet {
    let general = finalize(rules::general_documents(facts));
    let main = finalize(rules::person_documents(
        &facts.main_applicant.income,
        income_variants,
    ));

    // Repeated UUIDs keep the first entry, matching the applicant directory.
    let mut per_applicant = BTreeMap::new();
    for applicant in &facts.additional_applicants {
        if per_applicant.contains_key(&applicant.uuid) {
            continue;
        }
        per_applicant.insert(
            applicant.uuid,
            finalize(rules::person_documents(
                &applicant.person.income,
                income_variants,
            )),
        );
    }

    RequiredDocumentSet {
        general,
        main,
        per_applicant,
    }
}

/// De-duplicate, then order by localized title with the id as tie-breaker.
fn finalize<'a>(documents: impl Iterator<Item = &'a str>) -> Vec<DocumentTypeId> {
    let mut ids: Vec<DocumentTypeId> = Vec::new();
    for document in documents {
        let id = DocumentTypeId::from(document);
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    sort_by_title(&mut ids);
    ids
}

pub fn sort_by_title(ids: &mut [DocumentTypeId]) {
    ids.sort_by_cached_key(|id| (sort_key(registry::title_of(id)), id.clone()));
}
