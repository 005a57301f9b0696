use uuid::Uuid;

use super::common::pregnant_facts;
use crate::documents::domain::{ApplicantKey, DocumentTypeId};
use crate::documents::facts::{
    AdditionalApplicantFacts, ApplicationFacts, FinanceLoan, IncomeFacts, PersonFacts,
    SubsidyVariant,
};
use crate::documents::registry::*;
use crate::documents::requirements::{derive_requirements, derive_requirements_with, IncomeVariant};

fn ids(raw: &[&str]) -> Vec<DocumentTypeId> {
    raw.iter().map(|id| DocumentTypeId::from(*id)).collect()
}

fn with_main_income(income: IncomeFacts) -> ApplicationFacts {
    ApplicationFacts {
        main_applicant: PersonFacts {
            income,
            ..PersonFacts::default()
        },
        ..ApplicationFacts::default()
    }
}

fn additional(uuid: Uuid, income: IncomeFacts) -> AdditionalApplicantFacts {
    AdditionalApplicantFacts {
        uuid,
        person: PersonFacts {
            income,
            ..PersonFacts::default()
        },
    }
}

#[test]
fn pregnant_unmarried_household_needs_pregnancy_but_not_marriage_proof() {
    let required = derive_requirements(&pregnant_facts());

    assert_eq!(
        required.general,
        ids(&[MELDEBESCHEINIGUNG, EIGENKAPITAL_NACHWEIS, PREGNANCY_CERT])
    );
    assert!(!required.contains(&ApplicantKey::General, &MARRIAGE_CERT.into()));
    assert!(required.main.is_empty());
    assert!(required.per_applicant.is_empty());
}

#[test]
fn derivation_is_deterministic() {
    let mut facts = pregnant_facts();
    facts.object.subsidy_variant = Some(SubsidyVariant::Neubau);
    facts.main_applicant.income.has_salary = Some(true);
    facts.main_applicant.income.has_pension = Some(true);

    let first = derive_requirements(&facts);
    for _ in 0..10 {
        assert_eq!(derive_requirements(&facts), first);
    }
}

#[test]
fn shared_documents_are_listed_once_and_sorted_by_title() {
    let required = derive_requirements(&with_main_income(IncomeFacts {
        has_rental_income: Some(true),
        has_business_income: Some(true),
        has_salary: Some(true),
        ..IncomeFacts::default()
    }));

    assert_eq!(
        required.main,
        ids(&[
            EINKOMMENSSTEUERBESCHEID,
            GUV_EUER_NACHWEIS,
            LOHN_GEHALTSBESCHEINIGUNGEN,
        ])
    );
}

#[test]
fn loan_documents_need_a_positive_amount() {
    let mut facts = ApplicationFacts::default();
    facts.object.has_barrier_free_loan = Some(true);
    let barrier_free = DocumentTypeId::from(BARRIEREFREI_NACHWEIS);

    assert!(!derive_requirements(&facts).contains(&ApplicantKey::General, &barrier_free));

    facts.finance.barrier_free_amount = Some(0.0);
    assert!(!derive_requirements(&facts).contains(&ApplicantKey::General, &barrier_free));

    facts.finance.barrier_free_amount = Some(25_000.0);
    assert!(derive_requirements(&facts).contains(&ApplicantKey::General, &barrier_free));

    facts.object.has_barrier_free_loan = Some(false);
    assert!(!derive_requirements(&facts).contains(&ApplicantKey::General, &barrier_free));
}

#[test]
fn loan_confirmation_falls_back_to_the_legacy_answer_only_without_a_loan_list() {
    let confirmation = DocumentTypeId::from(DARLEHENSZUSAGE);
    let mut facts = ApplicationFacts::default();
    facts.object.has_supplementary_loan = Some(true);

    facts.finance.loans = Some(Vec::new());
    assert!(derive_requirements(&facts).contains(&ApplicantKey::General, &confirmation));

    facts.finance.loans = Some(vec![FinanceLoan {
        lender: Some("Sparkasse".to_string()),
        amount: Some(0.0),
    }]);
    assert!(!derive_requirements(&facts).contains(&ApplicantKey::General, &confirmation));

    facts.object.has_supplementary_loan = Some(false);
    facts.finance.loans = Some(vec![FinanceLoan {
        lender: None,
        amount: Some(40_000.0),
    }]);
    assert!(derive_requirements(&facts).contains(&ApplicantKey::General, &confirmation));
}

#[test]
fn free_text_sick_pay_requires_proof() {
    let required = derive_requirements(&with_main_income(IncomeFacts {
        other_income_types: vec!["Kranken-Geld (AOK)".to_string()],
        ..IncomeFacts::default()
    }));

    assert_eq!(required.main, ids(&[KRANKENGELD_NACHWEIS]));
}

#[test]
fn income_variants_can_be_replaced() {
    const TIPS: &[IncomeVariant] = &[IncomeVariant {
        document_type_id: WERBUNGSKOSTEN_NACHWEIS,
        spellings: &["trinkgeld"],
    }];
    let facts = with_main_income(IncomeFacts {
        other_income_types: vec!["Trinkgeld".to_string(), "Krankengeld".to_string()],
        ..IncomeFacts::default()
    });

    let required = derive_requirements_with(&facts, TIPS);

    assert_eq!(required.main, ids(&[WERBUNGSKOSTEN_NACHWEIS]));
}

#[test]
fn additional_applicants_are_keyed_by_uuid() {
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    let salaried = IncomeFacts {
        has_salary: Some(true),
        ..IncomeFacts::default()
    };
    let retired = IncomeFacts {
        has_pension: Some(true),
        ..IncomeFacts::default()
    };
    let mut facts = ApplicationFacts {
        additional_applicants: vec![
            additional(first, salaried),
            additional(second, retired),
        ],
        ..ApplicationFacts::default()
    };

    let required = derive_requirements(&facts);
    assert_eq!(
        required.for_key(&ApplicantKey::Additional(first)),
        ids(&[LOHN_GEHALTSBESCHEINIGUNGEN]).as_slice()
    );
    assert_eq!(
        required.for_key(&ApplicantKey::Additional(second)),
        ids(&[RENTENBESCHEID]).as_slice()
    );

    // Removing the first person leaves the second one's documents where they were.
    facts.additional_applicants.remove(0);
    let required = derive_requirements(&facts);
    assert!(required.for_key(&ApplicantKey::Additional(first)).is_empty());
    assert_eq!(
        required.for_key(&ApplicantKey::Additional(second)),
        ids(&[RENTENBESCHEID]).as_slice()
    );
}
