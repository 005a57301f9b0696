use crate::documents::facts::{
    flag, grade, positive, ApplicationFacts, IncomeFacts, SubsidyVariant,
};
use crate::documents::registry::*;

use super::income::{self, IncomeVariant};

/// A single independent predicate contributing at most one document.
pub(crate) struct Rule<T: 'static> {
    pub document: &'static str,
    pub applies: fn(&T) -> bool,
}

#[rustfmt::skip]
pub(crate) const GENERAL_RULES: &[Rule<ApplicationFacts>] = &[
    Rule { document: MELDEBESCHEINIGUNG, applies: always },
    Rule { document: EIGENKAPITAL_NACHWEIS, applies: always },
    Rule { document: MARRIAGE_CERT, applies: married },
    Rule { document: PREGNANCY_CERT, applies: pregnant },
    Rule { document: VOLLMACHT_CERT, applies: represented },
    Rule { document: DISABILITY_CERT, applies: disabled_member },
    Rule { document: PFLEGEGRAD_NACHWEIS, applies: member_in_care },
    Rule { document: BAUZEICHNUNG, applies: builds_or_converts },
    Rule { document: LAGEPLAN, applies: builds_new },
    Rule { document: BERECHNUNG_WOHNFLAECHE, applies: has_object },
    Rule { document: KAUFVERTRAG, applies: purchases },
    Rule { document: BAUGENEHMIGUNG_VORBESCHEID, applies: needs_permit },
    Rule { document: GRUNDBUCHBLATTKOPIE, applies: owns_plot },
    Rule { document: ERBBAURECHTSVERTRAG, applies: leasehold },
    Rule { document: BERGSENKUNGSGEBIET_ERKLAERUNG, applies: mining_zone },
    Rule { document: EFFIZIENZHAUS40_NACHWEIS, applies: efficiency40_loan },
    Rule { document: BARRIEREFREI_NACHWEIS, applies: barrier_free_loan },
    Rule { document: HOLZBAU_NACHWEIS, applies: wood_construction_loan },
    Rule { document: STANDORTBEDINGTE_MEHRKOSTEN, applies: cost_overrun_loan },
    Rule { document: DARLEHENSZUSAGE, applies: needs_loan_confirmation },
];

#[rustfmt::skip]
pub(crate) const INCOME_RULES: &[Rule<IncomeFacts>] = &[
    Rule { document: LOHN_GEHALTSBESCHEINIGUNGEN, applies: salaried },
    Rule { document: EINKOMMENSSTEUERBESCHEID, applies: rents_out },
    Rule { document: EINKOMMENSSTEUERBESCHEID, applies: self_employed },
    Rule { document: GUV_EUER_NACHWEIS, applies: self_employed },
    Rule { document: RENTENBESCHEID, applies: retired },
    Rule { document: ARBEITSLOSENGELDBESCHEID, applies: unemployed },
    Rule { document: WERBUNGSKOSTEN_NACHWEIS, applies: deducts_advertising_costs },
    Rule { document: KINDERBETREUUNGSKOSTEN_NACHWEIS, applies: pays_childcare },
    Rule { document: UNTERHALTSVERPFLICHTUNG_NACHWEIS, applies: pays_maintenance },
    Rule { document: UNTERHALTSLEISTUNGEN_NACHWEIS, applies: receives_maintenance },
    Rule { document: ELTERNGELD_NACHWEIS, applies: parental_benefit },
];

fn always(_: &ApplicationFacts) -> bool {
    true
}

fn married(facts: &ApplicationFacts) -> bool {
    flag(facts.household.is_married)
}

fn pregnant(facts: &ApplicationFacts) -> bool {
    flag(facts.household.is_pregnant)
}

fn represented(facts: &ApplicationFacts) -> bool {
    flag(facts.household.has_power_of_attorney)
}

fn disabled_member(facts: &ApplicationFacts) -> bool {
    grade(facts.household.disability_grade)
}

fn member_in_care(facts: &ApplicationFacts) -> bool {
    grade(facts.household.care_level)
}

fn variant_is(facts: &ApplicationFacts, variants: &[SubsidyVariant]) -> bool {
    facts
        .object
        .subsidy_variant
        .is_some_and(|variant| variants.contains(&variant))
}

fn builds_or_converts(facts: &ApplicationFacts) -> bool {
    variant_is(facts, &[SubsidyVariant::Neubau, SubsidyVariant::Nutzungsaenderung])
}

fn builds_new(facts: &ApplicationFacts) -> bool {
    variant_is(facts, &[SubsidyVariant::Neubau])
}

fn has_object(facts: &ApplicationFacts) -> bool {
    facts.object.subsidy_variant.is_some()
}

fn purchases(facts: &ApplicationFacts) -> bool {
    variant_is(facts, &[SubsidyVariant::Ersterwerb, SubsidyVariant::Bestandserwerb])
}

fn needs_permit(facts: &ApplicationFacts) -> bool {
    flag(facts.object.needs_building_permit)
}

fn owns_plot(facts: &ApplicationFacts) -> bool {
    flag(facts.object.owns_property)
}

fn leasehold(facts: &ApplicationFacts) -> bool {
    flag(facts.object.has_erbbaurecht)
}

fn mining_zone(facts: &ApplicationFacts) -> bool {
    flag(facts.object.in_mining_subsidence_zone)
}

// Loan documents need both the yes/no answer and a positive amount in the finance plan.

fn efficiency40_loan(facts: &ApplicationFacts) -> bool {
    flag(facts.object.has_efficiency40_loan) && positive(facts.finance.efficiency40_amount)
}

fn barrier_free_loan(facts: &ApplicationFacts) -> bool {
    flag(facts.object.has_barrier_free_loan) && positive(facts.finance.barrier_free_amount)
}

fn wood_construction_loan(facts: &ApplicationFacts) -> bool {
    flag(facts.object.has_wood_construction_loan)
        && positive(facts.finance.wood_construction_amount)
}

fn cost_overrun_loan(facts: &ApplicationFacts) -> bool {
    flag(facts.object.has_cost_overrun_loan) && positive(facts.finance.cost_overrun_amount)
}

/// The structured loan list decides when present; the legacy yes/no answer only stands in
/// for a missing or empty list.
fn needs_loan_confirmation(facts: &ApplicationFacts) -> bool {
    match facts.finance.structured_loans() {
        Some(loans) => loans.iter().any(|loan| positive(loan.amount)),
        None => flag(facts.object.has_supplementary_loan),
    }
}

fn salaried(income: &IncomeFacts) -> bool {
    flag(income.has_salary)
}

fn rents_out(income: &IncomeFacts) -> bool {
    flag(income.has_rental_income)
}

fn self_employed(income: &IncomeFacts) -> bool {
    flag(income.has_business_income) || flag(income.has_agriculture_income)
}

fn retired(income: &IncomeFacts) -> bool {
    flag(income.has_pension)
}

fn unemployed(income: &IncomeFacts) -> bool {
    flag(income.has_unemployment_benefit)
}

fn deducts_advertising_costs(income: &IncomeFacts) -> bool {
    flag(income.claims_advertising_costs)
}

fn pays_childcare(income: &IncomeFacts) -> bool {
    flag(income.has_childcare_costs)
}

fn pays_maintenance(income: &IncomeFacts) -> bool {
    flag(income.pays_maintenance)
}

fn receives_maintenance(income: &IncomeFacts) -> bool {
    flag(income.receives_maintenance)
}

fn parental_benefit(income: &IncomeFacts) -> bool {
    flag(income.has_parental_benefit)
}

pub(crate) fn general_documents(
    facts: &ApplicationFacts,
) -> impl Iterator<Item = &'static str> + '_ {
    GENERAL_RULES
        .iter()
        .filter(move |rule| (rule.applies)(facts))
        .map(|rule| rule.document)
}

pub(crate) fn person_documents<'a>(
    income: &'a IncomeFacts,
    variants: &'a [IncomeVariant],
) -> impl Iterator<Item = &'static str> + 'a {
    INCOME_RULES
        .iter()
        .filter(move |rule| (rule.applies)(income))
        .map(|rule| rule.document)
        .chain(income::detect(&income.other_income_types, variants))
}
