//! Applicant, object and finance facts as read from the fact store.
//!
//! Every field is optional. A missing or `null` value reads as `false`, zero or empty so that
//! derivation stays total over partially completed forms.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationFacts {
    pub household: HouseholdFacts,
    pub object: ObjectFacts,
    pub finance: FinancePlanFacts,
    pub main_applicant: PersonFacts,
    pub additional_applicants: Vec<AdditionalApplicantFacts>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HouseholdFacts {
    #[serde(rename = "ispregnant")]
    pub is_pregnant: Option<bool>,
    pub is_married: Option<bool>,
    #[serde(alias = "hasauthorizedperson")]
    pub has_power_of_attorney: Option<bool>,
    /// Highest degree of disability (GdB) among household members.
    pub disability_grade: Option<u8>,
    /// Highest care level (Pflegegrad) among household members.
    pub care_level: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubsidyVariant {
    Neubau,
    Ersterwerb,
    Bestandserwerb,
    Nutzungsaenderung,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectFacts {
    pub subsidy_variant: Option<SubsidyVariant>,
    /// The plot is already owned by an applicant.
    pub owns_property: Option<bool>,
    pub has_erbbaurecht: Option<bool>,
    pub needs_building_permit: Option<bool>,
    pub in_mining_subsidence_zone: Option<bool>,
    pub has_barrier_free_loan: Option<bool>,
    pub has_wood_construction_loan: Option<bool>,
    pub has_cost_overrun_loan: Option<bool>,
    pub has_efficiency40_loan: Option<bool>,
    /// Pre-structured finance plan answer; only used when no loan list exists.
    pub has_supplementary_loan: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancePlanFacts {
    pub barrier_free_amount: Option<f64>,
    pub wood_construction_amount: Option<f64>,
    pub cost_overrun_amount: Option<f64>,
    pub efficiency40_amount: Option<f64>,
    pub loans: Option<Vec<FinanceLoan>>,
}

impl FinancePlanFacts {
    /// `None` when the structured loan list is absent or empty.
    pub fn structured_loans(&self) -> Option<&[FinanceLoan]> {
        self.loans.as_deref().filter(|loans| !loans.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinanceLoan {
    pub lender: Option<String>,
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonFacts {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub income: IncomeFacts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalApplicantFacts {
    pub uuid: Uuid,
    #[serde(flatten)]
    pub person: PersonFacts,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncomeFacts {
    pub has_salary: Option<bool>,
    pub has_rental_income: Option<bool>,
    pub has_pension: Option<bool>,
    pub has_unemployment_benefit: Option<bool>,
    pub claims_advertising_costs: Option<bool>,
    pub has_childcare_costs: Option<bool>,
    pub pays_maintenance: Option<bool>,
    pub receives_maintenance: Option<bool>,
    pub has_parental_benefit: Option<bool>,
    pub has_business_income: Option<bool>,
    pub has_agriculture_income: Option<bool>,
    /// Free-text "other income" entries typed by the applicant.
    pub other_income_types: Vec<String>,
}

pub(crate) fn flag(value: Option<bool>) -> bool {
    value.unwrap_or(false)
}

pub(crate) fn positive(value: Option<f64>) -> bool {
    value.is_some_and(|amount| amount.is_finite() && amount > 0.0)
}

pub(crate) fn grade(value: Option<u8>) -> bool {
    value.is_some_and(|grade| grade > 0)
}
