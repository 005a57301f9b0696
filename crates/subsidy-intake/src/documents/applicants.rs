use serde::Serialize;
use uuid::Uuid;

use super::domain::ApplicantKey;
use super::facts::{AdditionalApplicantFacts, ApplicationFacts};

/// One additional applicant as listed on the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdditionalApplicant {
    pub uuid: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Ordered set of additional applicants keyed by UUID.
///
/// Display numbers (2, 3, ...) follow insertion order and are computed on read; they are
/// never used to address documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplicantDirectory {
    main_name: Option<String>,
    additional: Vec<AdditionalApplicant>,
}

/// Presentation data for one document bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicantView {
    pub key: ApplicantKey,
    pub number: Option<u16>,
    pub display_name: String,
}

impl ApplicantDirectory {
    pub fn from_facts(facts: &ApplicationFacts) -> Self {
        let main_name = full_name(
            facts.main_applicant.first_name.as_deref(),
            facts.main_applicant.last_name.as_deref(),
        );
        let mut directory = Self {
            main_name,
            additional: Vec::with_capacity(facts.additional_applicants.len()),
        };
        for applicant in &facts.additional_applicants {
            directory.push(applicant);
        }
        directory
    }

    /// Duplicated UUIDs keep their first position.
    fn push(&mut self, applicant: &AdditionalApplicantFacts) {
        if self.contains(&applicant.uuid) {
            return;
        }
        self.additional.push(AdditionalApplicant {
            uuid: applicant.uuid,
            first_name: applicant.person.first_name.clone(),
            last_name: applicant.person.last_name.clone(),
        });
    }

    pub fn contains(&self, uuid: &Uuid) -> bool {
        self.additional.iter().any(|applicant| &applicant.uuid == uuid)
    }

    pub fn additional(&self) -> &[AdditionalApplicant] {
        &self.additional
    }

    pub fn number_of(&self, uuid: &Uuid) -> Option<u16> {
        self.additional
            .iter()
            .position(|applicant| &applicant.uuid == uuid)
            .map(|index| index as u16 + 2)
    }

    /// `general`, `hauptantragsteller`, then every additional applicant in insertion order.
    pub fn keys(&self) -> Vec<ApplicantKey> {
        let mut keys = vec![ApplicantKey::General, ApplicantKey::Main];
        keys.extend(
            self.additional
                .iter()
                .map(|applicant| ApplicantKey::Additional(applicant.uuid)),
        );
        keys
    }

    /// Whether the key addresses a bucket that exists for this application.
    pub fn knows(&self, key: &ApplicantKey) -> bool {
        match key {
            ApplicantKey::General | ApplicantKey::Main => true,
            ApplicantKey::Additional(uuid) => self.contains(uuid),
        }
    }

    pub fn display_name(&self, key: &ApplicantKey) -> String {
        match key {
            ApplicantKey::General => "Allgemeine Dokumente".to_string(),
            ApplicantKey::Main => self
                .main_name
                .clone()
                .unwrap_or_else(|| "Hauptantragsteller".to_string()),
            ApplicantKey::Additional(uuid) => {
                let named = self
                    .additional
                    .iter()
                    .find(|applicant| &applicant.uuid == uuid)
                    .and_then(|applicant| {
                        full_name(applicant.first_name.as_deref(), applicant.last_name.as_deref())
                    });
                match (named, self.number_of(uuid)) {
                    (Some(name), _) => name,
                    (None, Some(number)) => format!("Person {number}"),
                    (None, None) => "Unbekannte Person".to_string(),
                }
            }
        }
    }

    pub fn views(&self) -> Vec<ApplicantView> {
        self.keys().into_iter().map(|key| self.view(key)).collect()
    }

    /// Keys outside the directory get no number and a fallback name.
    pub fn view(&self, key: ApplicantKey) -> ApplicantView {
        ApplicantView {
            number: match key {
                ApplicantKey::General => None,
                ApplicantKey::Main => Some(1),
                ApplicantKey::Additional(uuid) => self.number_of(&uuid),
            },
            display_name: self.display_name(&key),
            key,
        }
    }
}

fn full_name(first: Option<&str>, last: Option<&str>) -> Option<String> {
    let parts: Vec<&str> = [first, last]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}
