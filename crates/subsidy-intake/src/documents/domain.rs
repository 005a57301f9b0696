use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of the account whose application documents are tracked.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable key of a catalogue document kind (e.g. `meldebescheinigung`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentTypeId(pub String);

impl DocumentTypeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DocumentTypeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for DocumentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Owner of a document bucket.
///
/// Serialised as the literal persistence keys `general`, `hauptantragsteller`
/// and `applicant_{uuid}`. Additional applicants are addressed by UUID so that
/// removing one person never shifts documents onto another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ApplicantKey {
    General,
    Main,
    Additional(Uuid),
}

const GENERAL_KEY: &str = "general";
const MAIN_KEY: &str = "hauptantragsteller";
const ADDITIONAL_PREFIX: &str = "applicant_";

impl ApplicantKey {
    pub fn applicant_type(&self) -> ApplicantType {
        match self {
            ApplicantKey::General => ApplicantType::General,
            ApplicantKey::Main => ApplicantType::Hauptantragsteller,
            ApplicantKey::Additional(_) => ApplicantType::Applicant,
        }
    }

    pub fn uuid(&self) -> Option<Uuid> {
        match self {
            ApplicantKey::Additional(uuid) => Some(*uuid),
            _ => None,
        }
    }

    pub fn is_person(&self) -> bool {
        !matches!(self, ApplicantKey::General)
    }
}

impl fmt::Display for ApplicantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicantKey::General => f.write_str(GENERAL_KEY),
            ApplicantKey::Main => f.write_str(MAIN_KEY),
            ApplicantKey::Additional(uuid) => write!(f, "{ADDITIONAL_PREFIX}{uuid}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown applicant key '{0}'")]
pub struct InvalidApplicantKey(pub String);

impl FromStr for ApplicantKey {
    type Err = InvalidApplicantKey;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            GENERAL_KEY => Ok(ApplicantKey::General),
            MAIN_KEY => Ok(ApplicantKey::Main),
            other => other
                .strip_prefix(ADDITIONAL_PREFIX)
                .and_then(|uuid| Uuid::parse_str(uuid).ok())
                .map(ApplicantKey::Additional)
                .ok_or_else(|| InvalidApplicantKey(raw.to_string())),
        }
    }
}

impl TryFrom<String> for ApplicantKey {
    type Error = InvalidApplicantKey;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ApplicantKey> for String {
    fn from(value: ApplicantKey) -> Self {
        value.to_string()
    }
}

/// Coarse owner kind recorded on each uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicantType {
    General,
    Hauptantragsteller,
    Applicant,
}

/// Metadata of one stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub file_name: String,
    pub storage_path: String,
    pub uploaded_at: DateTime<Utc>,
    pub document_type_id: DocumentTypeId,
    pub applicant_type: ApplicantType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicant_uuid: Option<Uuid>,
}

impl UploadedFile {
    /// Files are identified by name plus upload timestamp, never by list position.
    pub fn matches(&self, file_name: &str, uploaded_at: DateTime<Utc>) -> bool {
        self.file_name == file_name && self.uploaded_at == uploaded_at
    }
}

/// Blob path `{user}/{applicant_key}/{document_type}/{file_name}`.
pub fn storage_path(
    user_id: &UserId,
    key: &ApplicantKey,
    document_type_id: &DocumentTypeId,
    file_name: &str,
) -> String {
    format!("{user_id}/{key}/{document_type_id}/{file_name}")
}

/// Documents derived as mandatory from the current facts. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredDocumentSet {
    pub general: Vec<DocumentTypeId>,
    pub main: Vec<DocumentTypeId>,
    pub per_applicant: BTreeMap<Uuid, Vec<DocumentTypeId>>,
}

impl RequiredDocumentSet {
    pub fn for_key(&self, key: &ApplicantKey) -> &[DocumentTypeId] {
        match key {
            ApplicantKey::General => &self.general,
            ApplicantKey::Main => &self.main,
            ApplicantKey::Additional(uuid) => self
                .per_applicant
                .get(uuid)
                .map(Vec::as_slice)
                .unwrap_or(&[]),
        }
    }

    pub fn contains(&self, key: &ApplicantKey, document_type_id: &DocumentTypeId) -> bool {
        self.for_key(key).contains(document_type_id)
    }

    pub fn entries(&self) -> impl Iterator<Item = (ApplicantKey, &[DocumentTypeId])> {
        [
            (ApplicantKey::General, self.general.as_slice()),
            (ApplicantKey::Main, self.main.as_slice()),
        ]
        .into_iter()
        .chain(
            self.per_applicant
                .iter()
                .map(|(uuid, docs)| (ApplicantKey::Additional(*uuid), docs.as_slice())),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.entries().all(|(_, docs)| docs.is_empty())
    }
}

/// Documents a user opted into beyond the derived requirement, per applicant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionalSelections(pub BTreeMap<ApplicantKey, Vec<DocumentTypeId>>);

impl OptionalSelections {
    pub fn for_key(&self, key: &ApplicantKey) -> &[DocumentTypeId] {
        self.0.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, key: &ApplicantKey, document_type_id: &DocumentTypeId) -> bool {
        self.for_key(key).contains(document_type_id)
    }

    /// Returns `false` when the document was already selected.
    pub fn insert(&mut self, key: ApplicantKey, document_type_id: DocumentTypeId) -> bool {
        let entry = self.0.entry(key).or_default();
        if entry.contains(&document_type_id) {
            return false;
        }
        entry.push(document_type_id);
        true
    }

    pub fn remove(&mut self, key: &ApplicantKey, document_type_id: &DocumentTypeId) -> bool {
        match self.0.get_mut(key) {
            Some(entry) => {
                let before = entry.len();
                entry.retain(|id| id != document_type_id);
                entry.len() != before
            }
            None => false,
        }
    }
}

/// Persisted upload records grouped by applicant, then document type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadedDocuments(pub BTreeMap<ApplicantKey, BTreeMap<DocumentTypeId, Vec<UploadedFile>>>);

impl UploadedDocuments {
    pub fn files(&self, key: &ApplicantKey, document_type_id: &DocumentTypeId) -> &[UploadedFile] {
        self.0
            .get(key)
            .and_then(|documents| documents.get(document_type_id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_files(&self, key: &ApplicantKey, document_type_id: &DocumentTypeId) -> bool {
        !self.files(key, document_type_id).is_empty()
    }

    pub fn append(&mut self, key: ApplicantKey, file: UploadedFile) {
        self.0
            .entry(key)
            .or_default()
            .entry(file.document_type_id.clone())
            .or_default()
            .push(file);
    }

    /// Remove the entry matching `file_name` and `uploaded_at`, returning it when found.
    pub fn remove(
        &mut self,
        key: &ApplicantKey,
        document_type_id: &DocumentTypeId,
        file_name: &str,
        uploaded_at: DateTime<Utc>,
    ) -> Option<UploadedFile> {
        let files = self.0.get_mut(key)?.get_mut(document_type_id)?;
        let position = files
            .iter()
            .position(|file| file.matches(file_name, uploaded_at))?;
        Some(files.remove(position))
    }

    /// Iterate over every `(applicant, document type)` pair that holds at least one file.
    pub fn populated(&self) -> impl Iterator<Item = (&ApplicantKey, &DocumentTypeId)> {
        self.0.iter().flat_map(|(key, documents)| {
            documents
                .iter()
                .filter(|(_, files)| !files.is_empty())
                .map(move |(document_type_id, _)| (key, document_type_id))
        })
    }
}
