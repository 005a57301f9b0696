//! Projection of required, optional and uploaded state into upload positions.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::applicants::ApplicantDirectory;
use super::domain::{
    ApplicantKey, DocumentTypeId, OptionalSelections, RequiredDocumentSet, UploadedDocuments,
    UploadedFile,
};
use super::registry;
use super::requirements::sort_by_title;

/// Stable identity of an upload position: `{applicant}:{document}:{index}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(pub String);

impl SlotId {
    pub fn for_document(key: &ApplicantKey, document_type_id: &DocumentTypeId, index: usize) -> Self {
        Self(format!("{key}:{document_type_id}:{index}"))
    }

    pub fn placeholder(key: &ApplicantKey) -> Self {
        Self(format!("{key}:placeholder"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a slot is shown. Only used for presentation grouping and scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotClassification {
    Required,
    Optional,
    /// Keeps an applicant without any documents visible.
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub slot_id: SlotId,
    pub applicant_key: ApplicantKey,
    pub document_type_id: Option<DocumentTypeId>,
    pub classification: SlotClassification,
    pub is_main_slot: bool,
    pub file: Option<UploadedFile>,
}

impl Slot {
    pub fn is_empty(&self) -> bool {
        self.file.is_none()
    }
}

/// Materialise every slot, grouped by applicant in directory order.
///
/// Required documents keep their derived order and come first; optional documents follow in
/// title order. Buckets the directory no longer lists (a removed applicant, or facts that
/// could not be read) still show their documents after the known ones.
pub fn materialize(
    directory: &ApplicantDirectory,
    required: &RequiredDocumentSet,
    optional: &OptionalSelections,
    uploaded: &UploadedDocuments,
) -> Vec<Slot> {
    let mut slots = Vec::new();

    for key in bucket_keys(directory, required, optional, uploaded) {
        let required_documents = required.for_key(&key);
        let mut optional_documents: Vec<DocumentTypeId> = optional
            .for_key(&key)
            .iter()
            .filter(|document| !required_documents.contains(document))
            .cloned()
            .collect();
        sort_by_title(&mut optional_documents);
        optional_documents.dedup();

        let before = slots.len();
        for document in required_documents {
            push_document_slots(&mut slots, key, document, SlotClassification::Required, uploaded);
        }
        for document in &optional_documents {
            push_document_slots(&mut slots, key, document, SlotClassification::Optional, uploaded);
        }

        if slots.len() == before
            && matches!(key, ApplicantKey::Additional(uuid) if directory.contains(&uuid))
        {
            slots.push(Slot {
                slot_id: SlotId::placeholder(&key),
                applicant_key: key,
                document_type_id: None,
                classification: SlotClassification::Placeholder,
                is_main_slot: true,
                file: None,
            });
        }
    }

    slots
}

/// Directory keys first, then any other key that carries documents, in key order.
fn bucket_keys(
    directory: &ApplicantDirectory,
    required: &RequiredDocumentSet,
    optional: &OptionalSelections,
    uploaded: &UploadedDocuments,
) -> Vec<ApplicantKey> {
    let mut keys = directory.keys();
    let mut unlisted: Vec<ApplicantKey> = required
        .entries()
        .filter(|(_, documents)| !documents.is_empty())
        .map(|(key, _)| key)
        .chain(optional.0.keys().copied())
        .chain(uploaded.0.keys().copied())
        .filter(|key| !keys.contains(key))
        .collect();
    unlisted.sort();
    unlisted.dedup();
    keys.extend(unlisted);
    keys
}

fn push_document_slots(
    slots: &mut Vec<Slot>,
    key: ApplicantKey,
    document: &DocumentTypeId,
    classification: SlotClassification,
    uploaded: &UploadedDocuments,
) {
    let mut files = uploaded.files(&key, document).to_vec();
    // Stable sort: files sharing a timestamp keep their stored order.
    files.sort_by_key(|file| file.uploaded_at);

    let slot = |index: usize, file: Option<UploadedFile>| Slot {
        slot_id: SlotId::for_document(&key, document, index),
        applicant_key: key,
        document_type_id: Some(document.clone()),
        classification,
        is_main_slot: index == 0,
        file,
    };

    if !registry::is_repeatable(document) {
        // Single-file kinds show exactly one slot holding the oldest file.
        slots.push(slot(0, files.into_iter().next()));
        return;
    }

    if files.is_empty() {
        slots.push(slot(0, None));
        return;
    }

    let count = files.len();
    for (index, file) in files.into_iter().enumerate() {
        slots.push(slot(index, Some(file)));
    }
    slots.push(slot(count, None));
}

/// First empty slot for a document, which is where the next upload lands.
pub fn next_free_slot<'a>(
    slots: &'a [Slot],
    key: &ApplicantKey,
    document_type_id: &DocumentTypeId,
) -> Option<&'a Slot> {
    slots.iter().find(|slot| {
        slot.applicant_key == *key
            && slot.document_type_id.as_ref() == Some(document_type_id)
            && slot.is_empty()
    })
}
