use std::sync::atomic::Ordering;
use std::time::Duration;

use uuid::Uuid;

use super::common::*;
use crate::documents::domain::{ApplicantKey, DocumentTypeId, UploadedDocuments};
use crate::documents::facts::{ApplicationFacts, IncomeFacts};
use crate::documents::registry::{
    LOHN_GEHALTSBESCHEINIGUNGEN, MARRIAGE_CERT, MELDEBESCHEINIGUNG, RENTENBESCHEID,
};
use crate::documents::scoring::{FormProgress, ProgressSnapshot};
use crate::documents::service::{DocumentOverview, DocumentServiceError};
use crate::documents::slots::{Slot, SlotClassification};
use crate::documents::upload::UploadError;

fn salaried() -> ApplicationFacts {
    let mut facts = ApplicationFacts::default();
    facts.main_applicant.income = IncomeFacts {
        has_salary: Some(true),
        ..IncomeFacts::default()
    };
    facts
}

fn slots_for<'a>(overview: &'a DocumentOverview, key: ApplicantKey, document: &str) -> Vec<&'a Slot> {
    let document = DocumentTypeId::from(document);
    overview
        .workspace
        .slots
        .iter()
        .filter(|slot| slot.applicant_key == key && slot.document_type_id.as_ref() == Some(&document))
        .collect()
}

fn marriage_on_file() -> UploadedDocuments {
    let mut uploaded = UploadedDocuments::default();
    uploaded.append(
        ApplicantKey::General,
        stored_file(ApplicantKey::General, MARRIAGE_CERT, "heirat.pdf", at(4, 10)),
    );
    uploaded
}

#[tokio::test]
async fn load_grandfathers_uploads_and_persists_the_correction() {
    let harness = Harness::new();
    harness.documents.set(&user(), marriage_on_file());
    let service = harness.service();

    let overview = service.load(&user()).await;

    assert!(harness
        .optional
        .get(&user())
        .contains(&ApplicantKey::General, &MARRIAGE_CERT.into()));
    assert_eq!(harness.optional.writes.load(Ordering::SeqCst), 1);
    let marriage = slots_for(&overview, ApplicantKey::General, MARRIAGE_CERT);
    assert_eq!(marriage.len(), 1);
    assert_eq!(marriage[0].classification, SlotClassification::Optional);
    assert!(marriage[0].file.is_some());

    // A second load finds nothing left to correct.
    service.load(&user()).await;
    assert_eq!(harness.optional.writes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unavailable_facts_degrade_to_no_requirements_without_writing() {
    let harness = Harness::new();
    harness.facts.unavailable.store(true, Ordering::SeqCst);
    harness.documents.set(&user(), marriage_on_file());
    let service = harness.service();

    let overview = service.load(&user()).await;

    assert!(overview.workspace.requirements.is_empty());
    assert!(overview
        .workspace
        .slots
        .iter()
        .all(|slot| slot.classification != SlotClassification::Required));
    assert_eq!(harness.optional.writes.load(Ordering::SeqCst), 0);
    // The upload stays visible even though nothing could be derived.
    assert_eq!(slots_for(&overview, ApplicantKey::General, MARRIAGE_CERT).len(), 1);
}

#[tokio::test]
async fn upload_fills_the_main_slot_and_opens_another() {
    let harness = Harness::new();
    harness.facts.set(&user(), salaried());
    let service = harness.service();

    let overview = service
        .upload(
            &user(),
            ApplicantKey::Main,
            LOHN_GEHALTSBESCHEINIGUNGEN.into(),
            "januar.pdf",
            vec![1; 256],
        )
        .await
        .expect("upload succeeds");

    let lohn = slots_for(&overview, ApplicantKey::Main, LOHN_GEHALTSBESCHEINIGUNGEN);
    assert_eq!(lohn.len(), 2);
    assert!(lohn[0].is_main_slot);
    assert_eq!(
        lohn[0].file.as_ref().map(|file| file.file_name.as_str()),
        Some("januar.pdf")
    );
    assert!(lohn[1].is_empty());
    assert_eq!(
        harness.blobs.paths(),
        vec![format!(
            "{}/hauptantragsteller/{LOHN_GEHALTSBESCHEINIGUNGEN}/januar.pdf",
            user()
        )]
    );
    assert!(overview.errors.is_empty());
}

#[tokio::test]
async fn upload_rejects_bad_targets_before_touching_storage() {
    let harness = Harness::new();
    harness.facts.set(&user(), salaried());
    let service = harness.service();
    let lohn = DocumentTypeId::from(LOHN_GEHALTSBESCHEINIGUNGEN);

    let invalid = service
        .submit_upload(&user(), ApplicantKey::Main, lohn.clone(), "a/b.pdf", vec![1])
        .await;
    assert!(matches!(invalid, Err(DocumentServiceError::InvalidFileName(_))));

    let stranger = service
        .submit_upload(
            &user(),
            ApplicantKey::Additional(Uuid::new_v4()),
            lohn.clone(),
            "a.pdf",
            vec![1],
        )
        .await;
    assert!(matches!(stranger, Err(DocumentServiceError::UnknownApplicant(_))));

    let unknown = service
        .submit_upload(&user(), ApplicantKey::Main, "reisepass".into(), "a.pdf", vec![1])
        .await;
    assert!(matches!(unknown, Err(DocumentServiceError::UnknownDocument(_))));

    let not_shown = service
        .submit_upload(&user(), ApplicantKey::Main, RENTENBESCHEID.into(), "a.pdf", vec![1])
        .await;
    assert!(matches!(not_shown, Err(DocumentServiceError::SlotUnavailable { .. })));

    assert!(harness.blobs.paths().is_empty());
}

#[tokio::test]
async fn duplicate_file_names_are_rejected_per_document() {
    let harness = Harness::new();
    harness.facts.set(&user(), salaried());
    let service = harness.service();

    service
        .upload(&user(), ApplicantKey::Main, LOHN_GEHALTSBESCHEINIGUNGEN.into(), "scan.pdf", vec![1])
        .await
        .expect("first upload");
    let second = service
        .upload(&user(), ApplicantKey::Main, LOHN_GEHALTSBESCHEINIGUNGEN.into(), "scan.pdf", vec![2])
        .await;

    assert!(matches!(second, Err(DocumentServiceError::DuplicateFileName(name)) if name == "scan.pdf"));
    service
        .upload(&user(), ApplicantKey::General, MELDEBESCHEINIGUNG.into(), "scan.pdf", vec![3])
        .await
        .expect("same name under another document");
}

#[tokio::test]
async fn oversized_upload_is_reported_on_the_overview() {
    let harness = Harness::new();
    let mut upload = fast_upload_config();
    upload.max_file_bytes = 16;
    let service = harness.service_with(upload);

    let result = service
        .upload(&user(), ApplicantKey::General, MELDEBESCHEINIGUNG.into(), "big.pdf", vec![0; 17])
        .await;

    assert!(matches!(
        result,
        Err(DocumentServiceError::Upload(UploadError::FileTooLarge { size: 17, limit: 16, .. }))
    ));
    let overview = service.load(&user()).await;
    assert_eq!(overview.errors.entries().len(), 1);
    assert_eq!(overview.errors.entries()[0].file_name, "big.pdf");
}

#[tokio::test]
async fn optional_selection_rules() {
    let harness = Harness::new();
    let service = harness.service();

    let required = service
        .select_optional(&user(), ApplicantKey::General, MELDEBESCHEINIGUNG.into())
        .await;
    assert!(matches!(required, Err(DocumentServiceError::AlreadyRequired(_))));

    let mismatch = service
        .select_optional(&user(), ApplicantKey::General, LOHN_GEHALTSBESCHEINIGUNGEN.into())
        .await;
    assert!(matches!(mismatch, Err(DocumentServiceError::CategoryMismatch { .. })));

    let unknown = service
        .select_optional(&user(), ApplicantKey::General, "reisepass".into())
        .await;
    assert!(matches!(unknown, Err(DocumentServiceError::UnknownDocument(_))));

    let stranger = service
        .select_optional(&user(), ApplicantKey::Additional(Uuid::new_v4()), MARRIAGE_CERT.into())
        .await;
    assert!(matches!(stranger, Err(DocumentServiceError::UnknownApplicant(_))));

    let overview = service
        .select_optional(&user(), ApplicantKey::General, MARRIAGE_CERT.into())
        .await
        .expect("selected");
    assert!(overview
        .workspace
        .optional
        .contains(&ApplicantKey::General, &MARRIAGE_CERT.into()));
    assert_eq!(
        slots_for(&overview, ApplicantKey::General, MARRIAGE_CERT)[0].classification,
        SlotClassification::Optional
    );
    assert!(harness
        .optional
        .get(&user())
        .contains(&ApplicantKey::General, &MARRIAGE_CERT.into()));

    let overview = service
        .deselect_optional(&user(), ApplicantKey::General, MARRIAGE_CERT.into())
        .await
        .expect("deselected");
    assert!(slots_for(&overview, ApplicantKey::General, MARRIAGE_CERT).is_empty());
    assert!(harness.optional.get(&user()).0.values().all(Vec::is_empty));
}

#[tokio::test]
async fn optional_documents_with_files_cannot_be_deselected() {
    let harness = Harness::new();
    let service = harness.service();

    service
        .select_optional(&user(), ApplicantKey::General, MARRIAGE_CERT.into())
        .await
        .expect("selected");
    service
        .upload(&user(), ApplicantKey::General, MARRIAGE_CERT.into(), "heirat.pdf", vec![1])
        .await
        .expect("uploaded");

    let result = service
        .deselect_optional(&user(), ApplicantKey::General, MARRIAGE_CERT.into())
        .await;

    assert!(matches!(result, Err(DocumentServiceError::FilesRemain(_))));
}

#[tokio::test]
async fn removing_a_file_refreshes_the_overview() {
    let harness = Harness::new();
    let service = harness.service();
    let overview = service
        .upload(&user(), ApplicantKey::General, MELDEBESCHEINIGUNG.into(), "melde.pdf", vec![1])
        .await
        .expect("uploaded");
    let uploaded_at = slots_for(&overview, ApplicantKey::General, MELDEBESCHEINIGUNG)[0]
        .file
        .as_ref()
        .map(|file| file.uploaded_at)
        .expect("file on slot");

    let overview = service
        .remove(
            &user(),
            ApplicantKey::General,
            &MELDEBESCHEINIGUNG.into(),
            "melde.pdf",
            uploaded_at,
        )
        .await
        .expect("removed");

    let melde = slots_for(&overview, ApplicantKey::General, MELDEBESCHEINIGUNG);
    assert_eq!(melde.len(), 1);
    assert!(melde[0].is_empty());
    assert!(harness.blobs.paths().is_empty());
    assert_eq!(overview.workspace.progress, 0);
}

#[tokio::test]
async fn progress_is_persisted_after_the_debounce() {
    let harness = Harness::new();
    harness.progress.set(
        &user(),
        ProgressSnapshot {
            score: Some(0),
            forms: FormProgress::default(),
        },
    );
    let service = harness.service();

    let overview = service
        .upload(&user(), ApplicantKey::General, MELDEBESCHEINIGUNG.into(), "melde.pdf", vec![1])
        .await
        .expect("uploaded");
    assert_eq!(overview.workspace.progress, 15);

    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(harness.progress.saved(), vec![15]);
    assert_eq!(service.progress_writer().last_persisted(&user()), Some(15));
}

fn partner_payslip(partner: Uuid) -> UploadedDocuments {
    let key = ApplicantKey::Additional(partner);
    let mut uploaded = UploadedDocuments::default();
    uploaded.append(key, stored_file(key, LOHN_GEHALTSBESCHEINIGUNGEN, "lohn.pdf", at(3, 9)));
    uploaded
}

#[tokio::test]
async fn additional_applicant_uploads_stay_visible_without_facts() {
    let harness = Harness::new();
    let partner = Uuid::new_v4();
    harness.facts.unavailable.store(true, Ordering::SeqCst);
    harness.documents.set(&user(), partner_payslip(partner));
    let service = harness.service();

    let overview = service.load(&user()).await;

    let key = ApplicantKey::Additional(partner);
    let payslips = slots_for(&overview, key, LOHN_GEHALTSBESCHEINIGUNGEN);
    assert_eq!(payslips.len(), 2);
    assert_eq!(payslips[0].classification, SlotClassification::Optional);
    assert!(payslips[0].file.is_some());
    let view = overview
        .workspace
        .applicants
        .iter()
        .find(|view| view.key == key)
        .expect("bucket listed");
    assert_eq!(view.display_name, "Unbekannte Person");
    assert_eq!(harness.optional.writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn departed_applicant_files_can_be_seen_and_cleared() {
    let harness = Harness::new();
    let departed = Uuid::new_v4();
    harness.facts.set(&user(), salaried());
    harness.documents.set(&user(), partner_payslip(departed));
    let service = harness.service();
    let key = ApplicantKey::Additional(departed);

    let overview = service.load(&user()).await;

    assert!(harness
        .optional
        .get(&user())
        .contains(&key, &LOHN_GEHALTSBESCHEINIGUNGEN.into()));
    let payslips = slots_for(&overview, key, LOHN_GEHALTSBESCHEINIGUNGEN);
    assert_eq!(
        payslips[0].file.as_ref().map(|file| file.file_name.as_str()),
        Some("lohn.pdf")
    );
    // Departed buckets come after everyone the application still lists.
    let last_listed = overview
        .workspace
        .slots
        .iter()
        .rposition(|slot| slot.applicant_key != key)
        .expect("listed slots");
    let first_departed = overview
        .workspace
        .slots
        .iter()
        .position(|slot| slot.applicant_key == key)
        .expect("departed slots");
    assert!(last_listed < first_departed);

    let overview = service
        .remove(&user(), key, &LOHN_GEHALTSBESCHEINIGUNGEN.into(), "lohn.pdf", at(3, 9))
        .await
        .expect("removed");
    assert!(slots_for(&overview, key, LOHN_GEHALTSBESCHEINIGUNGEN)[0].is_empty());

    let overview = service
        .deselect_optional(&user(), key, LOHN_GEHALTSBESCHEINIGUNGEN.into())
        .await
        .expect("leftover selection cleared");
    assert!(overview.workspace.slots.iter().all(|slot| slot.applicant_key != key));
    assert!(overview.workspace.applicants.iter().all(|view| view.key != key));
}

fn complete_forms(score: u8) -> ProgressSnapshot {
    ProgressSnapshot {
        score: Some(score),
        forms: FormProgress {
            hauptantrag: 100,
            einkommenserklaerung: 100,
            selbstauskunft: 100,
            haushaltsauskunft: 100,
            wofiv: 100,
            din277: 100,
            selbsthilfe: 100,
        },
    }
}

#[tokio::test]
async fn degraded_loads_never_overwrite_the_stored_score() {
    let harness = Harness::new();
    harness.progress.set(&user(), complete_forms(95));
    harness.facts.unavailable.store(true, Ordering::SeqCst);
    harness.documents.fail_fetches.store(true, Ordering::SeqCst);
    let service = harness.service();

    let overview = service.load(&user()).await;
    assert_eq!(overview.workspace.progress, 70);

    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(harness.progress.saved().is_empty());
    assert_eq!(service.progress_writer().last_persisted(&user()), Some(95));
}

#[tokio::test]
async fn unreadable_form_progress_skips_the_score_write() {
    let harness = Harness::new();
    harness.progress.unavailable.store(true, Ordering::SeqCst);
    let service = harness.service();

    service
        .upload(&user(), ApplicantKey::General, MELDEBESCHEINIGUNG.into(), "melde.pdf", vec![1])
        .await
        .expect("uploaded");
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(harness.progress.saved().is_empty());
}

#[tokio::test(start_paused = true)]
async fn idle_sessions_are_evicted() {
    let harness = Harness::new();
    let service = harness.service().with_session_idle(Duration::from_secs(60));
    let other = crate::documents::domain::UserId("user-8".to_string());

    service.load(&user()).await;
    service.load(&other).await;
    assert_eq!(service.session_count(), 2);

    tokio::time::advance(Duration::from_secs(30)).await;
    service.load(&other).await;
    assert_eq!(service.session_count(), 2);

    tokio::time::advance(Duration::from_secs(45)).await;
    service.load(&other).await;
    assert_eq!(service.session_count(), 1);

    // An evicted user simply starts a fresh session.
    let overview = service.load(&user()).await;
    assert_eq!(overview.user_id, user());
    assert_eq!(service.session_count(), 2);
}
