//! Document requirement and upload reconciliation engine.
//!
//! Facts flow through requirement derivation, reconciliation against optional picks and
//! stored uploads, and slot materialisation. The upload pipeline mutates the stored uploads
//! and every change re-runs the projections and the progress score.

pub mod applicants;
pub mod domain;
pub mod facts;
pub mod reconcile;
pub mod registry;
pub mod requirements;
pub mod router;
pub mod scoring;
pub mod service;
pub mod slots;
pub mod store;
pub mod upload;
pub mod workspace;

#[cfg(test)]
mod tests;

pub use applicants::{AdditionalApplicant, ApplicantDirectory, ApplicantView};
pub use domain::{
    storage_path, ApplicantKey, ApplicantType, DocumentTypeId, InvalidApplicantKey,
    OptionalSelections, RequiredDocumentSet, UploadedDocuments, UploadedFile, UserId,
};
pub use facts::ApplicationFacts;
pub use reconcile::{reconcile, Reconciliation};
pub use registry::{DocumentCategory, DocumentTypeDescriptor};
pub use requirements::{derive_requirements, derive_requirements_with};
pub use router::document_router;
pub use scoring::{score, FormProgress, ProgressSnapshot, ProgressWriter};
pub use service::{DocumentOverview, DocumentService, DocumentServiceError};
pub use slots::{materialize, Slot, SlotClassification, SlotId};
pub use store::{
    BlobError, BlobStore, DocumentStatusStore, DocumentStores, FactStore, OptionalSelectionStore,
    ProgressStore, StoreError,
};
pub use upload::{UploadError, UploadEvent, UploadPhase, UploadPipeline, UploadTicket};
pub use workspace::{DocumentWorkspace, WorkspaceEvent, WorkspaceView};
