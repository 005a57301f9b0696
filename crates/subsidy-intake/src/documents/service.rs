use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::domain::{ApplicantKey, DocumentTypeId, OptionalSelections, UploadedDocuments, UserId};
use super::facts::ApplicationFacts;
use super::registry::{self, DocumentTypeDescriptor};
use super::scoring::{FormProgress, ProgressWriter};
use super::slots::{next_free_slot, SlotId};
use super::store::{DocumentStores, StoreError};
use super::upload::{
    SlotUploadState, UploadError, UploadErrorList, UploadPipeline, UploadRequest, UploadTicket,
};
use super::workspace::{DocumentWorkspace, WorkspaceView};
use crate::config::{ProgressConfig, UploadConfig};

const SESSION_IDLE: Duration = Duration::from_secs(30 * 60);

/// Everything the document page shows for one user.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentOverview {
    pub user_id: UserId,
    #[serde(flatten)]
    pub workspace: WorkspaceView,
    pub uploads: Vec<SlotUploadState>,
    pub errors: UploadErrorList,
}

/// Service composing the document stores, the per-session upload pipelines and the
/// debounced progress writer.
pub struct DocumentService {
    stores: DocumentStores,
    upload: UploadConfig,
    writer: ProgressWriter,
    sessions: Mutex<HashMap<UserId, Arc<DocumentSession>>>,
    session_idle: Duration,
}

struct DocumentSession {
    state: tokio::sync::Mutex<SessionState>,
    pipeline: UploadPipeline,
    last_used: Mutex<Instant>,
}

impl DocumentSession {
    /// Nothing in flight and untouched for at least `idle`.
    fn is_stale(&self, idle: Duration, now: Instant) -> bool {
        let last_used = *self
            .last_used
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        now.duration_since(last_used) >= idle && self.pipeline.is_idle()
    }
}

#[derive(Default)]
struct SessionState {
    workspace: DocumentWorkspace,
    loaded: bool,
}

/// Inputs read from the stores for one rebuild. `degraded` is set when any store failed.
struct Inputs {
    facts: Option<ApplicationFacts>,
    optional: OptionalSelections,
    uploaded: UploadedDocuments,
    forms: FormProgress,
    degraded: bool,
}

impl DocumentService {
    pub fn new(stores: DocumentStores, upload: UploadConfig, progress: ProgressConfig) -> Self {
        let writer = ProgressWriter::new(Arc::clone(&stores.progress), progress);
        Self {
            stores,
            upload,
            writer,
            sessions: Mutex::new(HashMap::new()),
            session_idle: SESSION_IDLE,
        }
    }

    /// How long an untouched session with no uploads in flight is kept in memory.
    pub fn with_session_idle(mut self, idle: Duration) -> Self {
        self.session_idle = idle;
        self
    }

    pub fn session_count(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn catalogue(&self) -> &'static [DocumentTypeDescriptor] {
        registry::all()
    }

    pub fn upload_limit(&self) -> u64 {
        self.upload.max_file_bytes
    }

    /// The user's upload pipeline, e.g. to follow progress events.
    pub fn pipeline(&self, user_id: &UserId) -> UploadPipeline {
        self.session(user_id).pipeline.clone()
    }

    pub fn progress_writer(&self) -> &ProgressWriter {
        &self.writer
    }

    /// Reload every input and rebuild the workspace. Store failures degrade instead of
    /// failing the page.
    pub async fn load(&self, user_id: &UserId) -> DocumentOverview {
        let session = self.session(user_id);
        let mut state = session.state.lock().await;
        self.rebuild(user_id, &mut state).await;
        self.overview(user_id, &session, &state)
    }

    /// Upload a file into the next free slot and wait until it settles.
    pub async fn upload(
        &self,
        user_id: &UserId,
        applicant_key: ApplicantKey,
        document_type_id: DocumentTypeId,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<DocumentOverview, DocumentServiceError> {
        let ticket = self
            .submit_upload(user_id, applicant_key, document_type_id, file_name, bytes)
            .await?;
        ticket.wait().await?;
        Ok(self.load(user_id).await)
    }

    /// Validate and hand an upload to the pipeline without waiting for it. The workspace is
    /// not refreshed when the ticket resolves; [`DocumentService::upload`] does that.
    pub(crate) async fn submit_upload(
        &self,
        user_id: &UserId,
        applicant_key: ApplicantKey,
        document_type_id: DocumentTypeId,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadTicket, DocumentServiceError> {
        if file_name.trim().is_empty() || file_name.contains(['/', '\\']) {
            return Err(DocumentServiceError::InvalidFileName(file_name.to_string()));
        }

        let session = self.session(user_id);
        let state = self.current(user_id, &session).await;
        let workspace = &state.workspace;

        if !workspace.directory().knows(&applicant_key) {
            return Err(DocumentServiceError::UnknownApplicant(applicant_key));
        }
        if registry::descriptor(document_type_id.as_str()).is_none() {
            return Err(DocumentServiceError::UnknownDocument(document_type_id));
        }
        if workspace
            .uploaded()
            .files(&applicant_key, &document_type_id)
            .iter()
            .any(|file| file.file_name == file_name)
        {
            return Err(DocumentServiceError::DuplicateFileName(file_name.to_string()));
        }

        let slot = next_free_slot(workspace.slots(), &applicant_key, &document_type_id).ok_or_else(
            || DocumentServiceError::SlotUnavailable {
                applicant_key,
                document_type_id: document_type_id.clone(),
            },
        )?;

        let request = UploadRequest {
            slot_id: slot.slot_id.clone(),
            applicant_key,
            document_type_id,
            file_name: file_name.to_string(),
            bytes,
        };
        drop(state);

        Ok(session.pipeline.submit(request)?)
    }

    pub async fn remove(
        &self,
        user_id: &UserId,
        applicant_key: ApplicantKey,
        document_type_id: &DocumentTypeId,
        file_name: &str,
        uploaded_at: DateTime<Utc>,
    ) -> Result<DocumentOverview, DocumentServiceError> {
        let session = self.session(user_id);
        session
            .pipeline
            .remove(applicant_key, document_type_id, file_name, uploaded_at)
            .await?;
        Ok(self.load(user_id).await)
    }

    /// Opt into a catalogue document beyond the derived requirement.
    pub async fn select_optional(
        &self,
        user_id: &UserId,
        applicant_key: ApplicantKey,
        document_type_id: DocumentTypeId,
    ) -> Result<DocumentOverview, DocumentServiceError> {
        let session = self.session(user_id);
        let mut state = self.current(user_id, &session).await;
        let workspace = &state.workspace;

        if !workspace.directory().knows(&applicant_key) {
            return Err(DocumentServiceError::UnknownApplicant(applicant_key));
        }
        let descriptor = registry::descriptor(document_type_id.as_str())
            .ok_or_else(|| DocumentServiceError::UnknownDocument(document_type_id.clone()))?;
        if !descriptor.category.fits(&applicant_key) {
            return Err(DocumentServiceError::CategoryMismatch {
                applicant_key,
                document_type_id,
            });
        }
        if workspace.requirements().contains(&applicant_key, &document_type_id) {
            return Err(DocumentServiceError::AlreadyRequired(document_type_id));
        }

        let mut latest = self.latest_optional(user_id).await?;
        if latest.insert(applicant_key, document_type_id.clone()) {
            self.stores.optional.write(user_id, &latest).await?;
            info!(
                user_id = %user_id,
                applicant_key = %applicant_key,
                document_type_id = %document_type_id,
                "optional document selected"
            );
        }

        self.rebuild(user_id, &mut state).await;
        Ok(self.overview(user_id, &session, &state))
    }

    /// Drop an optional document. Documents that still hold files stay selected.
    pub async fn deselect_optional(
        &self,
        user_id: &UserId,
        applicant_key: ApplicantKey,
        document_type_id: DocumentTypeId,
    ) -> Result<DocumentOverview, DocumentServiceError> {
        let session = self.session(user_id);
        let mut state = self.current(user_id, &session).await;
        let workspace = &state.workspace;

        // Leftover selections of departed applicants can still be cleared.
        if !workspace.directory().knows(&applicant_key)
            && !workspace.optional().0.contains_key(&applicant_key)
        {
            return Err(DocumentServiceError::UnknownApplicant(applicant_key));
        }
        if workspace.uploaded().has_files(&applicant_key, &document_type_id) {
            return Err(DocumentServiceError::FilesRemain(document_type_id));
        }

        let mut latest = self.latest_optional(user_id).await?;
        if latest.remove(&applicant_key, &document_type_id) {
            self.stores.optional.write(user_id, &latest).await?;
        }

        self.rebuild(user_id, &mut state).await;
        Ok(self.overview(user_id, &session, &state))
    }

    pub fn dismiss_error(&self, user_id: &UserId, slot_id: &SlotId) -> bool {
        self.session(user_id).pipeline.dismiss_error(slot_id)
    }

    fn session(&self, user_id: &UserId) -> Arc<DocumentSession> {
        let now = Instant::now();
        let mut sessions = self
            .sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let before = sessions.len();
        // Sessions still borrowed by a running call are kept.
        sessions.retain(|id, session| {
            id == user_id
                || Arc::strong_count(session) > 1
                || !session.is_stale(self.session_idle, now)
        });
        if sessions.len() < before {
            debug!(evicted = before - sessions.len(), "evicted idle document sessions");
        }

        let session = sessions.entry(user_id.clone()).or_insert_with(|| {
            Arc::new(DocumentSession {
                state: tokio::sync::Mutex::new(SessionState::default()),
                pipeline: UploadPipeline::new(
                    user_id.clone(),
                    Arc::clone(&self.stores.documents),
                    Arc::clone(&self.stores.blobs),
                    self.upload.clone(),
                ),
                last_used: Mutex::new(now),
            })
        });
        *session
            .last_used
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = now;
        Arc::clone(session)
    }

    /// Lock the session state, building it on first use.
    async fn current<'a>(
        &self,
        user_id: &UserId,
        session: &'a DocumentSession,
    ) -> tokio::sync::MutexGuard<'a, SessionState> {
        let mut state = session.state.lock().await;
        if !state.loaded {
            self.rebuild(user_id, &mut state).await;
        }
        state
    }

    async fn rebuild(&self, user_id: &UserId, state: &mut SessionState) {
        let inputs = self.gather(user_id).await;
        let (workspace, reconciliation) = DocumentWorkspace::load(
            inputs.facts,
            inputs.optional,
            inputs.uploaded,
            inputs.forms,
        );

        if reconciliation.changed {
            if inputs.degraded {
                warn!(user_id = %user_id, "inputs degraded, not writing corrected selections");
            } else {
                match self.stores.optional.write(user_id, &reconciliation.optional).await {
                    Ok(()) => info!(
                        user_id = %user_id,
                        promoted = reconciliation.promoted,
                        grandfathered = reconciliation.grandfathered,
                        "optional selections reconciled"
                    ),
                    Err(err) => warn!(
                        user_id = %user_id,
                        error = %err,
                        "could not persist reconciled selections"
                    ),
                }
            }
        }

        if inputs.degraded {
            warn!(user_id = %user_id, "inputs degraded, keeping the stored progress score");
        } else {
            self.writer.schedule(user_id, workspace.progress());
        }
        state.workspace = workspace;
        state.loaded = true;
    }

    async fn gather(&self, user_id: &UserId) -> Inputs {
        let mut degraded = false;

        let facts = match self.stores.facts.facts(user_id).await {
            Ok(facts) => Some(facts),
            Err(StoreError::NotFound) => Some(ApplicationFacts::default()),
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "fact store unavailable, no documents derived");
                degraded = true;
                None
            }
        };

        let optional = match self.stores.optional.fetch(user_id).await {
            Ok(optional) => optional,
            Err(StoreError::NotFound) => OptionalSelections::default(),
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "optional selections unavailable");
                degraded = true;
                OptionalSelections::default()
            }
        };

        let uploaded = match self.stores.documents.fetch(user_id).await {
            Ok(uploaded) => uploaded,
            Err(StoreError::NotFound) => UploadedDocuments::default(),
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "uploaded documents unavailable");
                degraded = true;
                UploadedDocuments::default()
            }
        };

        let forms = match self.stores.progress.load(user_id).await {
            Ok(snapshot) => {
                if let Some(score) = snapshot.score {
                    self.writer.seed(user_id, score);
                }
                snapshot.forms
            }
            Err(StoreError::NotFound) => FormProgress::default(),
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "form progress unavailable");
                degraded = true;
                FormProgress::default()
            }
        };

        Inputs {
            facts,
            optional,
            uploaded,
            forms,
            degraded,
        }
    }

    async fn latest_optional(&self, user_id: &UserId) -> Result<OptionalSelections, StoreError> {
        match self.stores.optional.fetch(user_id).await {
            Err(StoreError::NotFound) => Ok(OptionalSelections::default()),
            other => other,
        }
    }

    fn overview(
        &self,
        user_id: &UserId,
        session: &DocumentSession,
        state: &SessionState,
    ) -> DocumentOverview {
        DocumentOverview {
            user_id: user_id.clone(),
            workspace: state.workspace.view(),
            uploads: session.pipeline.uploads(),
            errors: session.pipeline.errors(),
        }
    }
}

/// Error raised by the document service.
#[derive(Debug, thiserror::Error)]
pub enum DocumentServiceError {
    #[error("applicant '{0}' is not part of this application")]
    UnknownApplicant(ApplicantKey),
    #[error("unknown document type '{0}'")]
    UnknownDocument(DocumentTypeId),
    #[error("document '{document_type_id}' cannot be assigned to '{applicant_key}'")]
    CategoryMismatch {
        applicant_key: ApplicantKey,
        document_type_id: DocumentTypeId,
    },
    #[error("document '{0}' is already required")]
    AlreadyRequired(DocumentTypeId),
    #[error("document '{0}' still has uploaded files")]
    FilesRemain(DocumentTypeId),
    #[error("'{applicant_key}' has no open slot for document '{document_type_id}'")]
    SlotUnavailable {
        applicant_key: ApplicantKey,
        document_type_id: DocumentTypeId,
    },
    #[error("a file named '{0}' already exists for this document")]
    DuplicateFileName(String),
    #[error("invalid file name '{0}'")]
    InvalidFileName(String),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
