use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, info_span, warn, Instrument};

use super::errors::{UploadErrorEntry, UploadErrorList};
use super::limiter::{Admission, UploadLimiter};
use super::progress::SimulatedProgress;
use crate::config::UploadConfig;
use crate::documents::domain::{
    storage_path, ApplicantKey, DocumentTypeId, UploadedDocuments, UploadedFile, UserId,
};
use crate::documents::slots::SlotId;
use crate::documents::store::{BlobError, BlobStore, DocumentStatusStore, StoreError};

const MIN_PROGRESS_TICK: Duration = Duration::from_millis(1);
const EVENT_CAPACITY: usize = 256;

/// Lifecycle of one slot's upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadPhase {
    #[default]
    Idle,
    SizeChecked,
    Queued,
    Uploading,
    Persisting,
    Settled,
    Failed,
}

impl UploadPhase {
    /// Phases during which the slot must not be modified by other actions.
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            UploadPhase::SizeChecked
                | UploadPhase::Queued
                | UploadPhase::Uploading
                | UploadPhase::Persisting
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadEvent {
    pub slot_id: SlotId,
    pub phase: UploadPhase,
    pub percent: u8,
}

/// State of a slot whose upload is in flight or failed and not yet dismissed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotUploadState {
    pub slot_id: SlotId,
    pub applicant_key: ApplicantKey,
    pub document_type_id: DocumentTypeId,
    pub file_name: String,
    pub phase: UploadPhase,
    pub percent: u8,
}

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub slot_id: SlotId,
    pub applicant_key: ApplicantKey,
    pub document_type_id: DocumentTypeId,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("file '{file_name}' has {size} bytes, the limit is {limit} bytes")]
    FileTooLarge {
        file_name: String,
        size: u64,
        limit: u64,
    },
    #[error("transfer failed: {0}")]
    Transfer(String),
    #[error("could not record the upload: {0}")]
    Persistence(StoreError),
    #[error("could not load current uploads: {0}")]
    Fetch(StoreError),
    #[error("slot {0} has an upload in flight")]
    SlotBusy(SlotId),
    #[error("file '{file_name}' not found")]
    FileNotFound { file_name: String },
    #[error("could not delete stored file: {0}")]
    Removal(BlobError),
    #[error("upload task stopped: {0}")]
    Aborted(String),
}

/// Handle on a submitted upload.
#[derive(Debug)]
pub struct UploadTicket {
    slot_id: SlotId,
    handle: JoinHandle<Result<UploadedFile, UploadError>>,
}

impl UploadTicket {
    pub fn slot_id(&self) -> &SlotId {
        &self.slot_id
    }

    /// Resolves once the slot is `Settled` or `Failed`.
    pub async fn wait(self) -> Result<UploadedFile, UploadError> {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(err) => Err(UploadError::Aborted(err.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
struct UploadTarget {
    slot_id: SlotId,
    applicant_key: ApplicantKey,
    document_type_id: DocumentTypeId,
    file_name: String,
}

/// Per-session upload pipeline: size check, bounded FIFO admission, transfer with simulated
/// progress, fetch-then-append persistence and best-effort blob rollback.
#[derive(Clone)]
pub struct UploadPipeline {
    shared: Arc<Shared>,
}

struct Shared {
    user_id: UserId,
    documents: Arc<dyn DocumentStatusStore>,
    blobs: Arc<dyn BlobStore>,
    config: UploadConfig,
    limiter: Arc<UploadLimiter>,
    slots: Mutex<BTreeMap<SlotId, SlotUploadState>>,
    errors: Mutex<UploadErrorList>,
    events: broadcast::Sender<UploadEvent>,
}

impl UploadPipeline {
    pub fn new(
        user_id: UserId,
        documents: Arc<dyn DocumentStatusStore>,
        blobs: Arc<dyn BlobStore>,
        config: UploadConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                user_id,
                documents,
                blobs,
                limiter: UploadLimiter::new(config.max_concurrent),
                config,
                slots: Mutex::new(BTreeMap::new()),
                errors: Mutex::new(UploadErrorList::default()),
                events,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UploadEvent> {
        self.shared.events.subscribe()
    }

    pub fn phase(&self, slot_id: &SlotId) -> UploadPhase {
        lock(&self.shared.slots)
            .get(slot_id)
            .map(|state| state.phase)
            .unwrap_or_default()
    }

    pub fn uploads(&self) -> Vec<SlotUploadState> {
        lock(&self.shared.slots).values().cloned().collect()
    }

    pub fn errors(&self) -> UploadErrorList {
        lock(&self.shared.errors).clone()
    }

    /// Drop the error for a slot together with its failed upload state.
    pub fn dismiss_error(&self, slot_id: &SlotId) -> bool {
        let dismissed = lock(&self.shared.errors).dismiss(slot_id);
        let mut slots = lock(&self.shared.slots);
        if slots
            .get(slot_id)
            .is_some_and(|state| state.phase == UploadPhase::Failed)
        {
            slots.remove(slot_id);
        }
        dismissed
    }

    /// No upload admitted, queued or between phases.
    pub fn is_idle(&self) -> bool {
        self.active() == 0
            && self.queued() == 0
            && !lock(&self.shared.slots)
                .values()
                .any(|state| state.phase.is_busy())
    }

    pub fn active(&self) -> usize {
        self.shared.limiter.active()
    }

    pub fn queued(&self) -> usize {
        self.shared.limiter.queued()
    }

    /// First busy slot holding an upload for this applicant and document type.
    pub fn busy_slot(
        &self,
        applicant_key: &ApplicantKey,
        document_type_id: &DocumentTypeId,
    ) -> Option<SlotId> {
        lock(&self.shared.slots)
            .values()
            .find(|state| {
                state.phase.is_busy()
                    && state.applicant_key == *applicant_key
                    && state.document_type_id == *document_type_id
            })
            .map(|state| state.slot_id.clone())
    }

    /// Validate and admit an upload. Oversized files are rejected here and never queued;
    /// everything else is admitted or queued in call order before this returns.
    pub fn submit(&self, request: UploadRequest) -> Result<UploadTicket, UploadError> {
        let shared = &self.shared;
        if self.phase(&request.slot_id).is_busy() {
            return Err(UploadError::SlotBusy(request.slot_id));
        }

        let UploadRequest {
            slot_id,
            applicant_key,
            document_type_id,
            file_name,
            bytes,
        } = request;
        let target = UploadTarget {
            slot_id,
            applicant_key,
            document_type_id,
            file_name,
        };

        let size = bytes.len() as u64;
        if size > shared.config.max_file_bytes {
            let error = UploadError::FileTooLarge {
                file_name: target.file_name.clone(),
                size,
                limit: shared.config.max_file_bytes,
            };
            shared.fail(&target, &error);
            return Err(error);
        }
        shared.set_phase(&target, UploadPhase::SizeChecked, 0);

        let admission = shared.limiter.admit();
        let phase = match admission {
            Admission::Granted(_) => UploadPhase::Uploading,
            Admission::Queued(_) => UploadPhase::Queued,
        };
        shared.set_phase(&target, phase, 0);

        let span = info_span!(
            "upload",
            user_id = %shared.user_id,
            slot_id = %target.slot_id,
            file_name = %target.file_name
        );
        let slot_id = target.slot_id.clone();
        let task_shared = Arc::clone(shared);
        let handle = tokio::spawn(
            async move { task_shared.run(target, bytes, admission).await }.instrument(span),
        );

        Ok(UploadTicket { slot_id, handle })
    }

    /// Delete a stored file and its record. Matching is by name and timestamp.
    pub async fn remove(
        &self,
        applicant_key: ApplicantKey,
        document_type_id: &DocumentTypeId,
        file_name: &str,
        uploaded_at: DateTime<Utc>,
    ) -> Result<UploadedFile, UploadError> {
        if let Some(slot_id) = self.busy_slot(&applicant_key, document_type_id) {
            return Err(UploadError::SlotBusy(slot_id));
        }
        let shared = &self.shared;

        let current = shared.fetch_latest().await.map_err(UploadError::Fetch)?;
        let file = current
            .files(&applicant_key, document_type_id)
            .iter()
            .find(|file| file.matches(file_name, uploaded_at))
            .cloned()
            .ok_or_else(|| UploadError::FileNotFound {
                file_name: file_name.to_string(),
            })?;

        shared
            .blobs
            .delete(std::slice::from_ref(&file.storage_path))
            .await
            .map_err(UploadError::Removal)?;

        let mut latest = shared.fetch_latest().await.map_err(UploadError::Fetch)?;
        latest.remove(&applicant_key, document_type_id, file_name, uploaded_at);
        shared
            .documents
            .write(&shared.user_id, &latest)
            .await
            .map_err(UploadError::Persistence)?;

        info!(
            user_id = %shared.user_id,
            applicant_key = %applicant_key,
            document_type_id = %document_type_id,
            file_name,
            "removed uploaded file"
        );
        Ok(file)
    }
}

impl Shared {
    async fn run(
        self: Arc<Self>,
        target: UploadTarget,
        bytes: Vec<u8>,
        admission: Admission,
    ) -> Result<UploadedFile, UploadError> {
        let outcome = self.execute(&target, bytes, admission).await;
        match &outcome {
            Ok(file) => {
                lock(&self.errors).dismiss(&target.slot_id);
                self.forget_settled(&target.slot_id);
                info!(storage_path = %file.storage_path, "upload settled");
            }
            Err(error) => self.fail(&target, error),
        }
        outcome
    }

    async fn execute(
        &self,
        target: &UploadTarget,
        bytes: Vec<u8>,
        admission: Admission,
    ) -> Result<UploadedFile, UploadError> {
        // Held until the slot settles so queued uploads start only after the hold.
        let _permit = match admission {
            Admission::Granted(permit) => permit,
            Admission::Queued(receiver) => {
                let permit = receiver
                    .await
                    .map_err(|_| UploadError::Aborted("upload queue closed".to_string()))?;
                self.set_phase(target, UploadPhase::Uploading, 0);
                permit
            }
        };

        let path = storage_path(
            &self.user_id,
            &target.applicant_key,
            &target.document_type_id,
            &target.file_name,
        );
        self.transfer(target, &path, bytes).await?;
        self.set_phase(target, UploadPhase::Uploading, 100);

        self.set_phase(target, UploadPhase::Persisting, 100);
        let file = self.record(target, path).await?;

        tokio::time::sleep(self.config.completion_hold).await;
        self.set_phase(target, UploadPhase::Settled, 100);
        Ok(file)
    }

    async fn transfer(
        &self,
        target: &UploadTarget,
        path: &str,
        bytes: Vec<u8>,
    ) -> Result<(), UploadError> {
        let timeout = self.config.transfer_timeout;
        let transfer = tokio::time::timeout(timeout, self.blobs.put(path, bytes));
        tokio::pin!(transfer);

        let mut ticker = tokio::time::interval(self.config.progress_interval.max(MIN_PROGRESS_TICK));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        let mut progress = SimulatedProgress::default();

        let outcome = loop {
            tokio::select! {
                outcome = &mut transfer => break outcome,
                _ = ticker.tick() => {
                    let percent = progress.advance();
                    self.set_phase(target, UploadPhase::Uploading, percent);
                }
            }
        };

        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(UploadError::Transfer(err.to_string())),
            Err(_) => Err(UploadError::Transfer(format!(
                "no response within {}s",
                timeout.as_secs()
            ))),
        }
    }

    /// Append to the freshest stored state, rolling the blob back if that fails.
    async fn record(&self, target: &UploadTarget, path: String) -> Result<UploadedFile, UploadError> {
        let file = UploadedFile {
            file_name: target.file_name.clone(),
            storage_path: path,
            uploaded_at: Utc::now(),
            document_type_id: target.document_type_id.clone(),
            applicant_type: target.applicant_key.applicant_type(),
            applicant_uuid: target.applicant_key.uuid(),
        };

        let mut latest = match self.fetch_latest().await {
            Ok(latest) => latest,
            Err(err) => {
                self.rollback(&file.storage_path).await;
                return Err(UploadError::Fetch(err));
            }
        };
        latest.append(target.applicant_key, file.clone());

        if let Err(err) = self.documents.write(&self.user_id, &latest).await {
            self.rollback(&file.storage_path).await;
            return Err(UploadError::Persistence(err));
        }
        Ok(file)
    }

    async fn fetch_latest(&self) -> Result<UploadedDocuments, StoreError> {
        match self.documents.fetch(&self.user_id).await {
            Err(StoreError::NotFound) => Ok(UploadedDocuments::default()),
            other => other,
        }
    }

    async fn rollback(&self, path: &str) {
        if let Err(err) = self.blobs.delete(&[path.to_string()]).await {
            warn!(storage_path = path, error = %err, "could not roll back orphaned blob");
        }
    }

    fn fail(&self, target: &UploadTarget, error: &UploadError) {
        warn!(
            user_id = %self.user_id,
            slot_id = %target.slot_id,
            error = %error,
            "upload failed"
        );
        lock(&self.errors).record(UploadErrorEntry {
            slot_id: target.slot_id.clone(),
            file_name: target.file_name.clone(),
            message: error.to_string(),
            occurred_at: Utc::now(),
        });
        self.set_phase(target, UploadPhase::Failed, 0);
    }

    /// Settled slots are already reflected by the stored documents. A newer upload that
    /// reused the slot keeps its entry.
    fn forget_settled(&self, slot_id: &SlotId) {
        let mut slots = lock(&self.slots);
        if slots
            .get(slot_id)
            .is_some_and(|state| state.phase == UploadPhase::Settled)
        {
            slots.remove(slot_id);
        }
    }

    fn set_phase(&self, target: &UploadTarget, phase: UploadPhase, percent: u8) {
        let previous = lock(&self.slots).insert(
            target.slot_id.clone(),
            SlotUploadState {
                slot_id: target.slot_id.clone(),
                applicant_key: target.applicant_key,
                document_type_id: target.document_type_id.clone(),
                file_name: target.file_name.clone(),
                phase,
                percent,
            },
        );
        // Progress stalls at the ceiling; repeated values are not re-published.
        if previous.is_some_and(|state| state.phase == phase && state.percent == percent) {
            return;
        }
        // Nobody listening is fine.
        let _ = self.events.send(UploadEvent {
            slot_id: target.slot_id.clone(),
            phase,
            percent,
        });
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
