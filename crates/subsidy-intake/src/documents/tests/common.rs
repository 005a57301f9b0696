use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tokio::sync::{broadcast, Semaphore};

use crate::config::{ProgressConfig, UploadConfig, DEFAULT_MAX_FILE_BYTES};
use crate::documents::domain::{
    ApplicantKey, ApplicantType, DocumentTypeId, OptionalSelections, UploadedDocuments,
    UploadedFile, UserId,
};
use crate::documents::facts::{ApplicationFacts, HouseholdFacts};
use crate::documents::scoring::ProgressSnapshot;
use crate::documents::service::DocumentService;
use crate::documents::store::{
    BlobError, BlobStore, DocumentStatusStore, DocumentStores, FactStore, OptionalSelectionStore,
    ProgressStore, StoreError,
};
use crate::documents::upload::{UploadEvent, UploadPipeline};

pub(super) fn user() -> UserId {
    UserId("user-7".to_string())
}

pub(super) fn fast_upload_config() -> UploadConfig {
    UploadConfig {
        max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        max_concurrent: 3,
        transfer_timeout: Duration::from_secs(5),
        progress_interval: Duration::from_millis(5),
        completion_hold: Duration::from_millis(0),
    }
}

pub(super) fn progress_config() -> ProgressConfig {
    ProgressConfig {
        debounce: Duration::from_millis(10),
        min_delta: 1,
    }
}

pub(super) fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn stored_file(
    key: ApplicantKey,
    document: &str,
    file_name: &str,
    uploaded_at: DateTime<Utc>,
) -> UploadedFile {
    UploadedFile {
        file_name: file_name.to_string(),
        storage_path: format!("{}/{key}/{document}/{file_name}", user()),
        uploaded_at,
        document_type_id: DocumentTypeId::from(document),
        applicant_type: key.applicant_type(),
        applicant_uuid: key.uuid(),
    }
}

pub(super) fn pregnant_facts() -> ApplicationFacts {
    ApplicationFacts {
        household: HouseholdFacts {
            is_pregnant: Some(true),
            is_married: Some(false),
            ..HouseholdFacts::default()
        },
        ..ApplicationFacts::default()
    }
}

#[derive(Default)]
pub(super) struct MemoryFacts {
    facts: Mutex<HashMap<UserId, ApplicationFacts>>,
    pub(super) unavailable: AtomicBool,
}

impl MemoryFacts {
    pub(super) fn set(&self, user_id: &UserId, facts: ApplicationFacts) {
        self.facts
            .lock()
            .expect("facts mutex poisoned")
            .insert(user_id.clone(), facts);
    }
}

#[async_trait]
impl FactStore for MemoryFacts {
    async fn facts(&self, user_id: &UserId) -> Result<ApplicationFacts, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("facts offline".to_string()));
        }
        self.facts
            .lock()
            .expect("facts mutex poisoned")
            .get(user_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }
}

#[derive(Default)]
pub(super) struct MemoryDocuments {
    records: Mutex<HashMap<UserId, UploadedDocuments>>,
    pub(super) fail_fetches: AtomicBool,
    pub(super) fail_writes: AtomicBool,
    pub(super) writes: AtomicUsize,
}

impl MemoryDocuments {
    pub(super) fn set(&self, user_id: &UserId, documents: UploadedDocuments) {
        self.records
            .lock()
            .expect("documents mutex poisoned")
            .insert(user_id.clone(), documents);
    }

    pub(super) fn get(&self, user_id: &UserId) -> UploadedDocuments {
        self.records
            .lock()
            .expect("documents mutex poisoned")
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStatusStore for MemoryDocuments {
    async fn fetch(&self, user_id: &UserId) -> Result<UploadedDocuments, StoreError> {
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("documents offline".to_string()));
        }
        Ok(self.get(user_id))
    }

    async fn write(
        &self,
        user_id: &UserId,
        documents: &UploadedDocuments,
    ) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("documents read only".to_string()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.set(user_id, documents.clone());
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemoryOptional {
    records: Mutex<HashMap<UserId, OptionalSelections>>,
    pub(super) unavailable: AtomicBool,
    pub(super) writes: AtomicUsize,
}

impl MemoryOptional {
    pub(super) fn set(&self, user_id: &UserId, selections: OptionalSelections) {
        self.records
            .lock()
            .expect("optional mutex poisoned")
            .insert(user_id.clone(), selections);
    }

    pub(super) fn get(&self, user_id: &UserId) -> OptionalSelections {
        self.records
            .lock()
            .expect("optional mutex poisoned")
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl OptionalSelectionStore for MemoryOptional {
    async fn fetch(&self, user_id: &UserId) -> Result<OptionalSelections, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("selections offline".to_string()));
        }
        Ok(self.get(user_id))
    }

    async fn write(
        &self,
        user_id: &UserId,
        selections: &OptionalSelections,
    ) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("selections offline".to_string()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.set(user_id, selections.clone());
        Ok(())
    }
}

/// Blob store whose transfers can be held back until the test releases them.
#[derive(Default)]
pub(super) struct MemoryBlobs {
    blobs: Mutex<BTreeMap<String, usize>>,
    deleted: Mutex<Vec<String>>,
    gate: Option<Arc<Semaphore>>,
    pub(super) fail_puts: AtomicBool,
    pub(super) fail_deletes: AtomicBool,
}

impl MemoryBlobs {
    pub(super) fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let blobs = Self {
            gate: Some(Arc::clone(&gate)),
            ..Self::default()
        };
        (blobs, gate)
    }

    pub(super) fn paths(&self) -> Vec<String> {
        self.blobs
            .lock()
            .expect("blob mutex poisoned")
            .keys()
            .cloned()
            .collect()
    }

    pub(super) fn deleted(&self) -> Vec<String> {
        self.deleted.lock().expect("blob mutex poisoned").clone()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobs {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<(), BlobError> {
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|err| BlobError::Put(err.to_string()))?
                .forget();
        }
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(BlobError::Put("bucket rejected object".to_string()));
        }
        self.blobs
            .lock()
            .expect("blob mutex poisoned")
            .insert(path.to_string(), bytes.len());
        Ok(())
    }

    async fn delete(&self, paths: &[String]) -> Result<(), BlobError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(BlobError::Delete("bucket unreachable".to_string()));
        }
        let mut blobs = self.blobs.lock().expect("blob mutex poisoned");
        let mut deleted = self.deleted.lock().expect("blob mutex poisoned");
        for path in paths {
            blobs.remove(path);
            deleted.push(path.clone());
        }
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemoryProgress {
    snapshots: Mutex<HashMap<UserId, ProgressSnapshot>>,
    pub(super) saved: Mutex<Vec<u8>>,
    pub(super) unavailable: AtomicBool,
}

impl MemoryProgress {
    pub(super) fn set(&self, user_id: &UserId, snapshot: ProgressSnapshot) {
        self.snapshots
            .lock()
            .expect("progress mutex poisoned")
            .insert(user_id.clone(), snapshot);
    }

    pub(super) fn saved(&self) -> Vec<u8> {
        self.saved.lock().expect("progress mutex poisoned").clone()
    }
}

#[async_trait]
impl ProgressStore for MemoryProgress {
    async fn load(&self, user_id: &UserId) -> Result<ProgressSnapshot, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("progress offline".to_string()));
        }
        Ok(self
            .snapshots
            .lock()
            .expect("progress mutex poisoned")
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_score(&self, user_id: &UserId, score: u8) -> Result<(), StoreError> {
        self.saved.lock().expect("progress mutex poisoned").push(score);
        let mut snapshots = self.snapshots.lock().expect("progress mutex poisoned");
        snapshots.entry(user_id.clone()).or_default().score = Some(score);
        Ok(())
    }
}

/// All in-memory collaborators, kept individually so tests can inspect them.
pub(super) struct Harness {
    pub(super) facts: Arc<MemoryFacts>,
    pub(super) documents: Arc<MemoryDocuments>,
    pub(super) optional: Arc<MemoryOptional>,
    pub(super) blobs: Arc<MemoryBlobs>,
    pub(super) progress: Arc<MemoryProgress>,
}

impl Harness {
    pub(super) fn new() -> Self {
        Self::with_blobs(MemoryBlobs::default())
    }

    pub(super) fn with_blobs(blobs: MemoryBlobs) -> Self {
        Self {
            facts: Arc::new(MemoryFacts::default()),
            documents: Arc::new(MemoryDocuments::default()),
            optional: Arc::new(MemoryOptional::default()),
            blobs: Arc::new(blobs),
            progress: Arc::new(MemoryProgress::default()),
        }
    }

    pub(super) fn stores(&self) -> DocumentStores {
        DocumentStores {
            facts: self.facts.clone(),
            documents: self.documents.clone(),
            optional: self.optional.clone(),
            blobs: self.blobs.clone(),
            progress: self.progress.clone(),
        }
    }

    pub(super) fn service(&self) -> DocumentService {
        self.service_with(fast_upload_config())
    }

    pub(super) fn service_with(&self, upload: UploadConfig) -> DocumentService {
        DocumentService::new(self.stores(), upload, progress_config())
    }

    pub(super) fn pipeline(&self, upload: UploadConfig) -> UploadPipeline {
        UploadPipeline::new(user(), self.documents.clone(), self.blobs.clone(), upload)
    }
}

/// Wait for the next event matching `predicate`, failing after a generous timeout.
pub(super) async fn next_event(
    events: &mut broadcast::Receiver<UploadEvent>,
    predicate: impl Fn(&UploadEvent) -> bool,
) -> UploadEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Ok(event) if predicate(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event channel closed"),
            }
        }
    })
    .await
    .expect("event arrives in time")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
