use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use subsidy_intake::documents::{
    ApplicationFacts, BlobError, BlobStore, DocumentStatusStore, DocumentStores, FactStore,
    OptionalSelectionStore, OptionalSelections, ProgressSnapshot, ProgressStore, StoreError,
    UploadedDocuments, UserId,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) facts: Arc<InMemoryFactStore>,
}

fn guard<'a, T>(mutex: &'a Mutex<T>, name: &str) -> Result<MutexGuard<'a, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError::Unavailable(format!("{name} lock poisoned")))
}

fn blob_guard<'a, T>(mutex: &'a Mutex<T>) -> Result<MutexGuard<'a, T>, String> {
    mutex.lock().map_err(|_| "blob lock poisoned".to_string())
}

/// Application facts keyed by user. The form wizard owns these in production; here they are
/// seeded through the API or the CLI.
#[derive(Default)]
pub(crate) struct InMemoryFactStore {
    facts: Mutex<HashMap<UserId, ApplicationFacts>>,
}

impl InMemoryFactStore {
    pub(crate) fn replace(
        &self,
        user_id: &UserId,
        facts: ApplicationFacts,
    ) -> Result<(), StoreError> {
        guard(&self.facts, "fact store")?.insert(user_id.clone(), facts);
        Ok(())
    }
}

#[async_trait]
impl FactStore for InMemoryFactStore {
    async fn facts(&self, user_id: &UserId) -> Result<ApplicationFacts, StoreError> {
        guard(&self.facts, "fact store")?
            .get(user_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }
}

#[derive(Default)]
pub(crate) struct InMemoryDocumentStatusStore {
    records: Mutex<HashMap<UserId, UploadedDocuments>>,
}

#[async_trait]
impl DocumentStatusStore for InMemoryDocumentStatusStore {
    async fn fetch(&self, user_id: &UserId) -> Result<UploadedDocuments, StoreError> {
        guard(&self.records, "document status store")?
            .get(user_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn write(
        &self,
        user_id: &UserId,
        documents: &UploadedDocuments,
    ) -> Result<(), StoreError> {
        guard(&self.records, "document status store")?.insert(user_id.clone(), documents.clone());
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryOptionalSelectionStore {
    records: Mutex<HashMap<UserId, OptionalSelections>>,
}

#[async_trait]
impl OptionalSelectionStore for InMemoryOptionalSelectionStore {
    async fn fetch(&self, user_id: &UserId) -> Result<OptionalSelections, StoreError> {
        guard(&self.records, "optional selection store")?
            .get(user_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn write(
        &self,
        user_id: &UserId,
        selections: &OptionalSelections,
    ) -> Result<(), StoreError> {
        guard(&self.records, "optional selection store")?
            .insert(user_id.clone(), selections.clone());
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryBlobStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub(crate) fn len(&self) -> usize {
        blob_guard(&self.objects).map(|objects| objects.len()).unwrap_or(0)
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<(), BlobError> {
        blob_guard(&self.objects)
            .map_err(BlobError::Put)?
            .insert(path.to_string(), bytes);
        Ok(())
    }

    async fn delete(&self, paths: &[String]) -> Result<(), BlobError> {
        let mut objects = blob_guard(&self.objects).map_err(BlobError::Delete)?;
        for path in paths {
            objects.remove(path);
        }
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryProgressStore {
    snapshots: Mutex<HashMap<UserId, ProgressSnapshot>>,
}

#[async_trait]
impl ProgressStore for InMemoryProgressStore {
    async fn load(&self, user_id: &UserId) -> Result<ProgressSnapshot, StoreError> {
        guard(&self.snapshots, "progress store")?
            .get(user_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn save_score(&self, user_id: &UserId, score: u8) -> Result<(), StoreError> {
        guard(&self.snapshots, "progress store")?
            .entry(user_id.clone())
            .or_default()
            .score = Some(score);
        Ok(())
    }
}

/// Every collaborator the document service needs, backed by process memory.
pub(crate) struct InMemoryCollaborators {
    pub(crate) facts: Arc<InMemoryFactStore>,
    pub(crate) blobs: Arc<InMemoryBlobStore>,
    pub(crate) stores: DocumentStores,
}

impl InMemoryCollaborators {
    pub(crate) fn new() -> Self {
        let facts = Arc::new(InMemoryFactStore::default());
        let blobs = Arc::new(InMemoryBlobStore::default());
        let stores = DocumentStores {
            facts: facts.clone(),
            documents: Arc::new(InMemoryDocumentStatusStore::default()),
            optional: Arc::new(InMemoryOptionalSelectionStore::default()),
            blobs: blobs.clone(),
            progress: Arc::new(InMemoryProgressStore::default()),
        };
        Self {
            facts,
            blobs,
            stores,
        }
    }
}
