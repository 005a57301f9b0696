use std::sync::Arc;

use async_trait::async_trait;

use super::domain::{OptionalSelections, UploadedDocuments, UserId};
use super::facts::ApplicationFacts;
use super::scoring::ProgressSnapshot;

/// Failure of a key-value collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Failure of the blob store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlobError {
    #[error("blob upload failed: {0}")]
    Put(String),
    #[error("blob deletion failed: {0}")]
    Delete(String),
}

/// Read-only applicant, object and finance facts.
#[async_trait]
pub trait FactStore: Send + Sync {
    async fn facts(&self, user_id: &UserId) -> Result<ApplicationFacts, StoreError>;
}

/// Persisted upload records. `fetch` must return the latest written state.
#[async_trait]
pub trait DocumentStatusStore: Send + Sync {
    async fn fetch(&self, user_id: &UserId) -> Result<UploadedDocuments, StoreError>;
    async fn write(&self, user_id: &UserId, documents: &UploadedDocuments)
        -> Result<(), StoreError>;
}

#[async_trait]
pub trait OptionalSelectionStore: Send + Sync {
    async fn fetch(&self, user_id: &UserId) -> Result<OptionalSelections, StoreError>;
    async fn write(&self, user_id: &UserId, selections: &OptionalSelections)
        -> Result<(), StoreError>;
}

/// File contents addressed by `{user}/{applicant_key}/{document_type}/{file_name}`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<(), BlobError>;
    async fn delete(&self, paths: &[String]) -> Result<(), BlobError>;
}

/// Stored completion score plus the form percentages it is computed from.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn load(&self, user_id: &UserId) -> Result<ProgressSnapshot, StoreError>;
    async fn save_score(&self, user_id: &UserId, score: u8) -> Result<(), StoreError>;
}

/// Every collaborator the document engine talks to.
#[derive(Clone)]
pub struct DocumentStores {
    pub facts: Arc<dyn FactStore>,
    pub documents: Arc<dyn DocumentStatusStore>,
    pub optional: Arc<dyn OptionalSelectionStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub progress: Arc<dyn ProgressStore>,
}
