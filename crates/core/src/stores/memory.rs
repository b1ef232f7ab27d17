use crate::models::{Document, NewDocument, SearchResult};
use crate::search::{cosine_similarity, rank_candidates, ScoredPage};
use crate::traits::{DocumentStore, ObjectStore};
use crate::StoreError;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.lock().await.get(path).cloned()
    }

    pub async fn paths(&self) -> Vec<String> {
        self.objects.lock().await.keys().cloned().collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.objects
            .lock()
            .await
            .insert(path.to_string(), bytes.to_vec());
        Ok(())
    }
}

/// Document store that scores every embedded page by brute-force cosine
/// similarity. With a snapshot path, the full document list is rewritten as
/// JSON after each insert and reloaded by [`MemoryDocumentStore::open`].
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<Vec<Document>>,
    snapshot: Option<PathBuf>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn open(snapshot: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let snapshot = snapshot.into();
        let documents = match tokio::fs::read(&snapshot).await {
            Ok(bytes) => serde_json::from_slice::<Vec<Document>>(&bytes)?,
            Err(error) if error.kind() == ErrorKind::NotFound => Vec::new(),
            Err(error) => return Err(StoreError::Io(error)),
        };

        debug!(path = %snapshot.display(), documents = documents.len(), "loaded document snapshot");
        Ok(Self {
            documents: RwLock::new(documents),
            snapshot: Some(snapshot),
        })
    }

    pub async fn documents(&self) -> Vec<Document> {
        self.documents.read().await.clone()
    }

    async fn write_snapshot(path: &Path, documents: &[Document]) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, serde_json::to_vec(documents)?).await?;
        tokio::fs::rename(&staging, path).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert_document(&self, document: &NewDocument) -> Result<Document, StoreError> {
        let stored = Document {
            id: Uuid::new_v4().to_string(),
            title: document.title.clone(),
            storage_path: document.storage_path.clone(),
            created_at: Utc::now(),
            pages: document.pages.clone(),
        };

        let mut documents = self.documents.write().await;
        documents.push(stored.clone());

        if let Some(path) = &self.snapshot {
            if let Err(error) = Self::write_snapshot(path, &documents).await {
                documents.pop();
                return Err(error);
            }
        }

        Ok(stored)
    }

    async fn nearest_neighbors(
        &self,
        query_vector: &[f32],
        threshold: f64,
        limit: usize,
    ) -> Result<Vec<SearchResult>, StoreError> {
        let documents = self.documents.read().await;

        let mut candidates = Vec::new();
        for (order, document) in documents.iter().enumerate() {
            for page in &document.pages {
                let Some(embedding) = &page.embedding else {
                    continue;
                };
                let similarity = cosine_similarity(query_vector, embedding)?;
                candidates.push(ScoredPage {
                    result: SearchResult {
                        document_id: document.id.clone(),
                        document_title: document.title.clone(),
                        page_number: page.page_number,
                        text: page.text.clone(),
                        similarity,
                    },
                    document_order: order as u64,
                });
            }
        }

        Ok(rank_candidates(candidates, threshold, limit))
    }
}
