use crate::embeddings::{CharacterNgramEmbedder, Embedder};
use crate::models::{Document, NewDocument, SearchResult};
use crate::traits::{DocumentStore, ObjectStore};
use crate::{EmbeddingError, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Deterministic embedder that counts calls and fails on chosen inputs.
pub struct ScriptedEmbedder {
    inner: CharacterNgramEmbedder,
    failing: Vec<String>,
    delays: HashMap<String, u64>,
    calls: AtomicUsize,
}

impl ScriptedEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            inner: CharacterNgramEmbedder { dimensions },
            failing: Vec::new(),
            delays: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_on(mut self, needle: &str) -> Self {
        self.failing.push(needle.to_string());
        self
    }

    pub fn with_delay_for(mut self, text: &str, millis: u64) -> Self {
        self.delays.insert(text.to_string(), millis);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for ScriptedEmbedder {
    fn dimensions(&self) -> usize {
        self.inner.dimensions
    }

    fn model(&self) -> &str {
        "scripted"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(millis) = self.delays.get(text) {
            tokio::time::sleep(Duration::from_millis(*millis)).await;
        }

        if self.failing.iter().any(|needle| text.contains(needle.as_str())) {
            return Err(EmbeddingError::Provider {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }

        Ok(self.inner.embed_sync(text))
    }
}

pub struct FailingObjectStore;

#[async_trait]
impl ObjectStore for FailingObjectStore {
    async fn put(&self, _path: &str, _bytes: &[u8]) -> Result<(), StoreError> {
        Err(StoreError::BackendResponse {
            backend: "test-storage".to_string(),
            status: 500,
            details: "disk full".to_string(),
        })
    }
}

pub struct FailingDocumentStore;

#[async_trait]
impl DocumentStore for FailingDocumentStore {
    async fn insert_document(&self, _document: &NewDocument) -> Result<Document, StoreError> {
        Err(StoreError::BackendResponse {
            backend: "test-db".to_string(),
            status: 500,
            details: "relation \"documents\" does not exist".to_string(),
        })
    }

    async fn nearest_neighbors(
        &self,
        _query_vector: &[f32],
        _threshold: f64,
        _limit: usize,
    ) -> Result<Vec<SearchResult>, StoreError> {
        Err(StoreError::BackendResponse {
            backend: "test-db".to_string(),
            status: 500,
            details: "function match_pages does not exist".to_string(),
        })
    }
}
