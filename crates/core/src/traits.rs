use crate::models::{Document, NewDocument, SearchResult};
use crate::StoreError;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<(), StoreError>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persists the whole document in one write and returns it with its
    /// assigned id and creation time.
    async fn insert_document(&self, document: &NewDocument) -> Result<Document, StoreError>;

    /// Pages with similarity >= `threshold`, best first, at most `limit`.
    /// Pages without an embedding never match.
    async fn nearest_neighbors(
        &self,
        query_vector: &[f32],
        threshold: f64,
        limit: usize,
    ) -> Result<Vec<SearchResult>, StoreError>;
}

#[async_trait]
impl<T: ObjectStore + ?Sized> ObjectStore for Arc<T> {
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<(), StoreError> {
        (**self).put(path, bytes).await
    }
}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for Arc<T> {
    async fn insert_document(&self, document: &NewDocument) -> Result<Document, StoreError> {
        (**self).insert_document(document).await
    }

    async fn nearest_neighbors(
        &self,
        query_vector: &[f32],
        threshold: f64,
        limit: usize,
    ) -> Result<Vec<SearchResult>, StoreError> {
        (**self)
            .nearest_neighbors(query_vector, threshold, limit)
            .await
    }
}
