use crate::embeddings::Embedder;
use crate::models::{SearchOptions, SearchResult};
use crate::traits::DocumentStore;
use crate::{SearchError, StoreError};
use std::cmp::Ordering;
use tracing::{debug, info};

/// Cosine similarity computed in f64. A zero vector scores 0.
pub fn cosine_similarity(query: &[f32], stored: &[f32]) -> Result<f64, StoreError> {
    if query.len() != stored.len() {
        return Err(StoreError::DimensionMismatch {
            expected: query.len(),
            actual: stored.len(),
        });
    }

    let (mut dot, mut query_norm, mut stored_norm) = (0f64, 0f64, 0f64);
    for (left, right) in query.iter().zip(stored) {
        let (left, right) = (f64::from(*left), f64::from(*right));
        dot += left * right;
        query_norm += left * left;
        stored_norm += right * right;
    }

    if query_norm <= f64::EPSILON || stored_norm <= f64::EPSILON {
        return Ok(0.0);
    }

    Ok(dot / (query_norm.sqrt() * stored_norm.sqrt()))
}

#[derive(Debug, Clone)]
pub struct ScoredPage {
    pub result: SearchResult,
    /// Insertion rank of the owning document; older documents sort first on ties.
    pub document_order: u64,
}

/// Applies the threshold, orders by similarity (ties: page number, then
/// document order), clamps scores to [0, 1] and truncates to `limit`.
pub fn rank_candidates(
    candidates: Vec<ScoredPage>,
    threshold: f64,
    limit: usize,
) -> Vec<SearchResult> {
    let mut kept: Vec<ScoredPage> = candidates
        .into_iter()
        .filter(|candidate| candidate.result.similarity >= threshold)
        .collect();

    kept.sort_by(|left, right| {
        right
            .result
            .similarity
            .total_cmp(&left.result.similarity)
            .then_with(|| left.result.page_number.cmp(&right.result.page_number))
            .then_with(|| left.document_order.cmp(&right.document_order))
    });

    kept.into_iter()
        .take(limit)
        .map(|candidate| {
            let mut result = candidate.result;
            result.similarity = result.similarity.clamp(0.0, 1.0);
            result
        })
        .collect()
}

pub struct SimilaritySearch<D, E> {
    store: D,
    embedder: E,
    options: SearchOptions,
}

impl<D, E> SimilaritySearch<D, E>
where
    D: DocumentStore,
    E: Embedder,
{
    pub fn new(store: D, embedder: E, options: SearchOptions) -> Self {
        Self {
            store,
            embedder,
            options,
        }
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    pub async fn search_default(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        let options = self.options;
        self.search(query, &options).await
    }

    pub async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>, SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::Validation("query is empty".to_string()));
        }
        options.validate().map_err(SearchError::Validation)?;

        let query_vector = self.embedder.embed(query).await?;
        debug!(dimensions = query_vector.len(), "query embedded");

        let results = self
            .store
            .nearest_neighbors(&query_vector, options.threshold, options.limit)
            .await?;

        info!(
            hits = results.len(),
            threshold = options.threshold,
            limit = options.limit,
            "similarity search finished"
        );
        Ok(results)
    }
}
