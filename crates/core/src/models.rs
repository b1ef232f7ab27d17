use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page {
    pub page_number: u32,
    pub text: String,
    pub embedding: Option<Vec<f32>>,
}

impl Page {
    pub fn has_embedding(&self) -> bool {
        self.embedding.is_some()
    }
}

/// A document as handed to the store, before it has an identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewDocument {
    pub title: String,
    pub storage_path: String,
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub storage_path: String,
    pub created_at: DateTime<Utc>,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn embedded_pages(&self) -> usize {
        self.pages.iter().filter(|page| page.has_embedding()).count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageFailure {
    pub page_number: u32,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub bytes: Vec<u8>,
    pub title: String,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IngestionReport {
    pub document: Document,
    /// Pages whose embedding call failed; their `embedding` is `None`.
    pub failures: Vec<PageFailure>,
    /// SHA-256 of the uploaded bytes, hex encoded.
    pub checksum: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub document_id: String,
    pub document_title: String,
    pub page_number: u32,
    pub text: String,
    pub similarity: f64,
}

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SearchOptions {
    pub threshold: f64,
    pub limit: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

impl SearchOptions {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(format!(
                "threshold must be within [0, 1], got {}",
                self.threshold
            ));
        }
        if self.limit == 0 {
            return Err("limit must be at least 1".to_string());
        }
        Ok(())
    }
}

pub const DEFAULT_EMBEDDING_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    /// Upper bound on in-flight embedding calls for one document.
    pub embedding_concurrency: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            embedding_concurrency: DEFAULT_EMBEDDING_CONCURRENCY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_options_default_to_documented_values() {
        let options = SearchOptions::default();
        assert_eq!(options.threshold, 0.7);
        assert_eq!(options.limit, 10);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn search_options_reject_out_of_range_values() {
        let negative = SearchOptions {
            threshold: -0.1,
            limit: 10,
        };
        let empty = SearchOptions {
            threshold: 0.5,
            limit: 0,
        };
        assert!(negative.validate().is_err());
        assert!(empty.validate().is_err());
    }
}
