use crate::embeddings::DEFAULT_EMBEDDING_DIMENSIONS;
use crate::models::{IngestOptions, SearchOptions};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
pub const DEFAULT_EMBEDDING_BASE_URL: &str = "https://api.openai.com/v1";

/// Process-wide settings, built once at startup and passed by reference.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub embedding: EmbeddingConfig,
    pub search: SearchOptions,
    pub ingest: IngestOptions,
    /// Remote backends; `None` means local storage.
    pub supabase: Option<SupabaseConfig>,
}

pub const DEFAULT_STORAGE_BUCKET: &str = "pdfs";
pub const DEFAULT_DOCUMENTS_TABLE: &str = "documents";
pub const DEFAULT_MATCH_FUNCTION: &str = "match_pages";

#[derive(Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub service_key: String,
    pub bucket: String,
    pub documents_table: String,
    pub match_function: String,
}

impl SupabaseConfig {
    pub fn new(url: impl Into<String>, service_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            service_key: service_key.into(),
            bucket: DEFAULT_STORAGE_BUCKET.to_string(),
            documents_table: DEFAULT_DOCUMENTS_TABLE.to_string(),
            match_function: DEFAULT_MATCH_FUNCTION.to_string(),
        }
    }
}

impl fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("service_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("documents_table", &self.documents_table)
            .field("match_function", &self.match_function)
            .finish()
    }
}

#[derive(Clone)]
pub struct EmbeddingConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub dimensions: usize,
    /// Per-request timeout. `None` leaves the call unbounded.
    pub timeout: Option<Duration>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_EMBEDDING_BASE_URL.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            timeout: None,
        }
    }
}

impl fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .field("timeout", &self.timeout)
            .finish()
    }
}
