pub mod config;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod models;
pub mod pages;
pub mod search;
pub mod stores;
pub mod traits;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_pdf;
#[cfg(test)]
mod test_support;

pub use config::{Config, EmbeddingConfig, SupabaseConfig};
pub use embeddings::{CharacterNgramEmbedder, Embedder, OpenAiEmbedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{EmbeddingError, IngestError, SearchError, StoreError};
pub use extractor::{extract_page_texts, LopdfExtractor, PageText, PdfExtractor};
pub use ingest::{discover_pdf_files, storage_path, IngestionPipeline};
pub use models::{
    Document, IngestOptions, IngestRequest, IngestionReport, NewDocument, Page, PageFailure,
    SearchOptions, SearchResult,
};
pub use pages::{PageOutcome, PageRecordBuilder};
pub use search::{cosine_similarity, SimilaritySearch};
pub use stores::{
    FsObjectStore, MemoryDocumentStore, MemoryObjectStore, SupabaseDocumentStore, SupabaseStorage,
};
pub use traits::{DocumentStore, ObjectStore};
