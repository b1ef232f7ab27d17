use anyhow::{bail, Context};
use clap::{Args, ValueEnum};
use pdf_semantic_core::config::{
    DEFAULT_EMBEDDING_BASE_URL, DEFAULT_EMBEDDING_MODEL, DEFAULT_STORAGE_BUCKET,
};
use pdf_semantic_core::models::{
    DEFAULT_EMBEDDING_CONCURRENCY, DEFAULT_SEARCH_LIMIT, DEFAULT_SIMILARITY_THRESHOLD,
};
use pdf_semantic_core::{
    CharacterNgramEmbedder, Config, DocumentStore, EmbeddingConfig, Embedder, FsObjectStore,
    IngestOptions, IngestionPipeline, MemoryDocumentStore, ObjectStore, OpenAiEmbedder,
    SearchOptions, SimilaritySearch, SupabaseConfig, SupabaseDocumentStore, SupabaseStorage,
    DEFAULT_EMBEDDING_DIMENSIONS,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub type DynObjectStore = Arc<dyn ObjectStore>;
pub type DynDocumentStore = Arc<dyn DocumentStore>;
pub type DynEmbedder = Arc<dyn Embedder>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmbeddingProvider {
    /// OpenAI-compatible `/embeddings` endpoint.
    #[value(name = "openai")]
    OpenAi,
    /// Offline hashed character trigrams; deterministic, no network.
    #[value(name = "ngram")]
    Ngram,
}

#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Embedding provider.
    #[arg(long, env = "EMBEDDING_PROVIDER", value_enum, default_value = "openai")]
    pub embedding_provider: EmbeddingProvider,

    /// API key for the embedding provider.
    #[arg(long, env = "OPENAI_API_KEY", default_value = "", hide_env_values = true)]
    pub openai_api_key: String,

    /// Base URL of the OpenAI-compatible API.
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_EMBEDDING_BASE_URL)]
    pub openai_base_url: String,

    /// Embedding model identifier.
    #[arg(long, env = "EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    pub embedding_model: String,

    /// Vector dimensionality produced by the model.
    #[arg(long, env = "EMBEDDING_DIMENSIONS", default_value_t = DEFAULT_EMBEDDING_DIMENSIONS)]
    pub embedding_dimensions: usize,

    /// Timeout for a single embedding request, in seconds.
    #[arg(long, env = "EMBEDDING_TIMEOUT_SECS")]
    pub embedding_timeout_secs: Option<u64>,

    /// Embedding calls in flight per document.
    #[arg(long, env = "EMBEDDING_CONCURRENCY", default_value_t = DEFAULT_EMBEDDING_CONCURRENCY)]
    pub embedding_concurrency: usize,

    /// Minimum cosine similarity for search results.
    #[arg(long, env = "SEARCH_THRESHOLD", default_value_t = DEFAULT_SIMILARITY_THRESHOLD)]
    pub search_threshold: f64,

    /// Maximum number of search results.
    #[arg(long, env = "SEARCH_LIMIT", default_value_t = DEFAULT_SEARCH_LIMIT)]
    pub search_limit: usize,

    /// Supabase project URL. Without it, files and documents stay under --data-dir.
    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    /// Supabase service key.
    #[arg(long, env = "SUPABASE_SERVICE_KEY", hide_env_values = true)]
    pub supabase_key: Option<String>,

    /// Storage bucket for uploaded PDFs.
    #[arg(long, env = "SUPABASE_BUCKET", default_value = DEFAULT_STORAGE_BUCKET)]
    pub supabase_bucket: String,

    /// Directory for local uploads and the document snapshot.
    #[arg(long, env = "DATA_DIR", default_value = ".pdf-semantic")]
    pub data_dir: PathBuf,
}

impl Settings {
    pub fn to_config(&self) -> anyhow::Result<Config> {
        if self.embedding_provider == EmbeddingProvider::OpenAi
            && self.openai_api_key.trim().is_empty()
        {
            bail!("OPENAI_API_KEY is required for the openai embedding provider");
        }

        let supabase = match (&self.supabase_url, &self.supabase_key) {
            (Some(url), Some(key)) => {
                let mut config = SupabaseConfig::new(url.clone(), key.clone());
                config.bucket = self.supabase_bucket.clone();
                Some(config)
            }
            (None, None) => None,
            _ => bail!("SUPABASE_URL and SUPABASE_SERVICE_KEY must be set together"),
        };

        let search = SearchOptions {
            threshold: self.search_threshold,
            limit: self.search_limit,
        };
        search
            .validate()
            .map_err(|message| anyhow::anyhow!("invalid search settings: {message}"))?;

        Ok(Config {
            embedding: EmbeddingConfig {
                api_key: self.openai_api_key.clone(),
                base_url: self.openai_base_url.clone(),
                model: self.embedding_model.clone(),
                dimensions: self.embedding_dimensions,
                timeout: self.embedding_timeout_secs.map(Duration::from_secs),
            },
            search,
            ingest: IngestOptions {
                embedding_concurrency: self.embedding_concurrency.max(1),
            },
            supabase,
        })
    }
}

/// The two entry points of the core, wired to their backends.
pub struct Services {
    pub pipeline: IngestionPipeline<DynObjectStore, DynDocumentStore, DynEmbedder>,
    pub search: SimilaritySearch<DynDocumentStore, DynEmbedder>,
}

impl Services {
    pub fn new(
        storage: DynObjectStore,
        store: DynDocumentStore,
        embedder: DynEmbedder,
        config: &Config,
    ) -> Self {
        Self {
            pipeline: IngestionPipeline::new(
                storage,
                store.clone(),
                embedder.clone(),
                config.ingest,
            ),
            search: SimilaritySearch::new(store, embedder, config.search),
        }
    }

    pub async fn from_settings(settings: &Settings, config: &Config) -> anyhow::Result<Self> {
        let embedder: DynEmbedder = match settings.embedding_provider {
            EmbeddingProvider::OpenAi => Arc::new(
                OpenAiEmbedder::new(&config.embedding)
                    .context("failed to build embedding client")?,
            ),
            EmbeddingProvider::Ngram => Arc::new(CharacterNgramEmbedder {
                dimensions: config.embedding.dimensions,
            }),
        };

        let (storage, store): (DynObjectStore, DynDocumentStore) = match &config.supabase {
            Some(supabase) => {
                info!(url = %supabase.url, bucket = %supabase.bucket, "using supabase backends");
                let storage: DynObjectStore = Arc::new(SupabaseStorage::new(supabase));
                let store: DynDocumentStore = Arc::new(SupabaseDocumentStore::new(supabase));
                (storage, store)
            }
            None => {
                info!(data_dir = %settings.data_dir.display(), "using local backends");
                let snapshot = settings.data_dir.join("documents.json");
                let store = MemoryDocumentStore::open(&snapshot)
                    .await
                    .with_context(|| format!("failed to load {}", snapshot.display()))?;
                let storage: DynObjectStore =
                    Arc::new(FsObjectStore::new(settings.data_dir.join("objects")));
                let store: DynDocumentStore = Arc::new(store);
                (storage, store)
            }
        };

        info!(model = embedder.model(), dimensions = embedder.dimensions(), "embedding provider ready");
        Ok(Self::new(storage, store, embedder, config))
    }
}
