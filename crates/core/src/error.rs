use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("cannot embed empty text")]
    EmptyInput,

    #[error("embedding provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("embedding provider returned no vectors")]
    EmptyResponse,

    #[error("embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid response from {backend} ({status}): {details}")]
    BackendResponse {
        backend: String,
        status: u16,
        details: String,
    },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored vector has {actual} dimensions, query has {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid argument: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(#[source] StoreError),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("persistence error: {0}")]
    Persistence(#[source] StoreError),
}

impl IngestError {
    /// True for failures caused by the caller's input rather than a backend.
    pub fn is_validation(&self) -> bool {
        matches!(self, IngestError::Validation(_))
    }
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid argument: {0}")]
    Validation(String),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("persistence error: {0}")]
    Persistence(#[source] StoreError),

    #[error("stored vector has {actual} dimensions, query has {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl SearchError {
    pub fn is_validation(&self) -> bool {
        matches!(self, SearchError::Validation(_))
    }
}

impl From<StoreError> for SearchError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::DimensionMismatch { expected, actual } => {
                SearchError::DimensionMismatch { expected, actual }
            }
            other => SearchError::Persistence(other),
        }
    }
}
