pub mod server;
pub mod settings;

pub use server::{router, run_server, AppState, DEFAULT_MAX_UPLOAD_BYTES};
pub use settings::{EmbeddingProvider, Services, Settings};
