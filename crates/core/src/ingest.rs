use crate::embeddings::Embedder;
use crate::extractor::{LopdfExtractor, PdfExtractor};
use crate::models::{IngestOptions, IngestRequest, IngestionReport, NewDocument};
use crate::pages::PageRecordBuilder;
use crate::traits::{DocumentStore, ObjectStore};
use crate::IngestError;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// `pdfs/{unix_millis}-{file_name}`. Only the last component of the hint is
/// kept; a missing hint becomes `upload-{unix_millis}.pdf`.
pub fn storage_path(now: DateTime<Utc>, file_name: Option<&str>) -> String {
    let millis = now.timestamp_millis();
    let name = file_name
        .and_then(|hint| hint.rsplit(['/', '\\']).next())
        .map(str::trim)
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .map(str::to_string)
        .unwrap_or_else(|| format!("upload-{millis}.pdf"));

    format!("pdfs/{millis}-{name}")
}

pub struct IngestionPipeline<S, D, E, X = LopdfExtractor> {
    storage: S,
    store: D,
    embedder: E,
    extractor: X,
    options: IngestOptions,
}

impl<S, D, E> IngestionPipeline<S, D, E, LopdfExtractor> {
    pub fn new(storage: S, store: D, embedder: E, options: IngestOptions) -> Self {
        Self {
            storage,
            store,
            embedder,
            extractor: LopdfExtractor,
            options,
        }
    }
}

impl<S, D, E, X> IngestionPipeline<S, D, E, X> {
    pub fn with_extractor<Y>(self, extractor: Y) -> IngestionPipeline<S, D, E, Y> {
        IngestionPipeline {
            storage: self.storage,
            store: self.store,
            embedder: self.embedder,
            extractor,
            options: self.options,
        }
    }
}

impl<S, D, E, X> IngestionPipeline<S, D, E, X>
where
    S: ObjectStore,
    D: DocumentStore,
    E: Embedder,
    X: PdfExtractor + Clone + Send + 'static,
{
    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestionReport, IngestError> {
        let IngestRequest {
            bytes,
            title,
            file_name,
        } = request;

        if title.trim().is_empty() {
            return Err(IngestError::Validation("missing title".to_string()));
        }
        if bytes.is_empty() {
            return Err(IngestError::Validation("missing file".to_string()));
        }

        let checksum = digest_bytes(&bytes);
        let storage_path = storage_path(Utc::now(), file_name.as_deref());

        self.storage
            .put(&storage_path, &bytes)
            .await
            .map_err(IngestError::Storage)?;
        info!(%storage_path, bytes = bytes.len(), %checksum, "stored upload");

        let extractor = self.extractor.clone();
        let extracted = tokio::task::spawn_blocking(move || extractor.extract_pages(&bytes))
            .await
            .unwrap_or_else(|error| {
                Err(IngestError::PdfParse(format!(
                    "extraction task failed: {error}"
                )))
            });
        let page_texts = match extracted {
            Ok(pages) => pages,
            Err(error) => {
                warn!(%storage_path, error = %error, "extraction failed, stored upload is unreferenced");
                return Err(error);
            }
        };

        let builder = PageRecordBuilder::new(&self.embedder);
        let (pages, failures) = builder
            .build_all(page_texts, self.options.embedding_concurrency)
            .await;

        let new_document = NewDocument {
            title,
            storage_path,
            pages,
        };
        let document = match self.store.insert_document(&new_document).await {
            Ok(document) => document,
            Err(error) => {
                warn!(storage_path = %new_document.storage_path, error = %error, "document insert failed, stored upload is unreferenced");
                return Err(IngestError::Persistence(error));
            }
        };

        info!(
            document_id = %document.id,
            pages = document.pages.len(),
            embedded = document.embedded_pages(),
            failed = failures.len(),
            "document ingested"
        );

        Ok(IngestionReport {
            document,
            failures,
            checksum,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::PageText;
    use crate::models::SearchOptions;
    use crate::search::SimilaritySearch;
    use crate::stores::{MemoryDocumentStore, MemoryObjectStore};
    use crate::test_pdf::pdf_with_pages;
    use crate::test_support::{FailingDocumentStore, FailingObjectStore, ScriptedEmbedder};
    use crate::CharacterNgramEmbedder;
    use chrono::TimeZone;
    use std::fs::{self, File};
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[derive(Clone)]
    struct BrokenExtractor;

    impl PdfExtractor for BrokenExtractor {
        fn extract_pages(&self, _bytes: &[u8]) -> Result<Vec<PageText>, IngestError> {
            Err(IngestError::PdfParse("unsupported xref stream".to_string()))
        }
    }

    fn request(bytes: Vec<u8>, title: &str) -> IngestRequest {
        IngestRequest {
            bytes,
            title: title.to_string(),
            file_name: Some("manual.pdf".to_string()),
        }
    }

    fn local_pipeline<E: Embedder>(
        embedder: E,
    ) -> (
        Arc<MemoryObjectStore>,
        Arc<MemoryDocumentStore>,
        IngestionPipeline<Arc<MemoryObjectStore>, Arc<MemoryDocumentStore>, E>,
    ) {
        let storage = Arc::new(MemoryObjectStore::new());
        let store = Arc::new(MemoryDocumentStore::new());
        let pipeline = IngestionPipeline::new(
            storage.clone(),
            store.clone(),
            embedder,
            IngestOptions::default(),
        );
        (storage, store, pipeline)
    }

    #[test]
    fn storage_path_uses_timestamp_and_file_name() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(
            storage_path(now, Some("manual.pdf")),
            "pdfs/1700000000123-manual.pdf"
        );
        assert_eq!(
            storage_path(now, Some("C:\\docs\\../data sheet.pdf")),
            "pdfs/1700000000123-data sheet.pdf"
        );
        assert_eq!(
            storage_path(now, None),
            "pdfs/1700000000123-upload-1700000000123.pdf"
        );
        assert_eq!(
            storage_path(now, Some("uploads/")),
            "pdfs/1700000000123-upload-1700000000123.pdf"
        );
    }

    #[test]
    fn discover_pdf_files_is_recursive() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let base = dir.path();
        let nested = base.join("nested");
        fs::create_dir(&nested)?;

        File::create(base.join("a.pdf")).and_then(|mut file| file.write_all(b"%PDF-1.4\n%fake"))?;
        File::create(nested.join("b.PDF"))
            .and_then(|mut file| file.write_all(b"%PDF-1.4\n%fake"))?;
        File::create(base.join("notes.txt"))?;

        let files = discover_pdf_files(base);
        assert_eq!(files.len(), 2);
        Ok(())
    }

    #[test]
    fn checksum_is_reproducible() {
        assert_eq!(digest_bytes(b"abc"), digest_bytes(b"abc"));
        assert_ne!(digest_bytes(b"abc"), digest_bytes(b"abd"));
    }

    #[tokio::test]
    async fn single_page_document_is_searchable() -> Result<(), Box<dyn std::error::Error>> {
        let embedder = CharacterNgramEmbedder::default();
        let (storage, store, pipeline) = local_pipeline(embedder);

        let report = pipeline
            .ingest(request(pdf_with_pages(&[&["Hello world"]]), "Greeting"))
            .await?;

        let document = &report.document;
        assert_eq!(document.pages.len(), 1);
        assert_eq!(document.pages[0].page_number, 1);
        assert_eq!(document.pages[0].text, "Hello world");
        assert_eq!(
            document.pages[0].embedding.as_ref().map(Vec::len),
            Some(1536)
        );
        assert!(report.failures.is_empty());
        assert_eq!(storage.paths().await, vec![document.storage_path.clone()]);

        let search = SimilaritySearch::new(store, embedder, SearchOptions::default());
        let options = SearchOptions {
            threshold: 0.0,
            limit: 10,
        };
        let results = search.search("Hello", &options).await?;
        let hit = results
            .iter()
            .find(|hit| hit.document_id == document.id && hit.page_number == 1)
            .expect("ingested page is returned");
        assert!(hit.similarity > 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn blank_page_is_stored_without_embedding() -> Result<(), Box<dyn std::error::Error>> {
        let embedder = Arc::new(ScriptedEmbedder::new(1536));
        let (_storage, _store, pipeline) = local_pipeline(embedder.clone());

        let report = pipeline
            .ingest(request(pdf_with_pages(&[&["Hello world"], &[]]), "Two pages"))
            .await?;

        let pages = &report.document.pages;
        assert_eq!(pages.len(), 2);
        assert!(pages[0].embedding.is_some());
        assert!(pages[1].embedding.is_none());
        assert!(report.failures.is_empty());
        assert_eq!(embedder.calls(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn pages_are_numbered_contiguously() -> Result<(), Box<dyn std::error::Error>> {
        let (_storage, _store, pipeline) = local_pipeline(CharacterNgramEmbedder::default());
        let texts: Vec<String> = (1..=6).map(|n| format!("Section {n} body")).collect();
        let pages: Vec<Vec<&str>> = texts.iter().map(|text| vec![text.as_str()]).collect();
        let page_refs: Vec<&[&str]> = pages.iter().map(Vec::as_slice).collect();

        let report = pipeline
            .ingest(request(pdf_with_pages(&page_refs), "Six pages"))
            .await?;

        let numbers: Vec<u32> = report
            .document
            .pages
            .iter()
            .map(|page| page.page_number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(report.document.pages[3].text, "Section 4 body");
        Ok(())
    }

    #[tokio::test]
    async fn one_failed_embedding_does_not_abort_ingestion(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let embedder = ScriptedEmbedder::new(64).failing_on("second");
        let (_storage, store, pipeline) = local_pipeline(embedder);

        let report = pipeline
            .ingest(request(
                pdf_with_pages(&[&["first page"], &["second page"], &["third page"]]),
                "Partial",
            ))
            .await?;

        let pages = &report.document.pages;
        assert!(pages[0].embedding.is_some());
        assert!(pages[1].embedding.is_none());
        assert!(pages[2].embedding.is_some());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].page_number, 2);
        assert_eq!(store.documents().await.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn zero_page_pdf_is_accepted() -> Result<(), Box<dyn std::error::Error>> {
        let (_storage, _store, pipeline) = local_pipeline(CharacterNgramEmbedder::default());

        let report = pipeline.ingest(request(pdf_with_pages(&[]), "Empty")).await?;

        assert!(report.document.pages.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn missing_title_fails_before_storage() {
        let (storage, store, pipeline) = local_pipeline(CharacterNgramEmbedder::default());

        let error = pipeline
            .ingest(request(pdf_with_pages(&[&["Hello"]]), "  "))
            .await
            .unwrap_err();

        assert!(error.is_validation());
        assert!(storage.paths().await.is_empty());
        assert!(store.documents().await.is_empty());
    }

    #[tokio::test]
    async fn missing_file_fails_before_storage() {
        let (storage, _store, pipeline) = local_pipeline(CharacterNgramEmbedder::default());

        let error = pipeline
            .ingest(request(Vec::new(), "Title"))
            .await
            .unwrap_err();

        assert!(error.is_validation());
        assert!(storage.paths().await.is_empty());
    }

    #[tokio::test]
    async fn parse_failure_leaves_upload_but_no_document() {
        let (storage, store, pipeline) = local_pipeline(CharacterNgramEmbedder::default());

        let error = pipeline
            .ingest(request(b"%PDF-1.4\n%broken".to_vec(), "Broken"))
            .await
            .unwrap_err();

        assert!(matches!(error, IngestError::PdfParse(_)));
        assert_eq!(storage.paths().await.len(), 1);
        assert!(store.documents().await.is_empty());
    }

    #[tokio::test]
    async fn custom_extractor_failure_is_fatal() {
        let (storage, store, pipeline) = local_pipeline(CharacterNgramEmbedder::default());
        let pipeline = pipeline.with_extractor(BrokenExtractor);

        let error = pipeline
            .ingest(request(pdf_with_pages(&[&["Hello"]]), "Broken"))
            .await
            .unwrap_err();

        assert!(error.to_string().contains("unsupported xref stream"));
        assert_eq!(storage.paths().await.len(), 1);
        assert!(store.documents().await.is_empty());
    }

    #[tokio::test]
    async fn storage_failure_aborts_before_extraction() {
        let store = Arc::new(MemoryDocumentStore::new());
        let embedder = Arc::new(ScriptedEmbedder::new(8));
        let pipeline = IngestionPipeline::new(
            FailingObjectStore,
            store.clone(),
            embedder.clone(),
            IngestOptions::default(),
        );

        let error = pipeline
            .ingest(request(pdf_with_pages(&[&["Hello"]]), "Title"))
            .await
            .unwrap_err();

        assert!(matches!(error, IngestError::Storage(_)));
        assert!(error.to_string().contains("disk full"));
        assert_eq!(embedder.calls(), 0);
        assert!(store.documents().await.is_empty());
    }

    #[tokio::test]
    async fn persistence_failure_is_reported() {
        let storage = Arc::new(MemoryObjectStore::new());
        let pipeline = IngestionPipeline::new(
            storage.clone(),
            FailingDocumentStore,
            CharacterNgramEmbedder::default(),
            IngestOptions::default(),
        );

        let error = pipeline
            .ingest(request(pdf_with_pages(&[&["Hello"]]), "Title"))
            .await
            .unwrap_err();

        assert!(matches!(error, IngestError::Persistence(_)));
        assert_eq!(storage.paths().await.len(), 1);
    }
}
