use crate::embeddings::Embedder;
use crate::extractor::PageText;
use crate::models::{Page, PageFailure};
use futures_util::stream::{self, StreamExt};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct PageOutcome {
    pub page: Page,
    pub failure: Option<PageFailure>,
}

/// Turns extracted page text into page records. Embedding failures are
/// recorded and downgraded to a page without an embedding.
pub struct PageRecordBuilder<'a, E: ?Sized> {
    embedder: &'a E,
}

impl<'a, E> PageRecordBuilder<'a, E>
where
    E: Embedder + ?Sized,
{
    pub fn new(embedder: &'a E) -> Self {
        Self { embedder }
    }

    pub async fn build(&self, page_number: u32, text: String) -> PageOutcome {
        if text.trim().is_empty() {
            debug!(page_number, "blank page, skipping embedding");
            return PageOutcome {
                page: Page {
                    page_number,
                    text,
                    embedding: None,
                },
                failure: None,
            };
        }

        match self.embedder.embed(&text).await {
            Ok(embedding) => PageOutcome {
                page: Page {
                    page_number,
                    text,
                    embedding: Some(embedding),
                },
                failure: None,
            },
            Err(error) => {
                warn!(page_number, error = %error, "embedding failed, storing page without vector");
                PageOutcome {
                    page: Page {
                        page_number,
                        text,
                        embedding: None,
                    },
                    failure: Some(PageFailure {
                        page_number,
                        reason: error.to_string(),
                    }),
                }
            }
        }
    }

    /// Builds every page with at most `concurrency` embedding calls in
    /// flight. Output keeps the input order.
    pub async fn build_all(
        &self,
        pages: Vec<PageText>,
        concurrency: usize,
    ) -> (Vec<Page>, Vec<PageFailure>) {
        let outcomes: Vec<PageOutcome> = stream::iter(pages)
            .map(|page| self.build(page.number, page.text))
            .buffered(concurrency.max(1))
            .collect()
            .await;

        outcomes.into_iter().fold(
            (Vec::new(), Vec::new()),
            |(mut pages, mut failures), outcome| {
                pages.push(outcome.page);
                failures.extend(outcome.failure);
                (pages, failures)
            },
        )
    }
}
