use crate::config::SupabaseConfig;
use crate::models::{Document, NewDocument, SearchResult};
use crate::search::{rank_candidates, ScoredPage};
use crate::traits::{DocumentStore, ObjectStore};
use crate::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{json, Value};
use url::Url;

fn authorized(request: RequestBuilder, key: &str) -> RequestBuilder {
    request.header("apikey", key).bearer_auth(key)
}

async fn check(response: Response, backend: &str) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let details = response.text().await.unwrap_or_default();
    Err(StoreError::BackendResponse {
        backend: backend.to_string(),
        status: status.as_u16(),
        details,
    })
}

fn base_url(config: &SupabaseConfig) -> String {
    config.url.trim_end_matches('/').to_string()
}

fn malformed(details: impl Into<String>) -> StoreError {
    StoreError::BackendResponse {
        backend: "supabase-db".to_string(),
        status: 200,
        details: details.into(),
    }
}

/// Reads one `match_pages` row. Identity, page number and score are required.
fn parse_match_row(row: &Value) -> Result<SearchResult, StoreError> {
    let document_id = match row.pointer("/document_id").or_else(|| row.pointer("/id")) {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => return Err(malformed(format!("match row without document id: {row}"))),
    };
    let page_number = row
        .pointer("/page_number")
        .and_then(Value::as_u64)
        .and_then(|number| u32::try_from(number).ok())
        .filter(|number| *number >= 1)
        .ok_or_else(|| malformed(format!("match row with invalid page_number: {row}")))?;
    let similarity = row
        .pointer("/similarity")
        .and_then(Value::as_f64)
        .ok_or_else(|| malformed(format!("match row without similarity: {row}")))?;

    Ok(SearchResult {
        document_id,
        document_title: row
            .pointer("/title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        page_number,
        text: row
            .pointer("/text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        similarity,
    })
}

pub struct SupabaseStorage {
    client: Client,
    base_url: String,
    bucket: String,
    service_key: String,
}

impl SupabaseStorage {
    pub fn new(config: &SupabaseConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url(config),
            bucket: config.bucket.clone(),
            service_key: config.service_key.clone(),
        }
    }

    /// Object URL with every path segment percent-encoded, so `#` or `?` in a
    /// file name stays part of the key.
    fn object_url(&self, path: &str) -> Result<Url, StoreError> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(["storage", "v1", "object", self.bucket.as_str()])
            .extend(path.split('/'));
        Ok(url)
    }
}

#[async_trait]
impl ObjectStore for SupabaseStorage {
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let url = self.object_url(path)?;

        let response = authorized(self.client.post(url), &self.service_key)
            .header("content-type", "application/pdf")
            .header("x-upsert", "true")
            .body(bytes.to_vec())
            .send()
            .await?;

        check(response, "supabase-storage").await?;
        Ok(())
    }
}

pub struct SupabaseDocumentStore {
    client: Client,
    base_url: String,
    service_key: String,
    table: String,
    match_function: String,
}

impl SupabaseDocumentStore {
    pub fn new(config: &SupabaseConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url(config),
            service_key: config.service_key.clone(),
            table: config.documents_table.clone(),
            match_function: config.match_function.clone(),
        }
    }
}

#[async_trait]
impl DocumentStore for SupabaseDocumentStore {
    async fn insert_document(&self, document: &NewDocument) -> Result<Document, StoreError> {
        let url = Url::parse(&format!("{}/rest/v1/{}", self.base_url, self.table))?;

        let response = authorized(self.client.post(url), &self.service_key)
            .header("Prefer", "return=representation")
            .json(document)
            .send()
            .await?;
        let parsed: Value = check(response, "supabase-db").await?.json().await?;

        let row = parsed
            .as_array()
            .and_then(|rows| rows.first())
            .cloned()
            .unwrap_or(parsed);
        let id = match row.pointer("/id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => return Err(malformed("insert response carried no document id")),
        };
        let created_at = row
            .pointer("/created_at")
            .and_then(Value::as_str)
            .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
            .map(|value| value.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        Ok(Document {
            id,
            title: document.title.clone(),
            storage_path: document.storage_path.clone(),
            created_at,
            pages: document.pages.clone(),
        })
    }

    /// The RPC does the cosine scoring. Returned rows are re-ranked locally;
    /// the document-order tie-break falls back to the RPC's row order.
    async fn nearest_neighbors(
        &self,
        query_vector: &[f32],
        threshold: f64,
        limit: usize,
    ) -> Result<Vec<SearchResult>, StoreError> {
        let url = Url::parse(&format!(
            "{}/rest/v1/rpc/{}",
            self.base_url, self.match_function
        ))?;

        let response = authorized(self.client.post(url), &self.service_key)
            .json(&json!({
                "query_embedding": query_vector,
                "match_threshold": threshold,
                "match_count": limit,
            }))
            .send()
            .await?;
        let parsed: Value = check(response, "supabase-db").await?.json().await?;

        let rows = parsed
            .as_array()
            .ok_or_else(|| malformed(format!("match response is not a row array: {parsed}")))?;
        let candidates = rows
            .iter()
            .enumerate()
            .map(|(order, row)| {
                parse_match_row(row).map(|result| ScoredPage {
                    result,
                    document_order: order as u64,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rank_candidates(candidates, threshold, limit))
    }
}
