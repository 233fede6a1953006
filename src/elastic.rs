//! # Elasticsearch Store ([`ElasticStore`]) - Production [`DocumentStore`] backend.
//!
//! The statement store speaks the Elasticsearch JSON API over plain HTTP, so the client
//! here is the familiar [`reqwest`] + [`reqwest-middleware`] stack: a connection and
//! request timeout on the underlying client, and retry middleware with exponential
//! backoff for the transient failures a long bulk load will inevitably hit.
//!
//! ## Client construction
//!
//! ```rust,no_run
//! use gleif_bods::config::PipelineConfig;
//! use gleif_bods::elastic::ElasticStore;
//!
//! let config = PipelineConfig::from_env();
//! let store = ElasticStore::new(&config).expect("store client");
//! ```
//!
//! Only the operations in [`DocumentStore`](crate::store::DocumentStore) are exposed:
//! per-document get/create/put/delete, `_bulk` with per-action outcomes, and a scroll
//! based full-index scan. Everything else about the cluster (mappings, shard counts,
//! lifecycle) is deployment concern, handled outside the pipeline except for
//! [`ElasticStore::ensure_index`], which idempotently creates missing indexes at
//! stage start.

use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde_json::{Value, json};
use std::time::Duration;
use url::Url;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result, StoreResponse};
use crate::store::{BulkAction, BulkOutcome, DocumentStore};

/// Overall request timeout against the store.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Connection timeout against the store.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Retry budget for transient failures.
const MAX_RETRIES: u32 = 10;
/// Page size for scroll-based scans.
const SCROLL_PAGE_SIZE: usize = 1000;
/// How long the server keeps a scroll cursor alive between pages.
const SCROLL_KEEPALIVE: &str = "5m";

/// A [`DocumentStore`] backed by an Elasticsearch-compatible HTTP API.
#[derive(Clone, Debug)]
pub struct ElasticStore {
    client: ClientWithMiddleware,
    base_url: Url,
    password: Option<String>,
}

impl ElasticStore {
    /// Builds a store client for the configured location, with timeouts and a bounded
    /// exponential-backoff retry budget.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError`] if the underlying HTTP client cannot be constructed
    /// or the configured URL is invalid.
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let reqwest_client = ReqwestClient::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(MAX_RETRIES);
        let client = ClientBuilder::new(reqwest_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();
        // A trailing slash keeps Url::join from swallowing the last path segment.
        let base_url = Url::parse(&format!("{}/", config.elasticsearch_url()))?;
        Ok(Self {
            client,
            base_url,
            password: config.elasticsearch_password.clone(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> Result<RequestBuilder> {
        let url = self.base_url.join(path)?;
        let mut request = self.client.request(method, url);
        if let Some(password) = &self.password {
            request = request.basic_auth("elastic", Some(password));
        }
        Ok(request)
    }

    async fn read_error(response: reqwest::Response) -> PipelineError {
        let status = response.status();
        let content = response.text().await.unwrap_or_default();
        PipelineError::StoreError(StoreResponse { status, content })
    }

    /// Creates an index if it does not exist yet. An already-existing index is not an
    /// error, so every stage can call this unconditionally at start-up.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError`] on connection failure or an unexpected store response.
    pub async fn ensure_index(&self, index: &str) -> Result<()> {
        let response = self
            .request(reqwest::Method::PUT, index)?
            .json(&json!({
                "settings": {"number_of_shards": 1, "number_of_replicas": 0}
            }))
            .send()
            .await?;
        if response.status().is_success() || response.status() == StatusCode::BAD_REQUEST {
            return Ok(());
        }
        Err(Self::read_error(response).await)
    }
}

#[async_trait]
impl DocumentStore for ElasticStore {
    async fn get(&self, index: &str, id: &str) -> Result<Option<Value>> {
        let response = self
            .request(reqwest::Method::GET, &format!("{index}/_doc/{id}"))?
            .send()
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let mut body: Value = response.json().await?;
                Ok(Some(body["_source"].take()))
            }
            _ => Err(Self::read_error(response).await),
        }
    }

    async fn create(&self, index: &str, id: &str, doc: &Value) -> Result<bool> {
        let response = self
            .request(reqwest::Method::PUT, &format!("{index}/_create/{id}"))?
            .json(doc)
            .send()
            .await?;
        match response.status() {
            StatusCode::CONFLICT => Ok(false),
            status if status.is_success() => Ok(true),
            _ => Err(Self::read_error(response).await),
        }
    }

    async fn put(&self, index: &str, id: &str, doc: &Value) -> Result<()> {
        let response = self
            .request(reqwest::Method::PUT, &format!("{index}/_doc/{id}"))?
            .json(doc)
            .send()
            .await?;
        if response.status().is_success() {
            return Ok(());
        }
        Err(Self::read_error(response).await)
    }

    async fn delete(&self, index: &str, id: &str) -> Result<()> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("{index}/_doc/{id}"))?
            .send()
            .await?;
        if response.status().is_success() || response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Err(Self::read_error(response).await)
    }

    async fn bulk(&self, index: &str, actions: Vec<BulkAction>) -> Result<Vec<BulkOutcome>> {
        if actions.is_empty() {
            return Ok(Vec::new());
        }
        let mut body = String::new();
        for action in &actions {
            let (op, doc) = match action {
                BulkAction::Create { id, doc } => {
                    (json!({"create": {"_index": index, "_id": id}}), Some(doc))
                }
                BulkAction::Index { id, doc } => {
                    (json!({"index": {"_index": index, "_id": id}}), Some(doc))
                }
                BulkAction::Delete { id } => {
                    (json!({"delete": {"_index": index, "_id": id}}), None)
                }
            };
            body.push_str(&op.to_string());
            body.push('\n');
            if let Some(doc) = doc {
                body.push_str(&doc.to_string());
                body.push('\n');
            }
        }
        let response = self
            .request(reqwest::Method::POST, "_bulk")?
            .header("content-type", "application/x-ndjson")
            .body(body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }
        let result: Value = response.json().await?;
        let items = result["items"].as_array().cloned().unwrap_or_default();
        let mut outcomes = Vec::with_capacity(actions.len());
        for (action, item) in actions.iter().zip(items) {
            let detail = item
                .as_object()
                .and_then(|ops| ops.values().next())
                .cloned()
                .unwrap_or_default();
            let status = detail["status"].as_u64().unwrap_or(0);
            outcomes.push(BulkOutcome {
                id: action.id().to_owned(),
                applied: (200..300).contains(&status),
            });
        }
        Ok(outcomes)
    }

    async fn scan(&self, index: &str) -> Result<Vec<Value>> {
        let mut docs = Vec::new();
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("{index}/_search?scroll={SCROLL_KEEPALIVE}"),
            )?
            .json(&json!({"size": SCROLL_PAGE_SIZE, "query": {"match_all": {}}}))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(docs);
        }
        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }
        let mut page: Value = response.json().await?;
        loop {
            let hits = page["hits"]["hits"].as_array().cloned().unwrap_or_default();
            if hits.is_empty() {
                break;
            }
            for mut hit in hits {
                docs.push(hit["_source"].take());
            }
            let Some(scroll_id) = page["_scroll_id"].as_str().map(str::to_owned) else {
                break;
            };
            let response = self
                .request(reqwest::Method::POST, "_search/scroll")?
                .json(&json!({"scroll": SCROLL_KEEPALIVE, "scroll_id": scroll_id}))
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(Self::read_error(response).await);
            }
            page = response.json().await?;
        }
        Ok(docs)
    }
}
