//! Firestore REST API client.
//!
//! Thin typed layer over the v1 documents endpoints with:
//! - Cached service-account tokens, or the emulator's fixed token
//! - HTTP client tuning (pooling, timeouts)
//! - Retried reads with exponential backoff and jitter
//! - Tracing spans and request metrics

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, info_span, Instrument};

use crate::error::{FirestoreError, FirestoreResult};
use crate::metrics::{record_documents_read, record_request};
use crate::retry::RetryConfig;
use crate::token_cache::AccessTokens;
use crate::types::{
    Document, ListDocumentsResponse, RunAggregationQueryRequest, RunAggregationQueryResponse, RunQueryRequest,
    RunQueryResponse, StructuredQuery, Value, COUNT_ALIAS,
};

/// Page size used when walking a whole collection.
const LIST_PAGE_SIZE: u32 = 300;

/// Firestore client configuration.
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    /// GCP project ID
    pub project_id: String,
    /// Database ID (usually "(default)")
    pub database_id: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Retry configuration for reads
    pub retry: RetryConfig,
    /// `host:port` of a Firestore emulator; disables service-account auth
    pub emulator_host: Option<String>,
}

impl FirestoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> FirestoreResult<Self> {
        let project_id = std::env::var("GCP_PROJECT_ID")
            .or_else(|_| std::env::var("FIREBASE_PROJECT_ID"))
            .map_err(|_| {
                FirestoreError::auth_error(
                    "GCP_PROJECT_ID or FIREBASE_PROJECT_ID must be set to access Firestore",
                )
            })?;

        if project_id.is_empty() {
            return Err(FirestoreError::auth_error(
                "GCP_PROJECT_ID or FIREBASE_PROJECT_ID cannot be empty",
            ));
        }

        let connect_timeout_secs: u64 = std::env::var("FIRESTORE_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Ok(Self {
            project_id,
            database_id: std::env::var("FIRESTORE_DATABASE_ID")
                .unwrap_or_else(|_| "(default)".to_string()),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            retry: RetryConfig::from_env(),
            emulator_host: std::env::var("FIRESTORE_EMULATOR_HOST")
                .ok()
                .filter(|h| !h.is_empty()),
        })
    }

    fn documents_url(&self) -> String {
        match &self.emulator_host {
            Some(host) => format!(
                "http://{}/v1/projects/{}/databases/{}/documents",
                host, self.project_id, self.database_id
            ),
            None => format!(
                "https://firestore.googleapis.com/v1/projects/{}/databases/{}/documents",
                self.project_id, self.database_id
            ),
        }
    }
}

/// Firestore REST API client.
#[derive(Clone)]
pub struct FirestoreClient {
    http: Client,
    config: FirestoreConfig,
    base_url: String,
    tokens: Arc<AccessTokens>,
}

impl FirestoreClient {
    /// Create a new Firestore client.
    pub async fn new(config: FirestoreConfig) -> FirestoreResult<Self> {
        let tokens = if config.emulator_host.is_some() {
            AccessTokens::emulator()
        } else {
            AccessTokens::from_provider(Self::create_auth_provider()?)
        };

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("vision-firestore/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FirestoreError::Network)?;

        Ok(Self {
            http,
            base_url: config.documents_url(),
            config,
            tokens: Arc::new(tokens),
        })
    }

    fn create_auth_provider() -> FirestoreResult<Arc<dyn TokenProvider>> {
        let service_account = CustomServiceAccount::from_env().map_err(|e| {
            FirestoreError::auth_error(format!("Failed to load service account: {}", e))
        })?;

        match service_account {
            Some(sa) => Ok(Arc::new(sa)),
            None => Err(FirestoreError::auth_error(
                "GOOGLE_APPLICATION_CREDENTIALS not set. \
                 Set it to the path of your service account JSON file.",
            )),
        }
    }

    /// Create from environment variables.
    pub async fn from_env() -> FirestoreResult<Self> {
        Self::new(FirestoreConfig::from_env()?).await
    }

    pub fn config(&self) -> &FirestoreConfig {
        &self.config
    }

    fn document_path(&self, collection: &str, doc_id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            collection,
            urlencoding::encode(doc_id)
        )
    }

    // =========================================================================
    // Document Operations
    // =========================================================================

    /// Get a document, `None` if it does not exist.
    pub async fn get_document(
        &self,
        collection: &str,
        doc_id: &str,
    ) -> FirestoreResult<Option<Document>> {
        let url = self.document_path(collection, doc_id);
        let url = url.as_str();

        self.with_retry("get_document", move || {
            self.execute_request("get_document", collection, Some(doc_id), async move {
                let response = self.send_authorized(|token| self.http.get(url).bearer_auth(token)).await?;
                match response.status() {
                    StatusCode::OK => Ok(Some(response.json::<Document>().await?)),
                    StatusCode::NOT_FOUND => Ok(None),
                    status => Err(Self::handle_error_response(status, url, response).await),
                }
            })
        })
        .await
    }

    /// Patch the masked fields of an existing document.
    ///
    /// Masked fields absent from `fields` are removed. Fails with `NotFound`
    /// instead of creating the document.
    pub async fn update_existing_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
        update_mask: &[&str],
    ) -> FirestoreResult<Document> {
        let mut params: Vec<String> = update_mask
            .iter()
            .map(|f| format!("updateMask.fieldPaths={}", urlencoding::encode(f)))
            .collect();
        params.push("currentDocument.exists=true".to_string());
        let url = format!("{}?{}", self.document_path(collection, doc_id), params.join("&"));
        let body = Document::new(fields);

        self.execute_request("update_document", collection, Some(doc_id), async {
            let response = self
                .send_authorized(|token| self.http.patch(&url).bearer_auth(token).json(&body))
                .await?;
            match response.status() {
                StatusCode::OK => Ok(response.json::<Document>().await?),
                StatusCode::NOT_FOUND => Err(FirestoreError::not_found(format!("{}/{}", collection, doc_id))),
                status => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Delete a document. Returns `false` if it did not exist.
    pub async fn delete_document(&self, collection: &str, doc_id: &str) -> FirestoreResult<bool> {
        let url = format!(
            "{}?currentDocument.exists=true",
            self.document_path(collection, doc_id)
        );

        self.execute_request("delete_document", collection, Some(doc_id), async {
            let response = self.send_authorized(|token| self.http.delete(&url).bearer_auth(token)).await?;
            match response.status() {
                StatusCode::OK | StatusCode::NO_CONTENT => Ok(true),
                StatusCode::NOT_FOUND => {
                    debug!("Document {}/{} already absent", collection, doc_id);
                    Ok(false)
                }
                status => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    /// List one page of a collection.
    pub async fn list_documents(
        &self,
        collection: &str,
        page_size: Option<u32>,
        page_token: Option<&str>,
    ) -> FirestoreResult<ListDocumentsResponse> {
        let mut url = format!("{}/{}", self.base_url, collection);
        let mut params = Vec::new();
        if let Some(size) = page_size {
            params.push(format!("pageSize={}", size));
        }
        if let Some(token) = page_token {
            params.push(format!("pageToken={}", urlencoding::encode(token)));
        }
        if !params.is_empty() {
            url = format!("{}?{}", url, params.join("&"));
        }
        let url = url.as_str();

        self.with_retry("list_documents", move || {
            self.execute_request("list_documents", collection, None, async move {
                let response = self.send_authorized(|token| self.http.get(url).bearer_auth(token)).await?;
                match response.status() {
                    StatusCode::OK => {
                        let list: ListDocumentsResponse = response.json().await?;
                        record_documents_read(collection, list.documents.as_ref().map_or(0, Vec::len));
                        Ok(list)
                    }
                    status => Err(Self::handle_error_response(status, url, response).await),
                }
            })
        })
        .await
    }

    /// List every document of a collection, following page tokens.
    pub async fn list_all_documents(&self, collection: &str) -> FirestoreResult<Vec<Document>> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .list_documents(collection, Some(LIST_PAGE_SIZE), page_token.as_deref())
                .await?;
            documents.extend(page.documents.unwrap_or_default());

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(documents)
    }

    /// Run a structured query against the root collections.
    pub async fn run_query(&self, query: StructuredQuery) -> FirestoreResult<Vec<Document>> {
        let url = format!("{}:runQuery", self.base_url);
        let url = url.as_str();
        let collection = query
            .from
            .first()
            .map(|c| c.collection_id.clone())
            .unwrap_or_default();
        let collection = collection.as_str();
        let request = RunQueryRequest {
            structured_query: query,
        };
        let request = &request;

        self.with_retry("run_query", move || {
            self.execute_request("run_query", collection, None, async move {
                let response = self
                    .send_authorized(|token| self.http.post(url).bearer_auth(token).json(request))
                    .await?;
                match response.status() {
                    StatusCode::OK => {
                        let body = response.text().await?;
                        // runQuery streams a JSON array, one element per result
                        let responses: Vec<RunQueryResponse> = serde_json::from_str(&body).map_err(|e| {
                            FirestoreError::request_failed(format!(
                                "Failed to parse runQuery response: {} (body prefix: {})",
                                e,
                                body.chars().take(200).collect::<String>()
                            ))
                        })?;

                        let docs: Vec<Document> = responses.into_iter().filter_map(|r| r.document).collect();
                        record_documents_read(collection, docs.len());
                        Ok(docs)
                    }
                    status => Err(Self::handle_error_response(status, url, response).await),
                }
            })
        })
        .await
    }

    /// Count the documents matched by a query without reading them.
    pub async fn count(&self, query: StructuredQuery) -> FirestoreResult<u64> {
        let url = format!("{}:runAggregationQuery", self.base_url);
        let url = url.as_str();
        let collection = query
            .from
            .first()
            .map(|c| c.collection_id.clone())
            .unwrap_or_default();
        let collection = collection.as_str();
        let request = RunAggregationQueryRequest::count(query);
        let request = &request;

        self.with_retry("count", move || {
            self.execute_request("count", collection, None, async move {
                let response = self
                    .send_authorized(|token| self.http.post(url).bearer_auth(token).json(request))
                    .await?;
                match response.status() {
                    StatusCode::OK => {
                        let responses: Vec<RunAggregationQueryResponse> = response.json().await?;
                        responses
                            .iter()
                            .find_map(|r| r.result.as_ref().and_then(|result| result.integer(COUNT_ALIAS)))
                            .ok_or_else(|| FirestoreError::request_failed("runAggregationQuery returned no count"))
                    }
                    status => Err(Self::handle_error_response(status, url, response).await),
                }
            })
        })
        .await
    }

    /// Execute with retry.
    pub async fn with_retry<T, F, Fut>(&self, operation: &str, op: F) -> FirestoreResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = FirestoreResult<T>>,
    {
        crate::retry::with_retry(&self.config.retry, operation, op).await
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    /// Send a request, minting a new token once if the current one expired.
    async fn send_authorized<F>(&self, build: F) -> FirestoreResult<Response>
    where
        F: Fn(&str) -> RequestBuilder,
    {
        let token = self.tokens.get().await?;
        let response = build(&token).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if !Self::is_access_token_expired(&body) {
            return Err(FirestoreError::from_http_status(401, body));
        }

        self.tokens.invalidate().await;
        let token = self.tokens.get().await?;
        Ok(build(&token).send().await?)
    }

    fn is_access_token_expired(body: &str) -> bool {
        body.contains("ACCESS_TOKEN_EXPIRED") || body.contains("\"UNAUTHENTICATED\"")
    }

    /// Execute a request with tracing and metrics.
    async fn execute_request<T, F>(
        &self,
        operation: &str,
        collection: &str,
        doc_id: Option<&str>,
        fut: F,
    ) -> FirestoreResult<T>
    where
        F: std::future::Future<Output = FirestoreResult<T>>,
    {
        let span = if let Some(id) = doc_id {
            info_span!("firestore_request", operation = %operation, collection = %collection, doc_id = %id)
        } else {
            info_span!("firestore_request", operation = %operation, collection = %collection)
        };

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, status, latency_ms);

        result
    }

    async fn handle_error_response(status: StatusCode, url: &str, response: Response) -> FirestoreError {
        let body = response.text().await.unwrap_or_default();
        FirestoreError::from_http_status(status.as_u16(), format!("{} failed: {}", url, body))
    }
}
