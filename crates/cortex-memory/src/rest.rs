//! REST implementation of [`MemoryStoreAdapter`].
//!
//! Wraps a `reqwest::Client` and translates every trait method into the
//! corresponding HTTP call against the memory store's API, with retry +
//! exponential back-off on transient (5xx / timeout) failures. A 404 from
//! `add` is NOT retried here — C1 never retries (§4.1) — it is surfaced
//! to the caller so the Memory Manager can run its own evict-and-rebuild
//! recovery (§4.2).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use cortex_domain::config::MemoryStoreConfig;
use cortex_domain::error::{Error, Result};
use cortex_domain::trace::TraceEvent;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;

use crate::provider::MemoryStoreAdapter;
use crate::types::{AddResult, ExtractionMessage, GetAllResult, SearchResult};

#[derive(Debug, Clone)]
pub struct RestMemoryStoreClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    max_retries: u32,
}

impl RestMemoryStoreClient {
    pub fn new(cfg: &MemoryStoreConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_owned(),
            api_key: cfg.api_key.clone(),
            max_retries: cfg.max_retries,
        })
    }

    fn decorate(&self, rb: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => rb.header("Authorization", format!("Bearer {key}")),
            None => rb,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Execute a request with retry + exponential back-off on transient
    /// errors only. 4xx responses (including 404) are returned immediately
    /// — they are either permanent client errors or, for `add`, a signal
    /// the caller needs to act on (rebuild + retry), not something this
    /// layer should paper over.
    async fn execute_with_retry(
        &self,
        endpoint: &str,
        build_request: impl Fn() -> RequestBuilder,
    ) -> Result<Response> {
        let mut last_err: Option<Error> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = Duration::from_millis(100 * 2u64.pow(attempt - 1));
                tokio::time::sleep(backoff).await;
            }

            let start = Instant::now();
            let result = self.decorate(build_request()).send().await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    TraceEvent::MemoryStoreCall {
                        endpoint: endpoint.to_owned(),
                        status,
                        duration_ms,
                    }
                    .emit();

                    if resp.status().is_server_error() {
                        let body = resp.text().await.unwrap_or_default();
                        last_err = Some(Error::MemoryStore(format!(
                            "{endpoint} returned {status}: {body}"
                        )));
                        continue;
                    }
                    return Ok(resp);
                }
                Err(e) => {
                    TraceEvent::MemoryStoreCall {
                        endpoint: endpoint.to_owned(),
                        status: 0,
                        duration_ms,
                    }
                    .emit();
                    last_err = Some(from_reqwest(e));
                    continue;
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| Error::MemoryStore(format!("{endpoint}: all retries exhausted"))))
    }

    async fn check_status(endpoint: &str, resp: Response) -> Result<Response> {
        let status = resp.status();
        if status.is_client_error() {
            let not_found = status == reqwest::StatusCode::NOT_FOUND;
            let body = resp.text().await.unwrap_or_default();
            let message = format!("{endpoint} returned {status}: {body}");
            return Err(if not_found {
                Error::NotFound(message)
            } else {
                Error::MemoryStore(message)
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl MemoryStoreAdapter for RestMemoryStoreClient {
    async fn add(
        &self,
        messages: &[ExtractionMessage],
        namespace: &str,
        run: Option<&str>,
        metadata: Value,
    ) -> Result<AddResult> {
        let url = self.url("/v1/memories");
        let body = serde_json::json!({
            "messages": messages,
            "user_id": namespace,
            "run_id": run,
            "metadata": metadata,
        });
        let resp = self
            .execute_with_retry("POST /v1/memories", || self.http.post(&url).json(&body))
            .await?;
        let resp = Self::check_status("POST /v1/memories", resp).await?;
        let text = resp.text().await.map_err(from_reqwest)?;
        serde_json::from_str(&text)
            .map_err(|e| Error::MemoryStore(format!("failed to parse add response: {e}: {text}")))
    }

    async fn search(
        &self,
        query: &str,
        namespace: &str,
        run: Option<&str>,
        limit: u32,
    ) -> Result<SearchResult> {
        let url = self.url("/v1/memories/search");
        let body = serde_json::json!({
            "query": query,
            "user_id": namespace,
            "run_id": run,
            "limit": limit,
        });
        let resp = self
            .execute_with_retry("POST /v1/memories/search", || {
                self.http.post(&url).json(&body)
            })
            .await?;
        let resp = Self::check_status("POST /v1/memories/search", resp).await?;
        let text = resp.text().await.map_err(from_reqwest)?;
        serde_json::from_str(&text).map_err(|e| {
            Error::MemoryStore(format!("failed to parse search response: {e}: {text}"))
        })
    }

    async fn get_all(
        &self,
        namespace: &str,
        run: Option<&str>,
        limit: u32,
    ) -> Result<GetAllResult> {
        let url = self.url("/v1/memories");
        let resp = self
            .execute_with_retry("GET /v1/memories", || {
                let mut rb = self
                    .http
                    .get(&url)
                    .query(&[("user_id", namespace), ("limit", &limit.to_string())]);
                if let Some(r) = run {
                    rb = rb.query(&[("run_id", r)]);
                }
                rb
            })
            .await?;
        let resp = Self::check_status("GET /v1/memories", resp).await?;
        let text = resp.text().await.map_err(from_reqwest)?;
        serde_json::from_str(&text).map_err(|e| {
            Error::MemoryStore(format!("failed to parse get_all response: {e}: {text}"))
        })
    }

    async fn update(&self, id: &str, text: &str) -> Result<()> {
        let url = self.url(&format!("/v1/memories/{id}"));
        let body = serde_json::json!({ "text": text });
        let resp = self
            .execute_with_retry(&format!("PUT /v1/memories/{id}"), || {
                self.http.put(&url).json(&body)
            })
            .await?;
        Self::check_status("PUT /v1/memories/{id}", resp).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let url = self.url(&format!("/v1/memories/{id}"));
        let resp = self
            .execute_with_retry(&format!("DELETE /v1/memories/{id}"), || self.http.delete(&url))
            .await?;
        Self::check_status("DELETE /v1/memories/{id}", resp).await?;
        Ok(())
    }

    async fn delete_all(&self, namespace: &str, run: Option<&str>) -> Result<()> {
        let url = self.url("/v1/memories");
        let resp = self
            .execute_with_retry("DELETE /v1/memories", || {
                let mut rb = self.http.delete(&url).query(&[("user_id", namespace)]);
                if let Some(r) = run {
                    rb = rb.query(&[("run_id", r)]);
                }
                rb
            })
            .await?;
        Self::check_status("DELETE /v1/memories", resp).await?;
        Ok(())
    }
}

pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}
