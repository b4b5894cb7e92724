use crate::sources::cache::RequestCache;
use anyhow::{Result, anyhow};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_secs(2),
        }
    }
}

/// JSON client shared by the chain adapters: request timeout, fixed-backoff
/// retry on 503/504 and per-run response caching.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("portfolio-tracker/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn get_json(&self, url: &str, cache: &RequestCache) -> Result<Value> {
        let key = format!("GET {}", url);
        if let Some(hit) = cache.get(&key).await {
            return Ok(hit);
        }
        let value = self.send_with_retry(|| self.client.get(url)).await?;
        cache.insert(key, value.clone()).await;
        Ok(value)
    }

    pub async fn post_json(&self, url: &str, body: &Value, cache: &RequestCache) -> Result<Value> {
        let key = format!("POST {} {}", url, body);
        if let Some(hit) = cache.get(&key).await {
            return Ok(hit);
        }
        let value = self
            .send_with_retry(|| self.client.post(url).json(body))
            .await?;
        cache.insert(key, value.clone()).await;
        Ok(value)
    }

    async fn send_with_retry<F>(&self, build: F) -> Result<Value>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 1;
        loop {
            let response = build().send().await?;
            let status = response.status();
            if status.is_success() {
                return Ok(response.json().await?);
            }
            let retryable =
                status == StatusCode::SERVICE_UNAVAILABLE || status == StatusCode::GATEWAY_TIMEOUT;
            if !retryable || attempt >= self.retry.max_attempts {
                return Err(anyhow!("Request failed with status {}", status));
            }
            warn!(status = %status, attempt, "Upstream unavailable, retrying");
            tokio::time::sleep(self.retry.backoff).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::Router;
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::get;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    pub(crate) async fn spawn_server(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn fast_fetcher() -> HttpFetcher {
        HttpFetcher::new(Duration::from_secs(5))
            .unwrap()
            .with_retry(RetryPolicy {
                max_attempts: 5,
                backoff: Duration::from_millis(10),
            })
    }

    fn flaky_app(failures: u32, status: AxumStatus, hits: Arc<AtomicU32>) -> Router {
        Router::new().route(
            "/balance",
            get(move || {
                let hits = hits.clone();
                async move {
                    let n = hits.fetch_add(1, Ordering::SeqCst);
                    if n < failures {
                        (status, "busy".to_string())
                    } else {
                        (AxumStatus::OK, r#"{"ok":true}"#.to_string())
                    }
                }
            }),
        )
    }

    #[tokio::test]
    async fn retries_gateway_errors_then_succeeds() {
        let hits = Arc::new(AtomicU32::new(0));
        let base = spawn_server(flaky_app(2, AxumStatus::SERVICE_UNAVAILABLE, hits.clone())).await;
        let cache = RequestCache::new();

        let value = fast_fetcher()
            .get_json(&format!("{}/balance", base), &cache)
            .await
            .unwrap();
        assert_eq!(value["ok"], true);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let hits = Arc::new(AtomicU32::new(0));
        let base = spawn_server(flaky_app(100, AxumStatus::GATEWAY_TIMEOUT, hits.clone())).await;
        let err = fast_fetcher()
            .get_json(&format!("{}/balance", base), &RequestCache::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("504"));
        assert_eq!(hits.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let hits = Arc::new(AtomicU32::new(0));
        let base = spawn_server(flaky_app(100, AxumStatus::NOT_FOUND, hits.clone())).await;
        assert!(
            fast_fetcher()
                .get_json(&format!("{}/balance", base), &RequestCache::new())
                .await
                .is_err()
        );
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cache_serves_repeated_requests() {
        let hits = Arc::new(AtomicU32::new(0));
        let base = spawn_server(flaky_app(0, AxumStatus::OK, hits.clone())).await;
        let cache = RequestCache::new();
        let fetcher = fast_fetcher();
        let url = format!("{}/balance", base);
        fetcher.get_json(&url, &cache).await.unwrap();
        fetcher.get_json(&url, &cache).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len().await, 1);
    }
}
