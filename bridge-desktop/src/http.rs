//! `HttpClient` over reqwest.
//!
//! `execute` is a single attempt. Retries happen only when the caller passes
//! a [`RetryPolicy`], since most of the API's writes are toggles and must
//! not be replayed.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy},
};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("podify-core/", env!("CARGO_PKG_VERSION"));

/// Outcome of one attempt that the retry loop may act on.
enum Attempt {
    Done(HttpResponse),
    Retryable(BridgeError),
}

pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Falls back to reqwest's default client if the tuned builder fails.
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client");
                Client::new()
            });
        Self { client }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn attempt(&self, request: &HttpRequest) -> Result<Attempt> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Ok(Attempt::Retryable(BridgeError::OperationFailed(
                    "Request timed out".to_string(),
                )))
            }
            Err(e) => {
                return Ok(Attempt::Retryable(BridgeError::OperationFailed(format!(
                    "Connection failed: {}",
                    e
                ))))
            }
        };

        let status = response.status().as_u16();
        if is_retryable_status(status) {
            return Ok(Attempt::Retryable(BridgeError::OperationFailed(format!(
                "HTTP {} error",
                status
            ))));
        }

        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| BridgeError::OperationFailed(e.to_string()))?;

        Ok(Attempt::Done(HttpResponse {
            status,
            headers,
            body,
        }))
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

fn is_retryable_status(status: u16) -> bool {
    status >= 500 || status == 429
}

/// Delay after failed attempt number `attempt` (1-based).
fn backoff_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    if !policy.use_exponential_backoff {
        return policy.base_delay;
    }
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    policy.base_delay.saturating_mul(factor).min(policy.max_delay)
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.execute_with_retry(request, RetryPolicy::none()).await
    }

    async fn execute_with_retry(&self, request: HttpRequest, policy: RetryPolicy) -> Result<HttpResponse> {
        let attempts = policy.max_attempts.max(1);

        for attempt in 1..=attempts {
            debug!(
                attempt,
                method = %request.method,
                path = %request.path(),
                "Sending HTTP request"
            );
            let error = match self.attempt(&request).await? {
                Attempt::Done(response) => return Ok(response),
                Attempt::Retryable(error) => error,
            };

            if attempt == attempts {
                return Err(error);
            }
            let delay = backoff_delay(&policy, attempt);
            warn!(error = %error, attempt, delay_ms = delay.as_millis() as u64, "Retrying HTTP request");
            tokio::time::sleep(delay).await;
        }

        Err(BridgeError::OperationFailed("No attempt was made".to_string()))
    }
}
