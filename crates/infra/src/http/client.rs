//! HTTP client with retry and timeout support.
//!
//! Transient failures (network errors, timeouts, 5xx responses and 429
//! rate-limit responses) are retried with exponential backoff up to a
//! bounded attempt count; everything else fails immediately. The terminal
//! error carries the failure classification and the attempts spent, so
//! callers can record per-metric failures accurately.

use std::time::Duration;

use ratewatch_domain::{BackendError, FailureKind};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use tracing::debug;

/// Compute the backoff delay before retry number `retry_number` (1-based).
///
/// Exponential doubling from `base`, capped at `max`. Pure so the schedule
/// is testable independently of any I/O.
pub fn backoff_delay(base: Duration, retry_number: u32, max: Duration) -> Duration {
    let shift = retry_number.saturating_sub(1).min(16);
    let multiplier = 1u32 << shift;
    base.saturating_mul(multiplier).min(max)
}

/// HTTP client with built-in retry and timeout support.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    max_attempts: u32,
    base_backoff: Duration,
    max_backoff: Duration,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Execute the provided request builder with retry semantics.
    ///
    /// # Errors
    /// Returns a [`BackendError`] classifying the terminal failure after
    /// retries are exhausted, or immediately for non-retryable failures.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, BackendError> {
        let attempts = self.max_attempts.max(1);

        for attempt in 1..=attempts {
            let cloned_builder = builder.try_clone().ok_or_else(|| {
                BackendError::new(
                    FailureKind::Network,
                    attempt,
                    "request body cannot be cloned; buffer the body to enable retries",
                )
            })?;

            let request = cloned_builder
                .build()
                .map_err(|err| BackendError::new(FailureKind::Network, attempt, err.to_string()))?;

            let method = request.method().clone();
            let url = request.url().clone();
            debug!(attempt, %method, %url, "sending HTTP request");

            match self.client.execute(request).await {
                Ok(response) => {
                    let status = response.status();
                    debug!(attempt, %method, %url, %status, "received HTTP response");

                    if status.is_success() {
                        return Ok(response);
                    }

                    let kind = FailureKind::Http(status.as_u16());
                    if kind.is_transient() && attempt < attempts {
                        self.sleep_with_backoff(attempt).await;
                        continue;
                    }

                    return Err(BackendError::new(
                        kind,
                        attempt,
                        format!("{method} {url} returned {status}"),
                    ));
                }
                Err(err) => {
                    debug!(attempt, %method, %url, error = %err, "HTTP request failed");

                    let kind = classify_error(&err);
                    if kind.is_transient() && attempt < attempts {
                        self.sleep_with_backoff(attempt).await;
                        continue;
                    }

                    return Err(BackendError::new(kind, attempt, err.to_string()));
                }
            }
        }

        Err(BackendError::new(
            FailureKind::Network,
            attempts,
            "http client exhausted retries without producing a result",
        ))
    }

    async fn sleep_with_backoff(&self, retry_number: u32) {
        let delay = backoff_delay(self.base_backoff, retry_number, self.max_backoff);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: u32,
    base_backoff: Duration,
    max_backoff: Duration,
    user_agent: Option<String>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(
                ratewatch_domain::constants::DEFAULT_REQUEST_TIMEOUT_SECS,
            ),
            max_attempts: ratewatch_domain::constants::DEFAULT_MAX_ATTEMPTS,
            base_backoff: Duration::from_millis(
                ratewatch_domain::constants::DEFAULT_BASE_BACKOFF_MS,
            ),
            max_backoff: Duration::from_millis(
                ratewatch_domain::constants::DEFAULT_MAX_BACKOFF_MS,
            ),
            user_agent: None,
        }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configure the total number of attempts (initial try + retries).
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    pub fn max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = backoff;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client.
    ///
    /// # Errors
    /// Returns a [`BackendError`] if the underlying reqwest client cannot be
    /// constructed.
    pub fn build(self) -> Result<HttpClient, BackendError> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        let client = builder
            .build()
            .map_err(|err| BackendError::new(FailureKind::Network, 0, err.to_string()))?;

        Ok(HttpClient {
            client,
            max_attempts: self.max_attempts.max(1),
            base_backoff: self.base_backoff,
            max_backoff: self.max_backoff,
        })
    }
}

fn classify_error(err: &reqwest::Error) -> FailureKind {
    if err.is_timeout() {
        FailureKind::Timeout
    } else if err.is_decode() {
        FailureKind::MalformedResponse
    } else {
        FailureKind::Network
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use reqwest::{Method, StatusCode};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_with_defaults() -> HttpClient {
        HttpClient::builder()
            .base_backoff(Duration::from_millis(10))
            .max_attempts(3)
            .build()
            .expect("http client")
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let base = Duration::from_millis(100);
        let max = Duration::from_millis(450);
        assert_eq!(backoff_delay(base, 1, max), Duration::from_millis(100));
        assert_eq!(backoff_delay(base, 2, max), Duration::from_millis(200));
        assert_eq!(backoff_delay(base, 3, max), Duration::from_millis(400));
        assert_eq!(backoff_delay(base, 4, max), Duration::from_millis(450));
        assert_eq!(backoff_delay(base, 10, max), Duration::from_millis(450));
    }

    #[tokio::test]
    async fn returns_successful_response_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_with_defaults();
        let response =
            client.send(client.request(Method::GET, server.uri())).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
    }

    #[tokio::test]
    async fn retries_server_errors_until_success() {
        let server = MockServer::start().await;
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = attempts.clone();
        Mock::given(method("GET"))
            .respond_with(move |_req: &wiremock::Request| -> ResponseTemplate {
                let current = attempts_clone.fetch_add(1, Ordering::SeqCst);
                if current < 2 {
                    ResponseTemplate::new(500)
                } else {
                    ResponseTemplate::new(200)
                }
            })
            .expect(3)
            .mount(&server)
            .await;

        let client = client_with_defaults();
        let response =
            client.send(client.request(Method::GET, server.uri())).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 3);
    }

    #[tokio::test]
    async fn retries_rate_limit_responses() {
        let server = MockServer::start().await;
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = attempts.clone();
        Mock::given(method("GET"))
            .respond_with(move |_req: &wiremock::Request| -> ResponseTemplate {
                if attempts_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                    ResponseTemplate::new(429)
                } else {
                    ResponseTemplate::new(200)
                }
            })
            .expect(2)
            .mount(&server)
            .await;

        let client = client_with_defaults();
        let response =
            client.send(client.request(Method::GET, server.uri())).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn does_not_retry_client_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_with_defaults();
        let err = client.send(client.request(Method::GET, server.uri())).await.unwrap_err();

        assert_eq!(err.kind, FailureKind::Http(404));
        assert_eq!(err.attempts, 1);
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
    }

    #[tokio::test]
    async fn exhausted_retries_report_final_attempt_count() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let client = client_with_defaults();
        let err = client.send(client.request(Method::GET, server.uri())).await.unwrap_err();

        assert_eq!(err.kind, FailureKind::Http(503));
        assert_eq!(err.attempts, 3);
    }

    #[tokio::test]
    async fn retries_on_network_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener); // release the port so that requests fail with ECONNREFUSED
        let url = format!("http://{}", addr);

        let client = HttpClient::builder()
            .base_backoff(Duration::from_millis(5))
            .max_attempts(2)
            .build()
            .expect("http client");

        let err = client.send(client.request(Method::GET, &url)).await.unwrap_err();
        assert_eq!(err.kind, FailureKind::Network);
        assert_eq!(err.attempts, 2);
    }
}
