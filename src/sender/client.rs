use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Client, ClientBuilder};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Request timeout: {0}")]
    RequestTimeout(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub connection_timeout: Duration,
    pub max_connections: usize,
    pub keep_alive_timeout: Duration,
    pub user_agent: String,
    pub enable_compression: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
            max_connections: 4,
            keep_alive_timeout: Duration::from_secs(60),
            user_agent: format!("rask-measurement-forwarder/{}", env!("CARGO_PKG_VERSION")),
            enable_compression: true,
        }
    }
}

/// Measurement id and API secret, sent as query parameters.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    measurement_id: String,
    api_secret: String,
}

impl Credentials {
    pub fn new(measurement_id: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            measurement_id: measurement_id.into(),
            api_secret: api_secret.into(),
        }
    }

    /// `base` with `measurement_id` and `api_secret` appended to its query.
    pub fn authorize(&self, base: &Url) -> Url {
        let mut url = base.clone();
        url.query_pairs_mut()
            .append_pair("measurement_id", &self.measurement_id)
            .append_pair("api_secret", &self.api_secret);
        url
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("measurement_id", &self.measurement_id)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Status and raw body of a collector response. Non-2xx statuses are
/// responses too; only transport-level failures become errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Bytes,
}

/// The HTTP seam of the submission engine.
pub trait Transport: Send + Sync {
    fn post_json(
        &self,
        url: Url,
        body: String,
    ) -> impl Future<Output = Result<TransportResponse, ClientError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn post_json(
        &self,
        url: Url,
        body: String,
    ) -> impl Future<Output = Result<TransportResponse, ClientError>> + Send {
        self.as_ref().post_json(url, body)
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionStats {
    pub total_requests: u64,
    pub accepted_requests: u64,
    pub failed_requests: u64,
    pub bytes_sent: u64,
    pub average_response_time: Duration,
}

#[derive(Debug, Default)]
pub struct ClientStats {
    total_requests: AtomicU64,
    accepted_requests: AtomicU64,
    failed_requests: AtomicU64,
    bytes_sent: AtomicU64,
    total_response_time: AtomicU64,
}

impl ClientStats {
    pub fn record_request(&self, accepted: bool, bytes: usize, response_time: Duration) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
        self.total_response_time
            .fetch_add(response_time.as_millis() as u64, Ordering::Relaxed);

        if accepted {
            self.accepted_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> ConnectionStats {
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let total_response_time = self.total_response_time.load(Ordering::Relaxed);

        let average_response_time = if total_requests > 0 {
            Duration::from_millis(total_response_time / total_requests)
        } else {
            Duration::ZERO
        };

        ConnectionStats {
            total_requests,
            accepted_requests: self.accepted_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            average_response_time,
        }
    }
}

/// Production transport backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    config: ClientConfig,
    stats: Arc<ClientStats>,
}

impl HttpClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let mut client_builder = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(config.connection_timeout)
            .pool_max_idle_per_host(config.max_connections)
            .pool_idle_timeout(config.keep_alive_timeout)
            .user_agent(&config.user_agent);

        if config.enable_compression {
            client_builder = client_builder.gzip(true);
        }

        let client = client_builder.build().map_err(|e| {
            ClientError::InvalidConfiguration(format!("Failed to build HTTP client: {e}"))
        })?;

        Ok(Self {
            client,
            config,
            stats: Arc::new(ClientStats::default()),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn connection_stats(&self) -> ConnectionStats {
        self.stats.snapshot()
    }
}

impl Transport for HttpClient {
    async fn post_json(&self, url: Url, body: String) -> Result<TransportResponse, ClientError> {
        let start = Instant::now();
        let bytes = body.len();

        let result = self
            .client
            .post(url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                self.stats.record_request(false, bytes, start.elapsed());
                return Err(if e.is_timeout() {
                    ClientError::RequestTimeout(e.to_string())
                } else {
                    ClientError::NetworkError(e)
                });
            }
        };

        let status = response.status().as_u16();
        let body = response.bytes().await?;
        let latency = start.elapsed();

        self.stats
            .record_request(matches!(status, 200 | 204), bytes, latency);
        debug!(
            "Collector answered HTTP {} ({} bytes) in {:?}",
            status,
            body.len(),
            latency
        );

        Ok(TransportResponse { status, body })
    }
}
