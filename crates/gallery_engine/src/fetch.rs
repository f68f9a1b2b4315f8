use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use gallery_logging::gallery_debug;
use reqwest::header::HeaderMap;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::{FailureKind, FetchError};

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub tcp_keepalive: Duration,
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    /// No overall limit when `None`; large pictures may take a while.
    pub request_timeout: Option<Duration>,
    pub accept_invalid_certs: bool,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            tcp_keepalive: Duration::from_secs(30),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 100,
            request_timeout: None,
            accept_invalid_certs: false,
        }
    }
}

/// A GET request with its fully merged headers.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: Url,
    pub headers: HeaderMap,
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a whole document into memory.
    async fn fetch_document(&self, request: &FetchRequest) -> Result<Vec<u8>, FetchError>;

    /// Stream the response body into a newly created file at `output` and
    /// return the number of bytes written. The file is only created once the
    /// response status has been accepted.
    async fn fetch_to_file(&self, request: &FetchRequest, output: &Path) -> Result<u64, FetchError>;
}

/// The process' HTTP client. Build it once and share it between downloads
/// so connections are reused.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .tcp_keepalive(settings.tcp_keepalive)
            .pool_idle_timeout(settings.pool_idle_timeout)
            .pool_max_idle_per_host(settings.pool_max_idle_per_host)
            .danger_accept_invalid_certs(settings.accept_invalid_certs);
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| FetchError::new(FailureKind::Client, err.to_string()))?;
        Ok(Self { client })
    }

    async fn get(&self, request: &FetchRequest) -> Result<reqwest::Response, FetchError> {
        gallery_debug!("GET {}", request.url);
        let response = self
            .client
            .get(request.url.clone())
            .headers(request.headers.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !(200..400).contains(&status.as_u16()) {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                format!("HTTP {status}"),
            ));
        }
        Ok(response)
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch_document(&self, request: &FetchRequest) -> Result<Vec<u8>, FetchError> {
        let response = self.get(request).await?;
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        Ok(bytes.to_vec())
    }

    async fn fetch_to_file(&self, request: &FetchRequest, output: &Path) -> Result<u64, FetchError> {
        let response = self.get(request).await?;

        let filesystem = |err: std::io::Error| {
            FetchError::new(
                FailureKind::Filesystem,
                format!("cannot write {}: {err}", output.display()),
            )
        };
        let mut file = tokio::fs::File::create(output).await.map_err(filesystem)?;
        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            file.write_all(&chunk).await.map_err(filesystem)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(filesystem)?;
        Ok(written)
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    if err.is_decode() {
        return FetchError::new(FailureKind::Decode, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
